//! Topology, vocabulary and node lookup against the in-memory Consul

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use trento_web::{
    models::{EnvironmentList, FilterName, HealthFilter, HealthStatus, Node},
    services::{build_filter_expression, load_environments, load_node, load_vocabulary, Backend},
    AppError,
};

use crate::common::{
    catalog_node, check, mock_backend, standard_consul, test_config, MockConsul, MockError,
};

fn backend_for(consul: MockConsul) -> (Backend, Arc<MockConsul>) {
    let consul = Arc::new(consul);
    let backend = mock_backend(consul.clone(), &test_config().checks).with_health_concurrency(4);
    (backend, consul)
}

fn node_names(envs: &EnvironmentList, dc: &str) -> Vec<String> {
    envs.get(dc)
        .map(|env| env.nodes.iter().map(|n| n.name.clone()).collect())
        .unwrap_or_default()
}

async fn load(backend: &Backend, filter: &str, health: &[&str]) -> Result<EnvironmentList, AppError> {
    load_environments(
        backend,
        filter,
        &HealthFilter::new(health),
        &CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn test_all_datacenters_seeded_without_filters() {
    let (backend, consul) = backend_for(standard_consul());

    let envs = load(&backend, "", &[]).await.unwrap();

    assert_eq!(envs.names().collect::<Vec<_>>(), vec!["dc1", "dc2", "dc3"]);
    assert_eq!(node_names(&envs, "dc1"), vec!["hana01", "hana02"]);
    assert_eq!(node_names(&envs, "dc2"), vec!["netweaver01", "netweaver02"]);
    assert!(envs.get("dc3").unwrap().nodes.is_empty());
    // No health filter, no health lookups
    assert_eq!(consul.health_calls(), 0);
}

#[tokio::test]
async fn test_datacenters_kept_when_no_node_matches() {
    let (backend, _) = backend_for(standard_consul());
    let filter = build_filter_expression(&HashMap::from([(
        "trento-sap-systems".to_string(),
        vec!["XYZ".to_string()],
    )]));

    let envs = load(&backend, &filter, &[]).await.unwrap();

    assert_eq!(envs.len(), 3);
    assert_eq!(envs.node_count(), 0);
}

#[tokio::test]
async fn test_tag_filter_is_passed_to_catalog() {
    let (backend, consul) = backend_for(standard_consul());
    let filter = build_filter_expression(&HashMap::from([
        (
            "trento-sap-systems".to_string(),
            vec!["HA1".to_string(), "NW1".to_string()],
        ),
        ("trento-sap-environment".to_string(), vec!["qa".to_string()]),
    ]));

    let envs = load(&backend, &filter, &[]).await.unwrap();

    assert_eq!(consul.filters_seen(), vec![filter]);
    assert!(node_names(&envs, "dc1").is_empty());
    assert_eq!(node_names(&envs, "dc2"), vec!["netweaver01", "netweaver02"]);
}

#[tokio::test]
async fn test_health_filter_keeps_matching_nodes() {
    let (backend, consul) = backend_for(standard_consul());

    let envs = load(&backend, "", &["passing", "warning"]).await.unwrap();

    assert_eq!(node_names(&envs, "dc1"), vec!["hana01"]);
    assert_eq!(node_names(&envs, "dc2"), vec!["netweaver01"]);
    assert_eq!(consul.health_calls(), 4);
}

#[tokio::test]
async fn test_health_filter_maintenance() {
    let (backend, _) = backend_for(standard_consul());

    let envs = load(&backend, "", &["maintenance"]).await.unwrap();

    assert_eq!(envs.node_count(), 1);
    assert_eq!(node_names(&envs, "dc2"), vec!["netweaver02"]);
}

#[tokio::test]
async fn test_unmatched_health_value_excludes_everything() {
    let (backend, _) = backend_for(standard_consul());

    let envs = load(&backend, "", &["healthy"]).await.unwrap();

    assert_eq!(envs.len(), 3);
    assert_eq!(envs.node_count(), 0);
}

#[tokio::test]
async fn test_failed_health_lookup_counts_as_unknown() {
    let consul = standard_consul();
    consul.fail_health_for("hana01");
    let (backend, _) = backend_for(consul);

    let passing = load(&backend, "", &["passing"]).await.unwrap();
    assert_eq!(passing.node_count(), 0);

    let unknown = load(&backend, "", &["unknown"]).await.unwrap();
    assert_eq!(node_names(&unknown, "dc1"), vec!["hana01"]);
}

#[tokio::test(start_paused = true)]
async fn test_node_order_survives_concurrent_health_lookups() {
    let consul = MockConsul::new();
    consul.add_datacenter("dc1");
    let names: Vec<String> = (0..12).map(|i| format!("node{:02}", i)).collect();
    for (i, name) in names.iter().enumerate() {
        consul.add_node(catalog_node(name, "dc1", "10.0.0.1", &[]));
        consul.set_checks(name, vec![check(name, "serfHealth", "passing")]);
        // Earlier nodes answer last
        consul.delay_health_for(name, Duration::from_millis(10 * (12 - i as u64)));
    }
    let (backend, consul) = backend_for(consul);

    let envs = load(&backend, "", &["passing"]).await.unwrap();

    assert_eq!(node_names(&envs, "dc1"), names);
    assert!(consul.max_concurrent_health_calls() <= 4);
    assert!(consul.max_concurrent_health_calls() > 1);
}

#[tokio::test]
async fn test_unknown_datacenter_fails_fast() {
    let consul = standard_consul();
    consul.add_node(catalog_node("stray", "dc9", "10.0.9.1", &[]));
    let (backend, consul) = backend_for(consul);

    let err = load(&backend, "", &["passing"]).await.unwrap_err();

    assert!(matches!(err, AppError::Inconsistent(_)), "got {:?}", err);
    assert!(err.to_string().contains("dc9"));
    assert_eq!(consul.health_calls(), 0);
}

#[tokio::test]
async fn test_datacenter_failure_is_fatal_with_context() {
    let consul = standard_consul();
    consul.set_error_mode(MockError::Datacenters);
    let (backend, _) = backend_for(consul);

    let err = load(&backend, "", &[]).await.unwrap_err();

    assert!(matches!(err, AppError::BackendUnavailable(_)));
    assert!(err
        .to_string()
        .contains("could not query Consul for datacenters"));
}

#[tokio::test]
async fn test_node_listing_failure_is_fatal_with_context() {
    let consul = standard_consul();
    consul.set_error_mode(MockError::Nodes);
    let (backend, _) = backend_for(consul);

    let err = load(&backend, "", &[]).await.unwrap_err();

    assert!(err.to_string().contains("could not query Consul for nodes"));
}

#[tokio::test]
async fn test_cancelled_load_is_aborted() {
    let (backend, consul) = backend_for(standard_consul());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = load_environments(&backend, "", &HealthFilter::new(["passing"]), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Cancelled(_)));
    assert!(consul.filters_seen().is_empty());
}

#[tokio::test]
async fn test_vocabulary_loads_every_filter() {
    let (backend, _) = backend_for(standard_consul());

    let vocabulary = load_vocabulary(&backend, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(vocabulary.len(), FilterName::ALL.len());
    assert_eq!(
        vocabulary.get(FilterName::SapSystems).unwrap(),
        &["HA1", "HA2", "NW1"]
    );
    assert_eq!(
        vocabulary.get(FilterName::SapLandscapes).unwrap(),
        &["landscape1"]
    );
}

#[tokio::test]
async fn test_vocabulary_missing_key_yields_nothing() {
    let consul = standard_consul();
    consul.remove_kv("trento/filters/sap-landscapes");
    let (backend, _) = backend_for(consul);

    let err = load_vocabulary(&backend, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(err.to_string().contains("trento/filters/sap-landscapes"));
}

#[tokio::test]
async fn test_vocabulary_decode_failure_yields_nothing() {
    let consul = standard_consul();
    consul.put_kv("trento/filters/sap-systems", "not json");
    let (backend, _) = backend_for(consul);

    let err = load_vocabulary(&backend, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DecodeFailure(_)));
    assert!(err.to_string().contains("error decoding the filter data"));
}

#[tokio::test]
async fn test_vocabulary_backend_failure_yields_nothing() {
    let consul = standard_consul();
    consul.set_error_mode(MockError::Kv);
    let (backend, _) = backend_for(consul);

    let err = load_vocabulary(&backend, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BackendUnavailable(_)));
}

#[tokio::test]
async fn test_load_node_detail() {
    let (backend, _) = backend_for(standard_consul());

    let detail = load_node(&backend, "hana02", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(detail.node.name, "hana02");
    assert_eq!(detail.health, HealthStatus::Critical);
    assert_eq!(detail.health_checks.len(), 2);
    assert!(detail.reserved_meta.keys().all(|k| k.starts_with("trento-")));
}

#[tokio::test]
async fn test_load_node_hides_foreign_metadata() {
    let (backend, _) = backend_for(standard_consul());

    let detail = load_node(&backend, "hana01", &CancellationToken::new())
        .await
        .unwrap();

    assert!(detail.node.meta.contains_key("owner"));
    assert!(!detail.reserved_meta.contains_key("owner"));
    assert_eq!(detail.reserved_meta.len(), 2);
}

#[tokio::test]
async fn test_load_unknown_node_is_not_found() {
    let (backend, _) = backend_for(standard_consul());

    let err = load_node(&backend, "ghost", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_load_node_health_failure_is_fatal() {
    let consul = standard_consul();
    consul.fail_health_for("hana01");
    let (backend, _) = backend_for(consul);

    let err = load_node(&backend, "hana01", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("could not query Consul for health checks"));
}

#[tokio::test]
async fn test_node_health_accessor_never_fails() {
    let consul = standard_consul();
    consul.fail_health_for("hana02");
    let (backend, _) = backend_for(consul);
    let cancel = CancellationToken::new();

    let healthy = Node::from(catalog_node("hana01", "dc1", "10.0.0.1", &[]));
    let broken = Node::from(catalog_node("hana02", "dc1", "10.0.0.2", &[]));
    let empty = Node::from(catalog_node("fresh", "dc1", "10.0.0.3", &[]));

    assert_eq!(healthy.health(&backend, &cancel).await, HealthStatus::Passing);
    assert_eq!(broken.health(&backend, &cancel).await, HealthStatus::Unknown);
    assert_eq!(empty.health(&backend, &cancel).await, HealthStatus::Passing);
}

#[tokio::test]
async fn test_health_filtered_nodes_carry_their_status() {
    let (backend, _) = backend_for(standard_consul());

    let envs = load(&backend, "", &["passing", "warning"]).await.unwrap();

    let dc1 = &envs.get("dc1").unwrap().nodes;
    assert_eq!(dc1.len(), 1);
    assert_eq!(dc1[0].health, Some(HealthStatus::Passing));
    assert_eq!(
        envs.get("dc2").unwrap().nodes[0].health,
        Some(HealthStatus::Warning)
    );

    // Without a health filter no status is computed
    let envs = load(&backend, "", &[]).await.unwrap();
    assert!(envs.iter().flat_map(|env| &env.nodes).all(|n| n.health.is_none()));
}

#[tokio::test]
async fn test_node_with_unreachable_agent_stays_in_topology() {
    let consul = MockConsul::new();
    consul.add_datacenter("dc1");
    consul.add_node(catalog_node(
        "hana01",
        "dc1",
        "127.0.0.1",
        &[("trento-sap-systems", "HA1")],
    ));
    consul.set_checks("hana01", vec![check("hana01", "serfHealth", "passing")]);
    let (backend, _) = backend_for(consul);
    let cancel = CancellationToken::new();

    let envs = load(&backend, "", &["passing"]).await.unwrap();
    let node = envs.get("dc1").unwrap().nodes[0].clone();
    let before = node.clone();

    // Nothing listens on the configured agent port
    assert!(node.checks(&backend, &cancel).await.is_none());

    assert_eq!(node, before);
    assert_eq!(node.name, "hana01");
    assert_eq!(node.address, "127.0.0.1");
    assert_eq!(node.reserved_meta()["trento-sap-systems"], "HA1");
    assert_eq!(node.health, Some(HealthStatus::Passing));
    assert_eq!(node_names(&envs, "dc1"), vec!["hana01"]);
}
