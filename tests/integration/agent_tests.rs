//! Check agent tests: endpoint resolution and report fetching

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use trento_web::{config::ChecksConfig, models::Node, services::AgentClient};

use crate::common::{
    catalog_node, closed_port, controls_report_json, mock_backend, service_instance, MockConsul,
};

fn checks_config(port: u16, service_name: Option<&str>) -> ChecksConfig {
    ChecksConfig {
        port,
        service_name: service_name.map(str::to_string),
        timeout_secs: 2,
    }
}

fn local_node(name: &str) -> Node {
    Node::from(catalog_node(name, "dc1", "127.0.0.1", &[]))
}

async fn agent_server(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_checks_are_fetched_from_node_address() {
    let server = agent_server(ResponseTemplate::new(200).set_body_json(controls_report_json())).await;
    let backend = mock_backend(
        Arc::new(MockConsul::new()),
        &checks_config(server.address().port(), None),
    );

    let node = local_node("hana01");
    let report = node
        .checks(&backend, &CancellationToken::new())
        .await
        .expect("report");

    assert_eq!(report.id, "1");
    assert_eq!(report.node_type, "hana");
    assert_eq!(report.summary.fail, 1);
    let failing: Vec<_> = report.failing().map(|c| c.id.as_str()).collect();
    assert_eq!(failing, vec!["1.1.2"]);
}

#[tokio::test]
async fn test_unreachable_agent_yields_no_report() {
    let backend = mock_backend(Arc::new(MockConsul::new()), &checks_config(closed_port(), None));
    let node = local_node("hana01");
    let before = node.clone();

    assert!(node.checks(&backend, &CancellationToken::new()).await.is_none());
    assert_eq!(node, before);
}

#[tokio::test]
async fn test_error_status_yields_no_report() {
    let server = agent_server(ResponseTemplate::new(503)).await;
    let backend = mock_backend(
        Arc::new(MockConsul::new()),
        &checks_config(server.address().port(), None),
    );

    assert!(local_node("hana01")
        .checks(&backend, &CancellationToken::new())
        .await
        .is_none());
}

#[tokio::test]
async fn test_malformed_report_yields_no_report() {
    let server = agent_server(ResponseTemplate::new(200).set_body_string("<html>nope</html>")).await;
    let backend = mock_backend(
        Arc::new(MockConsul::new()),
        &checks_config(server.address().port(), None),
    );

    assert!(local_node("hana01")
        .checks(&backend, &CancellationToken::new())
        .await
        .is_none());
}

#[tokio::test]
async fn test_cancelled_fetch_yields_no_report() {
    let server = agent_server(ResponseTemplate::new(200).set_body_json(controls_report_json())).await;
    let backend = mock_backend(
        Arc::new(MockConsul::new()),
        &checks_config(server.address().port(), None),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(local_node("hana01").checks(&backend, &cancel).await.is_none());
}

#[tokio::test]
async fn test_endpoint_resolved_through_service_catalog() {
    let server = agent_server(ResponseTemplate::new(200).set_body_json(controls_report_json())).await;

    let consul = MockConsul::new();
    consul.add_service_instance(service_instance(
        "trento-agent",
        "hana01",
        "127.0.0.1",
        server.address().port(),
    ));

    // The fallback port is wrong on purpose; only catalog resolution reaches the agent
    let backend = mock_backend(Arc::new(consul), &checks_config(1, Some("trento-agent")));

    let report = local_node("hana01")
        .checks(&backend, &CancellationToken::new())
        .await;
    assert!(report.is_some());
}

#[tokio::test]
async fn test_endpoint_falls_back_when_service_not_registered_for_node() {
    let consul = MockConsul::new();
    consul.add_service_instance(service_instance("trento-agent", "other", "10.9.9.9", 9999));

    let agent = AgentClient::new(&checks_config(8700, Some("trento-agent"))).unwrap();
    let node = Node::from(catalog_node("hana01", "dc1", "10.0.0.1", &[]));

    assert_eq!(
        agent.resolve_endpoint(&consul, &node).await,
        "http://10.0.0.1:8700/"
    );
}

#[tokio::test]
async fn test_endpoint_prefers_service_address() {
    let consul = MockConsul::new();
    let mut instance = service_instance("trento-agent", "hana01", "10.0.0.1", 9100);
    instance.service_address = "192.168.1.10".to_string();
    consul.add_service_instance(instance);

    let agent = AgentClient::new(&checks_config(8700, Some("trento-agent"))).unwrap();
    let node = Node::from(catalog_node("hana01", "dc1", "10.0.0.1", &[]));

    assert_eq!(
        agent.resolve_endpoint(&consul, &node).await,
        "http://192.168.1.10:9100/"
    );
}

#[tokio::test]
async fn test_default_endpoint_without_service_name() {
    let agent = AgentClient::new(&ChecksConfig::default()).unwrap();
    let node = Node::from(catalog_node("hana01", "dc1", "10.0.0.7", &[]));

    assert_eq!(
        agent.resolve_endpoint(&MockConsul::new(), &node).await,
        "http://10.0.0.7:8700/"
    );
}
