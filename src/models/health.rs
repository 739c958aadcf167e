//! Health check data model and status aggregation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Check ID Consul uses for node maintenance mode
pub const NODE_MAINTENANCE_CHECK: &str = "_node_maintenance";

/// Check ID prefix Consul uses for service maintenance mode
pub const SERVICE_MAINTENANCE_PREFIX: &str = "_service_maintenance:";

/// A single health check as returned by `/v1/health/node/<node>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    #[serde(default)]
    pub node: String,
    #[serde(rename = "CheckID")]
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub output: String,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(rename = "Type", default)]
    pub check_type: String,
}

impl HealthCheck {
    fn is_maintenance(&self) -> bool {
        self.check_id == NODE_MAINTENANCE_CHECK
            || self.check_id.starts_with(SERVICE_MAINTENANCE_PREFIX)
    }
}

/// Aggregated health of a node.
///
/// `Unknown` means no classification could be made: the lookup failed or a
/// check reported a status this service does not understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Passing,
    Warning,
    Critical,
    Maintenance,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Passing => "passing",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Maintenance => "maintenance",
            HealthStatus::Unknown => "unknown",
        }
    }

    /// Summarise a node's checks into one status.
    ///
    /// Maintenance wins over critical, critical over warning, warning over
    /// passing. No checks at all counts as passing.
    pub fn aggregate(checks: &[HealthCheck]) -> Self {
        let (mut warning, mut critical, mut maintenance) = (false, false, false);

        for check in checks {
            if check.is_maintenance() {
                maintenance = true;
                continue;
            }
            match HealthStatus::from(check.status.as_str()) {
                HealthStatus::Passing => {}
                HealthStatus::Warning => warning = true,
                HealthStatus::Critical => critical = true,
                HealthStatus::Maintenance => maintenance = true,
                HealthStatus::Unknown => return HealthStatus::Unknown,
            }
        }

        if maintenance {
            HealthStatus::Maintenance
        } else if critical {
            HealthStatus::Critical
        } else if warning {
            HealthStatus::Warning
        } else {
            HealthStatus::Passing
        }
    }
}

impl From<&str> for HealthStatus {
    fn from(s: &str) -> Self {
        match s {
            "passing" => HealthStatus::Passing,
            "warning" => HealthStatus::Warning,
            "critical" => HealthStatus::Critical,
            "maintenance" => HealthStatus::Maintenance,
            _ => HealthStatus::Unknown,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of aggregated statuses a caller wants to see.
///
/// An empty filter accepts every node without any health lookup. Values are
/// kept as given (normalised to lowercase), so a value that matches no status
/// still makes the filter non-empty and excludes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthFilter {
    accepted: Vec<String>,
}

impl HealthFilter {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accepted: Vec<String> = Vec::new();
        for value in values {
            let value = value.as_ref().trim().to_lowercase();
            if !value.is_empty() && !accepted.contains(&value) {
                accepted.push(value);
            }
        }
        Self { accepted }
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn accepts(&self, status: HealthStatus) -> bool {
        self.accepted.iter().any(|value| value == status.as_str())
    }

    pub fn values(&self) -> &[String] {
        &self.accepted
    }
}
