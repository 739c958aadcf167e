//! Check report served by the agent running on each node.
//!
//! The agent publishes its benchmark results as a "controls" document: a set
//! of groups, each holding individual check results plus pass/fail counters.

use serde::{Deserialize, Serialize};

/// Top-level controls document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsReport {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "text", default)]
    pub description: String,
    #[serde(rename = "node_type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_version: Option<String>,
    #[serde(rename = "tests")]
    pub groups: Vec<ControlGroup>,
    #[serde(flatten)]
    pub summary: ControlSummary,
}

/// Totals across every group of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSummary {
    #[serde(rename = "total_pass", default)]
    pub pass: u32,
    #[serde(rename = "total_fail", default)]
    pub fail: u32,
    #[serde(rename = "total_warn", default)]
    pub warn: u32,
    #[serde(rename = "total_info", default)]
    pub info: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlGroup {
    #[serde(rename = "section")]
    pub id: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub group_type: String,
    #[serde(default)]
    pub pass: u32,
    #[serde(default)]
    pub fail: u32,
    #[serde(default)]
    pub warn: u32,
    #[serde(default)]
    pub info: u32,
    #[serde(rename = "results", default)]
    pub checks: Vec<ControlCheck>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlCheck {
    #[serde(rename = "test_number")]
    pub id: String,
    #[serde(rename = "test_desc", default)]
    pub description: String,
    #[serde(default)]
    pub audit: String,
    #[serde(rename = "type", default)]
    pub check_type: String,
    #[serde(default)]
    pub remediation: String,
    #[serde(default)]
    pub test_info: Vec<String>,
    /// PASS, FAIL, WARN or INFO
    #[serde(rename = "status", default)]
    pub state: String,
    #[serde(default)]
    pub actual_value: String,
    #[serde(default)]
    pub scored: bool,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl ControlsReport {
    /// Checks whose state is FAIL, across all groups
    pub fn failing(&self) -> impl Iterator<Item = &ControlCheck> {
        self.groups
            .iter()
            .flat_map(|group| group.checks.iter())
            .filter(|check| check.state.eq_ignore_ascii_case("fail"))
    }

    /// The check with the given test number, from whichever group holds it
    pub fn find_check(&self, id: &str) -> Option<&ControlCheck> {
        self.groups
            .iter()
            .flat_map(|group| group.checks.iter())
            .find(|check| check.id == id)
    }
}
