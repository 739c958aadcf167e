//! Builder for Consul catalog filter expressions.
//!
//! Produces expressions in the go-bexpr grammar Consul accepts on
//! `/v1/catalog/nodes?filter=`, e.g.
//! `Meta["trento-sap-systems"] == "HA1" or Meta["trento-sap-systems"] == "HA2"`.

use std::collections::{BTreeMap, HashMap};

use crate::models::RESERVED_TAG_PREFIX;

/// Builder for node metadata filter expressions
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    /// One entry per tag, each the list of `Meta[...] == ...` alternatives
    groups: Vec<Vec<String>>,
}

impl FilterQuery {
    pub fn new() -> Self {
        Self { groups: vec![] }
    }

    /// Require `key` to equal any of `values`. No values means no constraint.
    pub fn any_of<S: AsRef<str>>(mut self, key: &str, values: &[S]) -> Self {
        let alternatives: Vec<String> = values
            .iter()
            .map(|value| meta_equals(key, value.as_ref()))
            .collect();
        if !alternatives.is_empty() {
            self.groups.push(alternatives);
        }
        self
    }

    /// Constraints for every reserved tag in `filters`.
    ///
    /// Tags outside the reserved namespace are dropped. Tag names are sorted
    /// so the same request always yields the same expression.
    pub fn from_tag_filters(filters: &HashMap<String, Vec<String>>) -> Self {
        let sorted: BTreeMap<&String, &Vec<String>> = filters
            .iter()
            .filter(|(key, _)| key.starts_with(RESERVED_TAG_PREFIX))
            .collect();

        sorted
            .into_iter()
            .fold(Self::new(), |query, (key, values)| query.any_of(key, values))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Build the expression; empty when there are no constraints.
    ///
    /// bexpr binds `and` tighter than `or`, so a multi-value group is
    /// parenthesised whenever it is conjoined with another group.
    pub fn build(&self) -> String {
        let parenthesise = self.groups.len() > 1;
        self.groups
            .iter()
            .map(|alternatives| {
                let clause = alternatives.join(" or ");
                if parenthesise && alternatives.len() > 1 {
                    format!("({})", clause)
                } else {
                    clause
                }
            })
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// Expression restricting catalog nodes to the given reserved-tag values
pub fn build_filter_expression(filters: &HashMap<String, Vec<String>>) -> String {
    FilterQuery::from_tag_filters(filters).build()
}

fn meta_equals(key: &str, value: &str) -> String {
    format!("Meta[\"{}\"] == \"{}\"", escape(key), escape(value))
}

/// Keep a value inside its string literal
fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
