//! Filter vocabulary model

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// KV prefix under which every vocabulary is stored
pub const FILTERS_KV_PREFIX: &str = "trento/filters/";

/// The closed set of vocabularies the UI knows how to filter by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterName {
    SapEnvironments,
    SapLandscapes,
    SapSystems,
}

impl FilterName {
    pub const ALL: [FilterName; 3] = [
        FilterName::SapEnvironments,
        FilterName::SapLandscapes,
        FilterName::SapSystems,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterName::SapEnvironments => "sap-environments",
            FilterName::SapLandscapes => "sap-landscapes",
            FilterName::SapSystems => "sap-systems",
        }
    }

    /// KV key holding this vocabulary
    pub fn kv_key(&self) -> String {
        format!("{}{}", FILTERS_KV_PREFIX, self.as_str())
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known values for every filter name. Only ever built complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilterVocabulary(BTreeMap<FilterName, Vec<String>>);

impl FilterVocabulary {
    pub fn get(&self, name: FilterName) -> Option<&[String]> {
        self.0.get(&name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterName, &[String])> {
        self.0.iter().map(|(name, values)| (*name, values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FilterName, Vec<String>)> for FilterVocabulary {
    fn from_iter<I: IntoIterator<Item = (FilterName, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
