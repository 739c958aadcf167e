//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Consul node names are DNS-ish labels; underscores are tolerated
static NODE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").unwrap()
});

/// Validate a node name before it is used as a Consul path segment
pub fn validate_node_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 255 && NODE_NAME_REGEX.is_match(name)
}

/// Validate a metadata tag key supplied as a filter
pub fn validate_tag_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
