//! Search request DTOs

use serde::Deserialize;

/// Content search query: `?type=content&query=…&exact&regex&include=…&exclude=…`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub query: Option<String>,
    pub exact: Option<String>,
    pub regex: Option<String>,
    /// Comma-separated include patterns
    pub include: Option<String>,
    /// Comma-separated exclude patterns
    pub exclude: Option<String>,
}

/// Symbol search query with optional kind filters (comma-separated LSP
/// symbol-kind numbers)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolsQuery {
    pub query: Option<String>,
    pub kind: Option<String>,
    pub exclude_kind: Option<String>,
}

/// Parse a comma-separated list of symbol-kind numbers
pub fn split_kinds(value: &Option<String>) -> Vec<i64> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|kind| kind.trim().parse().ok())
        .collect()
}
