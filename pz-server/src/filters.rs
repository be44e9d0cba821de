//! Product listing filters and their validation against endpoint options.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::{PzError, Result};

/// User-facing filter keys that the API names differently.
const KEY_MAPPING: &[(&str, &str)] = &[
    ("product_type", "product_type_name"),
    ("product_type__or", "product_type_name__or"),
    ("release", "release_name"),
    ("release__or", "release_name__or"),
];

/// Key of the server's free-text search parameter.
pub const SEARCH_KEY: &str = "search";

fn to_api_key(key: &str) -> &str {
    KEY_MAPPING
        .iter()
        .find(|(user, _)| *user == key)
        .map(|(_, api)| *api)
        .unwrap_or(key)
}

fn to_user_key(key: &str) -> &str {
    KEY_MAPPING
        .iter()
        .find(|(_, api)| *api == key)
        .map(|(user, _)| *user)
        .unwrap_or(key)
}

#[derive(Debug, Clone, Deserialize)]
struct FilterClass {
    name: String,
}

/// Filtering capabilities advertised by an endpoint's OPTIONS response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    filter_classes: Vec<FilterClass>,
    #[serde(default)]
    filterset: Vec<String>,
    #[serde(default)]
    search: Option<serde_json::Value>,
}

impl FilterOptions {
    /// Parameter names the endpoint accepts, in API naming.
    pub fn api_params(&self) -> BTreeSet<String> {
        let mut params: BTreeSet<String> = self
            .filter_classes
            .iter()
            .map(|class| class.name.clone())
            .chain(self.filterset.iter().cloned())
            .collect();
        if self.search.is_some() {
            params.insert(SEARCH_KEY.to_string());
        }
        params
    }

    /// Accepted keys in user-facing naming, sorted and deduplicated.
    pub fn user_keys(&self) -> Vec<String> {
        self.api_params()
            .iter()
            .map(|param| to_user_key(param).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Filters narrowing a product listing.
///
/// Each key holds one or more values; several values for one key are sent
/// comma-separated, which the server reads as alternatives for `__or` keys.
///
/// ```
/// use pz_server::ProductFilters;
///
/// let filters = ProductFilters::new()
///     .with("release", "LSST DP0")
///     .with("product_type", "Spec-z Catalog");
/// assert_eq!(filters.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    entries: BTreeMap<String, Vec<String>>,
}

impl ProductFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text search over product names and types.
    pub fn search(pattern: impl Into<String>) -> Self {
        Self::new().with(SEARCH_KEY, pattern)
    }

    /// Add a value for `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Add several values for `key`.
    pub fn with_any<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.entries
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Free-text search patterns, empty when no search was requested.
    pub fn search_patterns(&self) -> &[String] {
        self.entries
            .get(SEARCH_KEY)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Fail with [`PzError::InvalidFilter`] on the first key the endpoint does not accept.
    pub fn validate(&self, options: &FilterOptions) -> Result<()> {
        let params = options.api_params();
        for key in self.keys() {
            if !params.contains(to_api_key(key)) {
                return Err(PzError::InvalidFilter {
                    key: key.to_string(),
                    valid: options.user_keys(),
                });
            }
        }
        Ok(())
    }

    /// Query parameters in API naming.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(key, values)| (to_api_key(key).to_string(), values.join(",")))
            .collect()
    }
}
