// `URL:` / `JSON:` frame fields: values fetched at resolution time through an injected
// fetcher. The browser build prefetches every target asynchronously and hands the
// resolver a `StaticDependencies` cache, so resolution itself stays synchronous.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::error::ResolveError;
use crate::types::{ExperimentStructure, FrameDefinition};

/// A field value that must be fetched before the frame is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency<'a> {
    /// `URL:<url>`: the body as raw text.
    Text(&'a str),
    /// `JSON:<url>`: the body parsed as JSON.
    Json(&'a str),
}

impl<'a> Dependency<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        if let Some(url) = text.strip_prefix("URL:") {
            Some(Dependency::Text(url))
        } else {
            text.strip_prefix("JSON:").map(Dependency::Json)
        }
    }

    pub fn url(&self) -> &'a str {
        match self {
            Dependency::Text(url) | Dependency::Json(url) => url,
        }
    }
}

/// Supplies the body stored at a URL.
pub trait DependencyFetcher {
    fn fetch(&self, url: &str) -> Result<String, String>;
}

/// Fetcher for structures that should not reference anything external.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyFetcher for NoDependencies {
    fn fetch(&self, _url: &str) -> Result<String, String> {
        Err("no dependency fetcher is configured".to_string())
    }
}

/// Pre-fetched bodies keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct StaticDependencies {
    bodies: HashMap<String, String>,
}

impl StaticDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.bodies.insert(url.into(), body.into());
    }
}

impl DependencyFetcher for StaticDependencies {
    fn fetch(&self, url: &str) -> Result<String, String> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| "not prefetched".to_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticDependencies {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut deps = StaticDependencies::new();
        for (url, body) in iter {
            deps.insert(url, body);
        }
        deps
    }
}

/// Replace every top-level `URL:`/`JSON:` field of a terminal frame with its fetched value.
pub fn resolve_dependencies(
    mut frame: FrameDefinition,
    fetcher: &dyn DependencyFetcher,
) -> Result<FrameDefinition, ResolveError> {
    for value in frame.values_mut() {
        let Value::String(text) = value else {
            continue;
        };
        let Some(dependency) = Dependency::parse(text) else {
            continue;
        };

        let url = dependency.url();
        let body = fetcher.fetch(url).map_err(|message| ResolveError::Dependency {
            url: url.to_string(),
            message,
        })?;
        let resolved = match dependency {
            Dependency::Text(_) => Value::String(body),
            Dependency::Json(_) => {
                serde_json::from_str(&body).map_err(|e| ResolveError::Dependency {
                    url: url.to_string(),
                    message: format!("invalid JSON body: {}", e),
                })?
            }
        };
        *value = resolved;
    }
    Ok(frame)
}

/// Every URL a structure may need, anywhere in any frame definition. Sorted, deduplicated.
///
/// Placeholders can move a dependency string into a top-level field during substitution,
/// so nested occurrences are included.
pub fn collect_dependency_urls(structure: &ExperimentStructure) -> Vec<String> {
    let mut urls = BTreeSet::new();
    for frame in structure.frames.values() {
        for value in frame.values() {
            collect_from_value(value, &mut urls);
        }
    }
    urls.into_iter().collect()
}

fn collect_from_value(value: &Value, urls: &mut BTreeSet<String>) {
    match value {
        Value::String(text) => {
            if let Some(dependency) = Dependency::parse(text) {
                urls.insert(dependency.url().to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_from_value(item, urls)),
        Value::Object(map) => map.values().for_each(|item| collect_from_value(item, urls)),
        _ => {}
    }
}
