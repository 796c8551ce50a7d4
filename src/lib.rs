// experiment_core: experiment structure resolver and frame randomizers.
// Plain-Rust core with a thin wasm_bindgen surface; JSON strings cross the boundary.

mod assets;
mod dependencies;
mod error;
mod merge;
pub mod randomizer;
mod resolver;
mod substitute;
mod types;
mod weighted;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub use assets::{expand_assets, validate_paths};
pub use dependencies::{
    collect_dependency_urls, resolve_dependencies, Dependency, DependencyFetcher, NoDependencies,
    StaticDependencies,
};
pub use error::ResolveError;
pub use merge::{deep_merge, merge_all, merge_lists_by_index};
pub use randomizer::{
    ConditionPolicy, Permute, RandomParameterSet, Randomizer, RandomizerRegistry, ResolveContext,
    Select,
};
pub use resolver::{is_plain_kind, ExperimentParser, FrameKind};
pub use substitute::{Selector, Substituter};
pub use types::*;
pub use weighted::pick_weighted;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn parse_session(session_json: &str) -> Result<SessionContext, ResolveError> {
    let trimmed = session_json.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(SessionContext::default());
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Run one resolution pass over JSON inputs and return the outcome as JSON.
pub fn parse_json(
    config: &ParserConfig,
    structure_json: &str,
    session_json: &str,
    fetcher: impl DependencyFetcher + 'static,
) -> Result<String, ResolveError> {
    let structure = ExperimentStructure::from_json(structure_json)?;
    let session = parse_session(session_json)?;
    let outcome = ExperimentParser::new(structure, session)
        .with_config(config.clone())
        .with_fetcher(fetcher)
        .parse()?;
    serde_json::to_string(&outcome).map_err(|e| ResolveError::Serialization(e.to_string()))
}

/// Sorted list of the `URL:`/`JSON:` targets a structure references, as JSON.
pub fn dependency_urls_json(structure_json: &str) -> Result<String, ResolveError> {
    let structure = ExperimentStructure::from_json(structure_json)?;
    serde_json::to_string(&collect_dependency_urls(&structure))
        .map_err(|e| ResolveError::Serialization(e.to_string()))
}

fn to_js(err: ResolveError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Parser handle exposed to JavaScript.
/// Holds the configuration; every `parse` call is an independent pass.
#[wasm_bindgen]
pub struct WasmExperimentParser {
    config: ParserConfig,
}

#[wasm_bindgen]
impl WasmExperimentParser {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmExperimentParser, JsValue> {
        let config = parse_config(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        Ok(WasmExperimentParser { config })
    }

    /// Resolve a structure for one session. Returns JSON `{ frames, conditions, warnings? }`.
    /// Structures that reference `URL:`/`JSON:` fields need `parse_with_fetch`.
    pub fn parse(&self, structure_json: &str, session_json: &str) -> Result<String, JsValue> {
        parse_json(&self.config, structure_json, session_json, NoDependencies).map_err(to_js)
    }

    /// JSON list of every dependency URL the structure mentions.
    pub fn dependency_urls(&self, structure_json: &str) -> Result<String, JsValue> {
        dependency_urls_json(structure_json).map_err(to_js)
    }
}

fn parse_config(config_json: &str) -> Result<ParserConfig, serde_json::Error> {
    let trimmed = config_json.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ParserConfig::default());
    }
    serde_json::from_str(trimmed)
}

/// Prefetch every dependency through the JS `fetch` callback, then resolve.
///
/// `fetch(url)` may return a string or a Promise resolving to one.
#[wasm_bindgen]
pub async fn parse_with_fetch(
    config_json: String,
    structure_json: String,
    session_json: String,
    fetch: js_sys::Function,
) -> Result<String, JsValue> {
    let config = parse_config(&config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
    let structure = ExperimentStructure::from_json(&structure_json).map_err(to_js)?;

    let mut cache = StaticDependencies::new();
    for url in collect_dependency_urls(&structure) {
        let returned = fetch.call1(&JsValue::NULL, &JsValue::from_str(&url))?;
        let body = JsFuture::from(js_sys::Promise::resolve(&returned)).await?;
        let body = body.as_string().ok_or_else(|| {
            to_js(ResolveError::Dependency {
                url: url.clone(),
                message: "fetch did not produce a string".to_string(),
            })
        })?;
        cache.insert(url, body);
    }

    parse_json(&config, &structure_json, &session_json, cache).map_err(to_js)
}
