// Choice-node samplers and the registry that maps `sampler` names to them.
// A randomizer only ever sees the resolver through `ResolveContext`.

mod permute;
mod random_parameter_set;
mod select;

use std::collections::HashMap;

use rand::rngs::StdRng;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ResolveError;
use crate::types::{FrameDefinition, ParameterSet, Resolution, SessionContext};

pub use permute::Permute;
pub use random_parameter_set::{ConditionPolicy, RandomParameterSet};
pub use select::Select;

/// What a randomizer may ask of the resolution pass that invoked it.
pub trait ResolveContext {
    /// Resolve a frame fragment, which may itself be a group or choice node.
    fn resolve_frame(
        &mut self,
        frame_id: Option<&str>,
        frame: FrameDefinition,
    ) -> Result<Resolution, ResolveError>;

    /// Substitute placeholders using the pass-wide substituter (shared UNIQ state).
    fn substitute(
        &mut self,
        frame: &FrameDefinition,
        parameters: &ParameterSet,
    ) -> Result<FrameDefinition, ResolveError>;

    fn rng(&mut self) -> &mut StdRng;

    fn session(&self) -> &SessionContext;

    /// Record a degraded-input diagnostic. Never aborts the pass.
    fn warn(&mut self, message: String);
}

/// A sampler for `kind: "choice"` nodes.
pub trait Randomizer: Send + Sync {
    /// Expand `node` (the full choice definition) into frames plus its condition record.
    fn resolve(
        &self,
        frame_id: &str,
        node: &FrameDefinition,
        ctx: &mut dyn ResolveContext,
    ) -> Result<Resolution, ResolveError>;
}

/// Sampler name to implementation.
pub struct RandomizerRegistry {
    samplers: HashMap<String, Box<dyn Randomizer>>,
}

impl RandomizerRegistry {
    pub fn empty() -> Self {
        RandomizerRegistry {
            samplers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, randomizer: impl Randomizer + 'static) {
        self.samplers.insert(name.into(), Box::new(randomizer));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Randomizer> {
        self.samplers.get(name).map(|r| r.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.samplers.contains_key(name)
    }
}

impl Default for RandomizerRegistry {
    fn default() -> Self {
        let mut registry = RandomizerRegistry::empty();
        registry.register("permute", Permute);
        registry.register("select", Select);
        registry.register("random-parameter-set", RandomParameterSet);
        registry
    }
}

/// Deserialize a node body into its typed configuration.
pub(crate) fn parse_node<T: DeserializeOwned>(
    frame_id: &str,
    node: &FrameDefinition,
) -> Result<T, ResolveError> {
    serde_json::from_value(Value::Object(node.clone())).map_err(|e| ResolveError::InvalidNode {
        frame_id: frame_id.to_string(),
        message: e.to_string(),
    })
}

/// Give a child fragment `{parent}-{position}` as its id unless it already has one.
pub(crate) fn with_default_id(
    mut frame: FrameDefinition,
    parent_id: &str,
    position: usize,
) -> FrameDefinition {
    if !frame.contains_key("id") {
        frame.insert(
            "id".to_string(),
            Value::String(format!("{}-{}", parent_id, position)),
        );
    }
    frame
}
