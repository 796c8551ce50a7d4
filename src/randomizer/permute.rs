// `permute` sampler: every frame option, in a uniformly random order.

use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{parse_node, with_default_id, Randomizer, ResolveContext};
use crate::error::ResolveError;
use crate::merge::{merge_all, merge_lists_by_index};
use crate::types::{FrameDefinition, Resolution};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermuteNode {
    #[serde(default)]
    frame_options: Vec<FrameDefinition>,
    #[serde(default)]
    common_frame_properties: FrameDefinition,
    /// Overrides applied by position in the shuffled order.
    #[serde(default)]
    ordered_frame_options: Vec<FrameDefinition>,
}

pub struct Permute;

impl Randomizer for Permute {
    fn resolve(
        &self,
        frame_id: &str,
        node: &FrameDefinition,
        ctx: &mut dyn ResolveContext,
    ) -> Result<Resolution, ResolveError> {
        let node: PermuteNode = parse_node(frame_id, node)?;

        let mut shuffled = node.frame_options.clone();
        shuffled.shuffle(ctx.rng());
        debug!(frame_id = %frame_id, options = shuffled.len(), "permuted frame options");

        let mut frames = Vec::new();
        for (position, option) in shuffled.iter().enumerate() {
            let overrides = node
                .ordered_frame_options
                .get(position)
                .map(|ordered| position_overrides(&node.common_frame_properties, option, ordered));
            let merged = merge_all(
                [&node.common_frame_properties, option]
                    .into_iter()
                    .chain(overrides.as_ref()),
            );
            let merged = with_default_id(merged, frame_id, position);
            frames.extend(ctx.resolve_frame(None, merged)?.frames);
        }

        let frame_list: Vec<Value> = shuffled.into_iter().map(Value::Object).collect();
        Ok(Resolution {
            frames,
            condition: Some(json!({ "frameList": frame_list })),
        })
    }
}

/// Position overrides win, except that `parameterSets` lists merge element by element
/// with the ones the option (or the common properties) already carry.
fn position_overrides(
    common: &FrameDefinition,
    option: &FrameDefinition,
    ordered: &FrameDefinition,
) -> FrameDefinition {
    let mut overrides = ordered.clone();
    let base_sets = option
        .get("parameterSets")
        .or_else(|| common.get("parameterSets"));
    if let (Some(Value::Array(base)), Some(Value::Array(sets))) =
        (base_sets, ordered.get("parameterSets"))
    {
        overrides.insert(
            "parameterSets".to_string(),
            Value::Array(merge_lists_by_index(base, sets)),
        );
    }
    overrides
}
