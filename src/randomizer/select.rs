// `select` sampler: a fixed index (or ordered list of indices) into the frame options.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_node, with_default_id, Randomizer, ResolveContext};
use crate::error::ResolveError;
use crate::merge::deep_merge;
use crate::types::{FrameDefinition, Resolution};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectNode {
    #[serde(default)]
    frame_options: Vec<FrameDefinition>,
    #[serde(default)]
    common_frame_properties: FrameDefinition,
    #[serde(default)]
    frame_index: Option<Value>,
}

pub struct Select;

impl Randomizer for Select {
    fn resolve(
        &self,
        frame_id: &str,
        node: &FrameDefinition,
        ctx: &mut dyn ResolveContext,
    ) -> Result<Resolution, ResolveError> {
        let node: SelectNode = parse_node(frame_id, node)?;
        let indices = normalize_indices(frame_id, node.frame_index.as_ref(), node.frame_options.len())?;

        let mut frames = Vec::new();
        for (position, &index) in indices.iter().enumerate() {
            let merged = deep_merge(&node.common_frame_properties, &node.frame_options[index]);
            let merged = with_default_id(merged, frame_id, position);
            frames.extend(ctx.resolve_frame(None, merged)?.frames);
        }

        Ok(Resolution {
            frames,
            condition: Some(json!({ "frameIndex": indices })),
        })
    }
}

/// Turn `frameIndex` into a checked list of positions.
///
/// Absent, `null` or `false` selects every option in order. `0` is an index, not "absent".
fn normalize_indices(
    frame_id: &str,
    frame_index: Option<&Value>,
    len: usize,
) -> Result<Vec<usize>, ResolveError> {
    let raw: Vec<&Value> = match frame_index {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok((0..len).collect()),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };

    raw.into_iter()
        .map(|value| {
            let index = as_integer(value).ok_or_else(|| ResolveError::InvalidNode {
                frame_id: frame_id.to_string(),
                message: format!("frameIndex entries must be integers, got {}", value),
            })?;
            usize::try_from(index)
                .ok()
                .filter(|i| *i < len)
                .ok_or_else(|| ResolveError::FrameIndexOutOfRange {
                    frame_id: frame_id.to_string(),
                    index,
                    len,
                })
        })
        .collect()
}

fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}
