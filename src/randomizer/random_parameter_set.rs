// `random-parameter-set` sampler: choose one parameter set (weighted, optionally by age,
// or counterbalanced against the participant's previous session), then fill the frame
// templates with it.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{parse_node, with_default_id, Randomizer, ResolveContext};
use crate::error::ResolveError;
use crate::merge::deep_merge;
use crate::types::{FrameDefinition, ParameterSet, PastSessionRecord, Resolution};
use crate::weighted::pick_weighted;

/// How a returning participant's parameter set relates to their previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionPolicy {
    /// Draw afresh every session.
    #[default]
    Random,
    /// Reuse the previous session's condition.
    Persist,
    /// Advance to the next condition, wrapping around.
    Rotate,
}

impl ConditionPolicy {
    pub fn parse(frame_id: &str, value: Option<&Value>) -> Result<Self, ResolveError> {
        match value {
            None | Some(Value::Null) => Ok(ConditionPolicy::Random),
            Some(Value::String(s)) if s == "random" => Ok(ConditionPolicy::Random),
            Some(Value::String(s)) if s == "persist" => Ok(ConditionPolicy::Persist),
            Some(Value::String(s)) if s == "rotate" => Ok(ConditionPolicy::Rotate),
            Some(other) => Err(ResolveError::InvalidConditionPolicy {
                frame_id: frame_id.to_string(),
                value: match other {
                    Value::String(s) => s.clone(),
                    v => v.to_string(),
                },
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgeBracket {
    min_age: f64,
    max_age: f64,
    weights: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ParameterSetWeights {
    Flat(Vec<f64>),
    ByAge(Vec<AgeBracket>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RandomParameterSetNode {
    #[serde(default)]
    frame_list: Vec<FrameDefinition>,
    #[serde(default)]
    common_frame_properties: FrameDefinition,
    #[serde(default)]
    parameter_sets: Vec<ParameterSet>,
    #[serde(default)]
    parameter_set_weights: Option<ParameterSetWeights>,
}

pub struct RandomParameterSet;

impl Randomizer for RandomParameterSet {
    fn resolve(
        &self,
        frame_id: &str,
        node: &FrameDefinition,
        ctx: &mut dyn ResolveContext,
    ) -> Result<Resolution, ResolveError> {
        let policy = ConditionPolicy::parse(
            frame_id,
            node.get("conditionForAdditionalSessions"),
        )?;
        let node: RandomParameterSetNode = parse_node(frame_id, node)?;
        if node.parameter_sets.is_empty() {
            return Err(ResolveError::InvalidNode {
                frame_id: frame_id.to_string(),
                message: "parameterSets must contain at least one parameter set".to_string(),
            });
        }

        let condition_num = match counterbalanced_index(frame_id, policy, &node, ctx) {
            Some(index) => index,
            None => {
                let weights = select_weights(&node, ctx);
                let (index, _) =
                    pick_weighted(&node.parameter_sets, weights.as_deref(), ctx.rng())?;
                index
            }
        };
        let parameter_set = &node.parameter_sets[condition_num];
        debug!(frame_id = %frame_id, condition_num = condition_num, ?policy, "chose parameter set");

        let mut frames = Vec::new();
        for (position, fragment) in node.frame_list.iter().enumerate() {
            let merged = deep_merge(&node.common_frame_properties, fragment);
            let substituted = ctx.substitute(&merged, parameter_set)?;
            let substituted = with_default_id(substituted, frame_id, position);
            frames.extend(ctx.resolve_frame(None, substituted)?.frames);
        }

        Ok(Resolution {
            frames,
            condition: Some(json!({
                "conditionNum": condition_num,
                "parameterSet": parameter_set,
            })),
        })
    }
}

/// Index dictated by the previous session under `persist`/`rotate`, if there is one.
fn counterbalanced_index(
    frame_id: &str,
    policy: ConditionPolicy,
    node: &RandomParameterSetNode,
    ctx: &mut dyn ResolveContext,
) -> Option<usize> {
    if policy == ConditionPolicy::Random {
        return None;
    }

    let previous = match previous_condition(frame_id, &ctx.session().past_sessions) {
        Some(condition) => condition,
        None => {
            debug!(frame_id = %frame_id, "no prior consented session; drawing a new condition");
            return None;
        }
    };
    let Some(stored) = previous.get("conditionNum").and_then(Value::as_i64) else {
        ctx.warn(format!(
            "Frame '{}': previous session's condition has no conditionNum; drawing a new condition",
            frame_id
        ));
        return None;
    };

    let len = node.parameter_sets.len() as i64;
    let index = match policy {
        ConditionPolicy::Persist => stored.clamp(0, len - 1),
        ConditionPolicy::Rotate => (stored + 1).rem_euclid(len),
        ConditionPolicy::Random => return None,
    };
    debug!(frame_id = %frame_id, stored = stored, index = index, "counterbalanced against previous session");
    Some(index as usize)
}

/// Condition recorded for `frame_id` in the newest session that completed consent.
fn previous_condition<'a>(frame_id: &str, sessions: &'a [PastSessionRecord]) -> Option<&'a Value> {
    let suffix = format!("-{}", frame_id);
    sessions
        .iter()
        .filter(|session| session.completed_consent_frame)
        .find_map(|session| {
            session
                .conditions
                .iter()
                .find(|(key, _)| key.ends_with(&suffix))
                .map(|(_, condition)| condition)
        })
}

/// Weights for the draw; `None` means equal weights.
fn select_weights(node: &RandomParameterSetNode, ctx: &mut dyn ResolveContext) -> Option<Vec<f64>> {
    match node.parameter_set_weights.as_ref()? {
        ParameterSetWeights::Flat(weights) => Some(weights.clone()),
        ParameterSetWeights::ByAge(brackets) => {
            let now = ctx.session().reference_time();
            let age = ctx
                .session()
                .child
                .as_ref()
                .and_then(|child| child.age_in_days(now));
            let age = match age {
                Some(days) => days,
                None => {
                    ctx.warn(
                        "Child birthday unavailable or invalid; using today for age-based weights"
                            .to_string(),
                    );
                    0
                }
            };

            let age = age as f64;
            match brackets
                .iter()
                .find(|b| b.min_age <= age && age <= b.max_age)
            {
                Some(bracket) => Some(bracket.weights.clone()),
                None => {
                    ctx.warn(format!(
                        "Child age {} days matches no parameterSetWeights bracket; using equal weights",
                        age
                    ));
                    None
                }
            }
        }
    }
}
