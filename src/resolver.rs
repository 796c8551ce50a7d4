// Experiment structure resolver: recursive descent over plain frames, groups and choice
// nodes, producing the flat, id-tagged frame sequence plus the conditions map.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::assets::expand_assets;
use crate::dependencies::{resolve_dependencies, DependencyFetcher, NoDependencies};
use crate::error::ResolveError;
use crate::merge::deep_merge;
use crate::randomizer::{parse_node, with_default_id, RandomizerRegistry, ResolveContext};
use crate::substitute::Substituter;
use crate::types::{
    Conditions, ExperimentStructure, FrameDefinition, ParameterSet, ParseOutcome, ParserConfig,
    Resolution, SessionContext,
};

/// What a frame definition is, decided from its `kind` (and `sampler`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// A UI frame type such as `exp-lookit-video`.
    Plain(String),
    /// `kind: "group"`: fixed composition of child frames.
    Group,
    /// `kind: "choice"`: expanded by the named sampler.
    Choice { sampler: String },
}

impl FrameKind {
    pub fn classify(frame_id: &str, frame: &FrameDefinition) -> Result<Self, ResolveError> {
        let kind = frame
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| ResolveError::MissingKind(frame_id.to_string()))?;

        if is_plain_kind(kind) {
            return Ok(FrameKind::Plain(kind.to_string()));
        }
        match kind {
            "group" => Ok(FrameKind::Group),
            "choice" => {
                let sampler = frame
                    .get("sampler")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ResolveError::InvalidNode {
                        frame_id: frame_id.to_string(),
                        message: "choice frame has no sampler".to_string(),
                    })?;
                Ok(FrameKind::Choice {
                    sampler: sampler.to_string(),
                })
            }
            other => Err(ResolveError::UnknownKind {
                frame_id: frame_id.to_string(),
                kind: other.to_string(),
            }),
        }
    }
}

/// `exp-<word>(-<word>)*`, where a word is one or more of `[A-Za-z0-9_]`.
pub fn is_plain_kind(kind: &str) -> bool {
    kind.strip_prefix("exp-").is_some_and(|rest| {
        rest.split('-')
            .all(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupNode {
    #[serde(default)]
    frame_list: Vec<FrameDefinition>,
    #[serde(default)]
    common_frame_properties: FrameDefinition,
}

/// Resolves one experiment structure for one participant session.
///
/// `parse` consumes the parser: every pass gets its own RNG stream and its own
/// substituter, so `#UNIQ` rotations never carry over between sessions or studies.
pub struct ExperimentParser {
    structure: ExperimentStructure,
    session: SessionContext,
    config: ParserConfig,
    registry: RandomizerRegistry,
    fetcher: Box<dyn DependencyFetcher>,
}

impl ExperimentParser {
    pub fn new(structure: ExperimentStructure, session: SessionContext) -> Self {
        ExperimentParser {
            structure,
            session,
            config: ParserConfig::default(),
            registry: RandomizerRegistry::default(),
            fetcher: Box::new(NoDependencies),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: RandomizerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl DependencyFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Resolve the whole `sequence` into frames and conditions.
    pub fn parse(self) -> Result<ParseOutcome, ResolveError> {
        let seed = self.config.seed.unwrap_or_else(entropy_seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let substituter = Substituter::new(StdRng::seed_from_u64(rng.gen()));

        let mut pass = ResolutionPass {
            session: &self.session,
            config: &self.config,
            registry: &self.registry,
            fetcher: self.fetcher.as_ref(),
            rng,
            substituter,
            warnings: Vec::new(),
        };

        let mut frames: Vec<FrameDefinition> = Vec::new();
        let mut conditions = Conditions::new();
        for frame_id in self.structure.sequence_ids() {
            let frame = self
                .structure
                .frames
                .get(frame_id)
                .cloned()
                .ok_or_else(|| ResolveError::UnknownFrame(frame_id.to_string()))?;

            let start = frames.len();
            let resolution = pass.resolve_frame(Some(frame_id), frame)?;
            if let Some(condition) = resolution.condition {
                conditions.insert(format!("{}-{}", start, frame_id), condition);
            }
            // Frames a sampler emitted without an id are named after their sequence entry.
            frames.extend(
                resolution
                    .frames
                    .into_iter()
                    .enumerate()
                    .map(|(position, frame)| match frame_id_of(&frame) {
                        Some(_) => frame,
                        None => {
                            let mut frame = frame;
                            frame.insert(
                                "id".to_string(),
                                Value::String(format!("{}-{}", frame_id, position)),
                            );
                            frame
                        }
                    }),
            );
        }

        if self.config.prepend_frame_inds {
            for (index, frame) in frames.iter_mut().enumerate() {
                let id = frame_id_of(frame).unwrap_or_default();
                frame.insert("id".to_string(), Value::String(format!("{}-{}", index, id)));
            }
        }

        debug!(
            frames = frames.len(),
            conditions = conditions.len(),
            "resolved experiment structure"
        );
        Ok(ParseOutcome {
            frames,
            conditions,
            warnings: pass.warnings,
        })
    }
}

/// State of one resolution pass.
struct ResolutionPass<'p> {
    session: &'p SessionContext,
    config: &'p ParserConfig,
    registry: &'p RandomizerRegistry,
    fetcher: &'p dyn DependencyFetcher,
    rng: StdRng,
    substituter: Substituter,
    warnings: Vec<String>,
}

impl<'p> ResolutionPass<'p> {
    fn resolve_frame(
        &mut self,
        frame_id: Option<&str>,
        frame: FrameDefinition,
    ) -> Result<Resolution, ResolveError> {
        let label = frame_id
            .map(str::to_string)
            .or_else(|| frame_id_of(&frame))
            .unwrap_or_else(|| "<unnamed>".to_string());

        let mut frame = self.apply_own_parameters(frame)?;

        match FrameKind::classify(&label, &frame)? {
            FrameKind::Plain(kind) => {
                if let Some(id) = frame_id {
                    if !frame.contains_key("id") {
                        frame.insert("id".to_string(), Value::String(id.to_string()));
                    }
                }
                let frame = resolve_dependencies(frame, self.fetcher)?;
                let frame = match self.config.asset_expansion.get(&kind) {
                    Some(paths) => expand_assets(frame, paths, self.config)?,
                    None => frame,
                };
                Ok(Resolution::single(frame))
            }
            FrameKind::Group => self.resolve_group(&label, &frame),
            FrameKind::Choice { sampler } => {
                let registry = self.registry;
                let randomizer =
                    registry
                        .get(&sampler)
                        .ok_or_else(|| ResolveError::UnknownSampler {
                            frame_id: label.clone(),
                            sampler: sampler.clone(),
                        })?;
                debug!(frame_id = %label, sampler = %sampler, "dispatching choice node");
                randomizer.resolve(&label, &frame, self)
            }
        }
    }

    /// A frame carrying `parameters` substitutes them into its own other fields first.
    fn apply_own_parameters(&mut self, mut frame: FrameDefinition) -> Result<FrameDefinition, ResolveError> {
        let parameters = match frame.remove("parameters") {
            Some(Value::Object(parameters)) => parameters,
            Some(other) => {
                frame.insert("parameters".to_string(), other);
                return Ok(frame);
            }
            None => return Ok(frame),
        };

        let mut out = self.substituter.replace_in_map(&frame, &parameters)?;
        out.insert("parameters".to_string(), Value::Object(parameters));
        Ok(out)
    }

    fn resolve_group(
        &mut self,
        label: &str,
        frame: &FrameDefinition,
    ) -> Result<Resolution, ResolveError> {
        let group: GroupNode = parse_node(label, frame)?;

        let mut frames = Vec::new();
        let mut conditions = Map::new();
        for (position, element) in group.frame_list.iter().enumerate() {
            let merged = deep_merge(&group.common_frame_properties, element);
            let merged = with_default_id(merged, label, position);
            let resolution = self.resolve_frame(None, merged)?;
            if let Some(condition) = resolution.condition {
                conditions.insert(position.to_string(), condition);
            }
            frames.extend(resolution.frames);
        }

        Ok(Resolution {
            frames,
            condition: (!conditions.is_empty()).then_some(Value::Object(conditions)),
        })
    }
}

impl<'p> ResolveContext for ResolutionPass<'p> {
    fn resolve_frame(
        &mut self,
        frame_id: Option<&str>,
        frame: FrameDefinition,
    ) -> Result<Resolution, ResolveError> {
        ResolutionPass::resolve_frame(self, frame_id, frame)
    }

    fn substitute(
        &mut self,
        frame: &FrameDefinition,
        parameters: &ParameterSet,
    ) -> Result<FrameDefinition, ResolveError> {
        self.substituter.replace_in_map(frame, parameters)
    }

    fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn session(&self) -> &SessionContext {
        self.session
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// A frame's `id` as a string, if it has one.
fn frame_id_of(frame: &FrameDefinition) -> Option<String> {
    match frame.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(target_arch = "wasm32")]
fn entropy_seed() -> u64 {
    let half = || (js_sys::Math::random() * f64::from(u32::MAX)) as u64;
    (half() << 32) | half()
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy_seed() -> u64 {
    rand::random()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::StaticDependencies;
    use crate::types::{AssetPaths, PastSessionRecord};
    use serde_json::json;

    fn structure(value: Value) -> ExperimentStructure {
        serde_json::from_value(value).unwrap()
    }

    fn seeded(seed: u64) -> ParserConfig {
        ParserConfig {
            seed: Some(seed),
            ..ParserConfig::default()
        }
    }

    fn ids(outcome: &ParseOutcome) -> Vec<&str> {
        outcome
            .frames
            .iter()
            .map(|f| f["id"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn plain_kind_pattern() {
        assert!(is_plain_kind("exp-video"));
        assert!(is_plain_kind("exp-lookit-video-consent"));
        assert!(is_plain_kind("exp-lookit_custom-2"));
        assert!(!is_plain_kind("exp-"));
        assert!(!is_plain_kind("exp--video"));
        assert!(!is_plain_kind("video"));
        assert!(!is_plain_kind("group"));
    }

    #[test]
    fn plain_frames_pass_through_with_indexed_ids() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {
                    "f1": {"kind": "exp-lookit-text", "blocks": [{"title": "Hi"}]},
                    "f2": {"kind": "exp-lookit-exit-survey", "debriefing": {"title": "Bye"}}
                },
                "sequence": ["f1", "f2"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap();

        assert_eq!(
            outcome.frames,
            vec![
                json!({"kind": "exp-lookit-text", "blocks": [{"title": "Hi"}], "id": "0-f1"})
                    .as_object()
                    .unwrap()
                    .clone(),
                json!({"kind": "exp-lookit-exit-survey", "debriefing": {"title": "Bye"}, "id": "1-f2"})
                    .as_object()
                    .unwrap()
                    .clone(),
            ]
        );
        assert!(outcome.conditions.is_empty());
    }

    #[test]
    fn prepend_can_be_disabled() {
        let config = ParserConfig {
            prepend_frame_inds: false,
            ..ParserConfig::default()
        };
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"intro": {"kind": "exp-lookit-text"}},
                "sequence": ["intro"]
            })),
            SessionContext::default(),
        )
        .with_config(config)
        .parse()
        .unwrap();
        assert_eq!(ids(&outcome), vec!["intro"]);
    }

    #[test]
    fn group_merges_common_properties_and_flattens() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {
                    "intro": {"kind": "exp-lookit-text"},
                    "trials": {
                        "kind": "group",
                        "commonFrameProperties": {"kind": "exp-lookit-images-audio", "a": 1, "b": 2},
                        "frameList": [{"id": "t1", "b": 3}, {"id": "t2"}]
                    }
                },
                "sequence": ["intro", "trials"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap();

        assert_eq!(ids(&outcome), vec!["0-intro", "1-t1", "2-t2"]);
        assert_eq!(outcome.frames[1]["a"], 1);
        assert_eq!(outcome.frames[1]["b"], 3);
        assert_eq!(outcome.frames[2]["b"], 2);
        assert!(outcome.conditions.is_empty());
    }

    #[test]
    fn group_children_without_ids_get_positional_ids() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"block": {"kind": "group", "frameList": [
                    {"kind": "exp-lookit-text"}, {"kind": "exp-lookit-text"}
                ]}},
                "sequence": ["block"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap();
        assert_eq!(ids(&outcome), vec!["0-block-0", "1-block-1"]);
    }

    #[test]
    fn unknown_sequence_id_is_an_error() {
        let err = ExperimentParser::new(
            structure(json!({
                "frames": {"block": {"kind": "exp-lookit-text"}},
                "sequence": ["intro", "block"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownFrame(ref id) if id == "intro"));
    }

    #[test]
    fn group_collects_child_conditions_by_position() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"block": {"kind": "group", "frameList": [
                    {"kind": "exp-lookit-text", "id": "plain"},
                    {"kind": "choice", "sampler": "select", "id": "pick", "frameIndex": 1,
                     "frameOptions": [{"kind": "exp-lookit-text", "id": "x"}, {"kind": "exp-lookit-text", "id": "y"}]}
                ]}},
                "sequence": ["block"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap();
        assert_eq!(ids(&outcome), vec!["0-plain", "1-y"]);
        assert_eq!(outcome.conditions["0-block"], json!({"1": {"frameIndex": [1]}}));
    }

    #[test]
    fn conditions_are_keyed_by_first_frame_index() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {
                    "a": {"kind": "exp-lookit-text"},
                    "b": {"kind": "exp-lookit-text"},
                    "pick": {"kind": "choice", "sampler": "select", "frameIndex": 0,
                             "frameOptions": [{"kind": "exp-lookit-text"}]}
                },
                "sequence": ["a", "b", "pick"]
            })),
            SessionContext::default(),
        )
        .with_config(seeded(1))
        .parse()
        .unwrap();
        assert!(outcome.conditions.contains_key("2-pick"));
    }

    #[test]
    fn own_parameters_are_substituted_before_dispatch() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"trial": {
                    "kind": "exp-lookit-video",
                    "parameters": {"STIM": "ball.mp4", "SIDES": ["left", "right"]},
                    "video": "STIM",
                    "side": "SIDES#1"
                }},
                "sequence": ["trial"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap();
        let frame = &outcome.frames[0];
        assert_eq!(frame["video"], "ball.mp4");
        assert_eq!(frame["side"], "right");
        assert_eq!(frame["parameters"]["STIM"], "ball.mp4");
    }

    #[test]
    fn group_parameters_reach_children() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"block": {
                    "kind": "group",
                    "parameters": {"CHILD_KIND": "exp-lookit-text", "GREETING": "hello"},
                    "frameList": [{"kind": "CHILD_KIND", "text": "GREETING"}]
                }},
                "sequence": ["block"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap();
        assert_eq!(outcome.frames[0]["kind"], "exp-lookit-text");
        assert_eq!(outcome.frames[0]["text"], "hello");
    }

    #[test]
    fn outer_parameters_leave_nested_parameter_sets_alone() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"block": {
                    "kind": "choice",
                    "sampler": "random-parameter-set",
                    "parameters": {"TITLE": "Block A"},
                    "commonFrameProperties": {"kind": "exp-lookit-text", "title": "TITLE"},
                    "frameList": [{"word": "W#0"}],
                    "parameterSets": [{"W": ["apple"]}]
                }},
                "sequence": ["block"]
            })),
            SessionContext::default(),
        )
        .with_config(seeded(2))
        .parse()
        .unwrap();
        assert_eq!(outcome.frames[0]["title"], "Block A");
        assert_eq!(outcome.frames[0]["word"], "apple");
    }

    #[test]
    fn misspelled_parameter_reference_is_an_error() {
        let err = ExperimentParser::new(
            structure(json!({
                "frames": {"trial": {
                    "kind": "exp-lookit-video",
                    "parameters": {"SIDES": ["left", "right"]},
                    "side": "SIDE#1"
                }},
                "sequence": ["trial"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownSelectorTarget { ref name, .. } if name == "SIDE"));
    }

    #[test]
    fn sampler_frames_without_ids_are_named_after_the_entry() {
        struct Bare;

        impl crate::randomizer::Randomizer for Bare {
            fn resolve(
                &self,
                _frame_id: &str,
                _node: &FrameDefinition,
                _ctx: &mut dyn ResolveContext,
            ) -> Result<Resolution, ResolveError> {
                let mut frame = FrameDefinition::new();
                frame.insert("kind".to_string(), Value::from("exp-lookit-text"));
                Ok(Resolution {
                    frames: vec![frame.clone(), frame],
                    condition: None,
                })
            }
        }

        let mut registry = RandomizerRegistry::default();
        registry.register("bare", Bare);
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"pick": {"kind": "choice", "sampler": "bare"}},
                "sequence": ["pick"]
            })),
            SessionContext::default(),
        )
        .with_registry(registry)
        .parse()
        .unwrap();
        assert_eq!(ids(&outcome), vec!["0-pick-0", "1-pick-1"]);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let err = ExperimentParser::new(
            structure(json!({
                "frames": {"odd": {"kind": "carousel"}},
                "sequence": ["odd"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownKind { ref kind, .. } if kind == "carousel"));
    }

    #[test]
    fn missing_kind_is_an_error() {
        let err = ExperimentParser::new(
            structure(json!({"frames": {"odd": {"id": "x"}}, "sequence": ["odd"]})),
            SessionContext::default(),
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, ResolveError::MissingKind(_)));
    }

    #[test]
    fn unknown_sampler_is_an_error() {
        let err = ExperimentParser::new(
            structure(json!({
                "frames": {"pick": {"kind": "choice", "sampler": "shuffle-all"}},
                "sequence": ["pick"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownSampler { ref sampler, .. } if sampler == "shuffle-all"));
    }

    #[test]
    fn nested_errors_abort_the_pass() {
        let err = ExperimentParser::new(
            structure(json!({
                "frames": {"block": {"kind": "group", "frameList": [
                    {"kind": "exp-lookit-text"},
                    {"kind": "choice", "sampler": "select", "frameIndex": 4,
                     "frameOptions": [{"kind": "exp-lookit-text"}]}
                ]}},
                "sequence": ["block"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, ResolveError::FrameIndexOutOfRange { index: 4, len: 1, .. }));
    }

    #[test]
    fn dependencies_resolve_through_fetcher() {
        let fetcher: StaticDependencies = [("/consent.txt", "I agree")].into_iter().collect();
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {"consent": {"kind": "exp-lookit-video-consent", "prompt": "URL:/consent.txt"}},
                "sequence": ["consent"]
            })),
            SessionContext::default(),
        )
        .with_fetcher(fetcher)
        .parse()
        .unwrap();
        assert_eq!(outcome.frames[0]["prompt"], "I agree");
    }

    #[test]
    fn unresolvable_dependency_is_an_error() {
        let err = ExperimentParser::new(
            structure(json!({
                "frames": {"consent": {"kind": "exp-lookit-video-consent", "prompt": "JSON:/c.json"}},
                "sequence": ["consent"]
            })),
            SessionContext::default(),
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, ResolveError::Dependency { .. }));
    }

    #[test]
    fn assets_expand_for_configured_kinds() {
        let mut config = seeded(1);
        config.asset_expansion.insert(
            "exp-lookit-images-audio".to_string(),
            AssetPaths {
                audio: vec!["audio".to_string()],
                image: vec!["images/src".to_string()],
                ..AssetPaths::default()
            },
        );
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {
                    "trial": {"kind": "exp-lookit-images-audio", "baseDir": "/stim/",
                              "audio": "prompt", "images": [{"src": "dog.png"}]},
                    "other": {"kind": "exp-lookit-text", "baseDir": "/stim/", "audio": "prompt"}
                },
                "sequence": ["trial", "other"]
            })),
            SessionContext::default(),
        )
        .with_config(config)
        .parse()
        .unwrap();
        assert_eq!(outcome.frames[0]["images"][0]["src"], "/stim/img/dog.png");
        assert_eq!(outcome.frames[0]["audio"][0]["src"], "/stim/mp3/prompt.mp3");
        assert_eq!(outcome.frames[1]["audio"], "prompt");
    }

    #[test]
    fn uniq_rotation_spans_the_whole_pass() {
        let outcome = ExperimentParser::new(
            structure(json!({
                "frames": {
                    "first": {"kind": "choice", "sampler": "random-parameter-set",
                              "commonFrameProperties": {"kind": "exp-lookit-text"},
                              "frameList": [{"word": "W#UNIQ"}, {"word": "W#UNIQ"}],
                              "parameterSets": [{"W": ["a", "b", "c"]}]},
                    "second": {"kind": "choice", "sampler": "random-parameter-set",
                               "commonFrameProperties": {"kind": "exp-lookit-text"},
                               "frameList": [{"word": "W#UNIQ"}, {"word": "W#UNIQ"}],
                               "parameterSets": [{"W": ["a", "b", "c"]}]}
                },
                "sequence": ["first", "second"]
            })),
            SessionContext::default(),
        )
        .with_config(seeded(12))
        .parse()
        .unwrap();

        let words: Vec<&str> = outcome
            .frames
            .iter()
            .map(|f| f["word"].as_str().unwrap())
            .collect();
        let mut cycle = words[..3].to_vec();
        cycle.sort();
        assert_eq!(cycle, vec!["a", "b", "c"]);
        assert_eq!(words[3], words[0]);
    }

    #[test]
    fn same_seed_same_outcome() {
        let build = || {
            ExperimentParser::new(
                structure(json!({
                    "frames": {"order": {"kind": "choice", "sampler": "permute", "frameOptions": [
                        {"kind": "exp-lookit-text", "id": "a"},
                        {"kind": "exp-lookit-text", "id": "b"},
                        {"kind": "exp-lookit-text", "id": "c"},
                        {"kind": "exp-lookit-text", "id": "d"}
                    ]}},
                    "sequence": ["order"]
                })),
                SessionContext::default(),
            )
            .with_config(seeded(99))
            .parse()
            .unwrap()
        };
        assert_eq!(build().frames, build().frames);
    }

    #[test]
    fn counterbalancing_reads_conditions_from_a_previous_outcome() {
        let study = json!({
            "frames": {
                "intro": {"kind": "exp-lookit-text"},
                "cond": {"kind": "choice", "sampler": "random-parameter-set",
                         "conditionForAdditionalSessions": "rotate",
                         "frameList": [{"kind": "exp-lookit-text", "label": "L"}],
                         "parameterSets": [{"L": "zero"}, {"L": "one"}, {"L": "two"}]}
            },
            "sequence": ["intro", "cond"]
        });

        let first = ExperimentParser::new(structure(study.clone()), SessionContext::default())
            .with_config(seeded(5))
            .parse()
            .unwrap();
        let first_num = first.conditions["1-cond"]["conditionNum"].as_i64().unwrap();

        let session = SessionContext {
            past_sessions: vec![PastSessionRecord {
                completed_consent_frame: true,
                conditions: first.conditions.clone(),
            }],
            ..SessionContext::default()
        };
        let second = ExperimentParser::new(structure(study), session)
            .with_config(seeded(6))
            .parse()
            .unwrap();
        assert_eq!(
            second.conditions["1-cond"]["conditionNum"].as_i64().unwrap(),
            (first_num + 1) % 3
        );
    }
}
