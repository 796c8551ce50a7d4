// Data model shared by the resolver, the randomizers and the JS boundary.
// Frame bodies stay as open JSON maps; everything the resolver interprets is typed.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResolveError;

/// One frame configuration: string keys to arbitrary JSON values.
pub type FrameDefinition = Map<String, Value>;

/// Placeholder name to substitution value (scalar or list for selector syntax).
pub type ParameterSet = Map<String, Value>;

/// Randomization decisions keyed by node, persisted verbatim by the player.
pub type Conditions = Map<String, Value>;

/// Entry of the top-level `sequence`: a frame id or a nested list of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SequenceEntry {
    Id(String),
    Nested(Vec<SequenceEntry>),
}

impl SequenceEntry {
    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SequenceEntry::Id(id) => out.push(id),
            SequenceEntry::Nested(entries) => {
                for entry in entries {
                    entry.flatten_into(out);
                }
            }
        }
    }
}

/// Declarative experiment description: frame definitions plus the order to run them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentStructure {
    #[serde(default)]
    pub frames: HashMap<String, FrameDefinition>,
    #[serde(default)]
    pub sequence: Vec<SequenceEntry>,
}

impl ExperimentStructure {
    /// Parse a structure from JSON text. A JSON string holding the structure is decoded again.
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::String(inner) => Ok(serde_json::from_str(&inner)?),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Top-level frame ids in run order, nested lists flattened.
    pub fn sequence_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for entry in &self.sequence {
            entry.flatten_into(&mut ids);
        }
        ids
    }
}

/// A prior session of the same participant, as stored by the player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastSessionRecord {
    #[serde(default)]
    pub completed_consent_frame: bool,
    #[serde(default)]
    pub conditions: Conditions,
}

/// Participant record. Only the birthday matters to resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Child {
    #[serde(default)]
    pub birthday: Option<Value>,
}

impl Child {
    pub fn with_birthday(birthday: impl Into<Value>) -> Self {
        Child {
            birthday: Some(birthday.into()),
        }
    }

    /// Birthday as a UTC instant. Accepts RFC 3339, `YYYY-MM-DD`, or epoch milliseconds.
    pub fn birthday(&self) -> Option<DateTime<Utc>> {
        match self.birthday.as_ref()? {
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| Utc.from_utc_datetime(&naive))
                }),
            Value::Number(millis) => millis
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        }
    }

    /// Whole days between birthday and `now`, or `None` if the birthday is unusable.
    pub fn age_in_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.birthday().map(|birthday| (now - birthday).num_days())
    }
}

/// Everything about the participant a resolution pass may consult.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Newest first.
    #[serde(default)]
    pub past_sessions: Vec<PastSessionRecord>,
    #[serde(default)]
    pub child: Option<Child>,
    /// Reference clock; current time when absent.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// Properties of a frame kind whose values name media assets relative to `baseDir`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPaths {
    #[serde(default)]
    pub audio: Vec<String>,
    #[serde(default)]
    pub video: Vec<String>,
    #[serde(default)]
    pub image: Vec<String>,
}

/// Parser configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserConfig {
    /// Prefix every resolved frame id with its position (`3-intro`).
    #[serde(default = "default_true")]
    pub prepend_frame_inds: bool,
    /// Fixed seed for reproducible passes; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Frame kind to the asset properties expanded for that kind.
    #[serde(default)]
    pub asset_expansion: HashMap<String, AssetPaths>,
    #[serde(default = "default_audio_types")]
    pub audio_types: Vec<String>,
    #[serde(default = "default_video_types")]
    pub video_types: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_audio_types() -> Vec<String> {
    vec!["mp3".to_string(), "ogg".to_string()]
}

fn default_video_types() -> Vec<String> {
    vec!["webm".to_string(), "mp4".to_string()]
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            prepend_frame_inds: true,
            seed: None,
            asset_expansion: HashMap::new(),
            audio_types: default_audio_types(),
            video_types: default_video_types(),
        }
    }
}

/// Frames produced by one node, plus the randomization decision it made (if any).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub frames: Vec<FrameDefinition>,
    pub condition: Option<Value>,
}

impl Resolution {
    pub fn single(frame: FrameDefinition) -> Self {
        Resolution {
            frames: vec![frame],
            condition: None,
        }
    }
}

/// Complete result of a resolution pass, returned to JS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub frames: Vec<FrameDefinition>,
    pub conditions: Conditions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
