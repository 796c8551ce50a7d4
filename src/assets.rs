// Asset-name expansion for terminal frames: short media names relative to `baseDir`
// become full URLs (images) or per-format source lists (audio, video).

use serde_json::{json, Map, Value};

use crate::error::ResolveError;
use crate::types::{AssetPaths, FrameDefinition, ParserConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Audio,
    Video,
    Image,
}

impl MediaKind {
    fn mime_prefix(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }
}

/// Expansion settings for one frame: its base directory and media formats.
struct AssetExpander {
    base_dir: String,
    audio_types: Vec<String>,
    video_types: Vec<String>,
}

impl AssetExpander {
    fn for_frame(frame: &FrameDefinition, base_dir: &str, config: &ParserConfig) -> Self {
        let types = |field: &str, fallback: &[String]| -> Vec<String> {
            match frame.get(field) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => fallback.to_vec(),
            }
        };

        let mut base_dir = base_dir.to_string();
        if !base_dir.is_empty() && !base_dir.ends_with('/') {
            base_dir.push('/');
        }

        AssetExpander {
            base_dir,
            audio_types: types("audioTypes", &config.audio_types),
            video_types: types("videoTypes", &config.video_types),
        }
    }

    fn expand_value(&self, kind: MediaKind, value: &Value) -> Value {
        match value {
            Value::String(name) if name.contains("://") => value.clone(),
            Value::String(name) => match kind {
                MediaKind::Image => Value::String(format!("{}img/{}", self.base_dir, name)),
                MediaKind::Audio => self.sources(kind, name, &self.audio_types),
                MediaKind::Video => self.sources(kind, name, &self.video_types),
            },
            Value::Array(items) if kind == MediaKind::Image => Value::Array(
                items
                    .iter()
                    .map(|item| self.expand_value(kind, item))
                    .collect(),
            ),
            // Already a source list or some other explicit value.
            other => other.clone(),
        }
    }

    fn sources(&self, kind: MediaKind, stub: &str, types: &[String]) -> Value {
        Value::Array(
            types
                .iter()
                .map(|ext| {
                    json!({
                        "src": format!("{}{}/{}.{}", self.base_dir, ext, stub, ext),
                        "type": format!("{}/{}", kind.mime_prefix(), ext),
                    })
                })
                .collect(),
        )
    }

    fn expand_field(&self, map: &mut Map<String, Value>, field: &str, kind: MediaKind) {
        if let Some(expanded) = map.get(field).map(|value| self.expand_value(kind, value)) {
            map.insert(field.to_string(), expanded);
        }
    }

    fn expand_path(
        &self,
        frame: &mut FrameDefinition,
        path: &str,
        kind: MediaKind,
    ) -> Result<(), ResolveError> {
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [field] => self.expand_field(frame, field, kind),
            [outer, inner] => match frame.get_mut(*outer) {
                Some(Value::Array(items)) => {
                    for item in items.iter_mut() {
                        if let Value::Object(obj) = item {
                            self.expand_field(obj, inner, kind);
                        }
                    }
                }
                Some(Value::Object(obj)) => self.expand_field(obj, inner, kind),
                _ => {}
            },
            _ => return Err(ResolveError::UnsupportedAssetPath(path.to_string())),
        }
        Ok(())
    }
}

/// Check that every configured path is at most `outer/inner`.
pub fn validate_paths(paths: &AssetPaths) -> Result<(), ResolveError> {
    paths
        .audio
        .iter()
        .chain(&paths.video)
        .chain(&paths.image)
        .find(|path| path.split('/').count() > 2)
        .map_or(Ok(()), |path| {
            Err(ResolveError::UnsupportedAssetPath(path.clone()))
        })
}

/// Expand the asset properties named in `paths`. Frames without `baseDir` are returned as-is.
pub fn expand_assets(
    mut frame: FrameDefinition,
    paths: &AssetPaths,
    config: &ParserConfig,
) -> Result<FrameDefinition, ResolveError> {
    validate_paths(paths)?;

    let Some(base_dir) = frame.get("baseDir").and_then(Value::as_str).map(str::to_string) else {
        return Ok(frame);
    };
    let expander = AssetExpander::for_frame(&frame, &base_dir, config);

    let groups = [
        (&paths.audio, MediaKind::Audio),
        (&paths.video, MediaKind::Video),
        (&paths.image, MediaKind::Image),
    ];
    for (list, kind) in groups {
        for path in list {
            expander.expand_path(&mut frame, path, kind)?;
        }
    }
    Ok(frame)
}
