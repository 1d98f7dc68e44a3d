use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use wiretrace::{EngineCommand, ExtractionConfig, Point, TraceOptions, VectorOptions};

#[derive(Error, Debug)]
pub enum WireKitError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Duplicate trace name '{0}'")]
    DuplicateTrace(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// How a click is resolved against the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    /// Single wire through pass-through nodes
    Path,
    /// Every edge of the net
    Component,
    /// Net, then wire, then pixel scan
    #[default]
    Highlight,
}

/// One named click to resolve after the graph is built
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TraceJob {
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub mode: TraceMode,
    #[serde(default)]
    pub stop_at: bool,
}

impl TraceJob {
    pub fn to_command(&self, page_id: &str) -> EngineCommand {
        let id = page_id.to_string();
        let click = Point::new(self.x, self.y);
        let options = TraceOptions { stop_at: self.stop_at };
        match self.mode {
            TraceMode::Path => EngineCommand::TracePath { id, click, options },
            TraceMode::Component => EngineCommand::TraceComponent { id, click },
            TraceMode::Highlight => EngineCommand::Highlight { id, click, options },
        }
    }
}

/// A page to process: where it is, how to extract it, what to export
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JobConfig {
    pub image: String,
    #[serde(default = "default_page_id")]
    pub page_id: String,
    pub output_dir: String,
    #[serde(default)]
    pub config: ExtractionConfig,
    #[serde(default)]
    pub export: VectorOptions,
    #[serde(default)]
    pub traces: Vec<TraceJob>,
}

fn default_page_id() -> String {
    "page".to_string()
}

impl JobConfig {
    /// Job with default parameters and no traces
    pub fn new(image: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            page_id: default_page_id(),
            output_dir: output_dir.into(),
            config: ExtractionConfig::default(),
            export: VectorOptions::default(),
            traces: Vec::new(),
        }
    }

    fn validate(self) -> Result<Self, WireKitError> {
        let mut names = std::collections::HashSet::new();
        for trace in &self.traces {
            if !names.insert(trace.name.as_str()) {
                return Err(WireKitError::DuplicateTrace(trace.name.clone()));
            }
        }
        Ok(self)
    }

    /// Load JobConfig configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, WireKitError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load JobConfig configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, WireKitError> {
        let job: JobConfig = toml::from_str(content)?;
        job.validate()
    }

    /// Load JobConfig configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, WireKitError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load JobConfig configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, WireKitError> {
        let job: JobConfig = serde_json::from_str(content)?;
        job.validate()
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WireKitError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(WireKitError::UnsupportedFileFormat),
        }
    }

    /// Save to `.toml` or `.json` depending on the extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), WireKitError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(WireKitError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    /// Convert JobConfig to TOML string
    pub fn to_toml(&self) -> Result<String, WireKitError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert JobConfig to JSON string
    pub fn to_json(&self) -> Result<String, WireKitError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(JobConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiretrace::Preprocess;

    #[test]
    fn minimal_toml_uses_defaults() {
        let job = JobConfig::from_toml(
            r#"
image = "board.png"
output_dir = "out"

[config]
preprocess = ["denoise", "deskew"]

[config.binarize]
bridge_radius = 3

[[traces]]
name = "vcc"
x = 40
y = 12
mode = "component"
"#,
        )
        .expect("parses");

        assert_eq!(job.page_id, "page");
        assert_eq!(job.config.binarize.bridge_radius, 3);
        assert_eq!(job.config.binarize.block_size, 21);
        assert_eq!(job.config.preprocess, [Preprocess::Denoise, Preprocess::Deskew]);
        assert_eq!(job.export, VectorOptions::default());
        assert_eq!(job.traces[0].mode, TraceMode::Component);
        assert!(matches!(
            job.traces[0].to_command(&job.page_id),
            EngineCommand::TraceComponent { click: Point { x: 40, y: 12 }, .. }
        ));
    }

    #[test]
    fn toml_and_json_round_trip_agree() {
        let mut job = JobConfig::new("scan.tiff", "out");
        job.config.preprocess = Preprocess::AUTO_CLEAN.to_vec();
        job.traces.push(TraceJob { name: "gnd".into(), x: 1, y: 2, mode: TraceMode::Path, stop_at: true });

        let from_toml = JobConfig::from_toml(&job.to_toml().expect("toml")).expect("parses");
        let from_json = JobConfig::from_json(&job.to_json().expect("json")).expect("parses");
        assert_eq!(from_toml, job);
        assert_eq!(from_json, job);
    }

    #[test]
    fn duplicate_trace_names_are_rejected() {
        let content = r#"{
            "image": "a.png", "output_dir": "o",
            "traces": [ { "name": "n", "x": 0, "y": 0 }, { "name": "n", "x": 1, "y": 1 } ]
        }"#;
        assert!(matches!(JobConfig::from_json(content), Err(WireKitError::DuplicateTrace(n)) if n == "n"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        assert!(matches!(
            JobConfig::from_file("job.yaml"),
            Err(WireKitError::UnsupportedFileFormat)
        ));
    }
}
