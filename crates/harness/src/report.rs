//! Structured report sink
//!
//! Purely observational: scenario outcomes are never affected by anything
//! that happens here. The [`JsonReporter`] writes one result file per
//! scenario (uuid-named, with attachments as sibling files) plus a suite
//! summary, and can bundle the whole output directory into a tar.gz
//! artifact. Sink implementations swallow their own IO errors and log them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::runner::{ScenarioResult, SuiteResult};

/// Report label kinds, used to group scenarios in the rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Epic,
    Feature,
    Tag,
}

impl Label {
    fn as_str(&self) -> &'static str {
        match self {
            Label::Epic => "epic",
            Label::Feature => "feature",
            Label::Tag => "tag",
        }
    }
}

/// Receives step boundaries, named parameters and binary attachments.
///
/// Implementations must never panic and must never let their own failures
/// leak into test outcomes.
pub trait ReportSink: Send + Sync {
    fn scenario_started(&self, scenario: &str);

    fn scenario_finished(&self, scenario: &str, result: &ScenarioResult);

    fn step_started(&self, scenario: &str, step: &str);

    fn step_finished(&self, scenario: &str, step: &str, ok: bool);

    fn parameter(&self, scenario: &str, key: &str, value: &str);

    fn attachment(&self, scenario: &str, name: &str, mime: &str, bytes: &[u8]);

    fn label(&self, scenario: &str, label: Label, value: &str);

    /// Non-fatal note attached to a scenario (e.g. a teardown failure)
    fn annotation(&self, scenario: &str, message: &str);
}

/// A sink that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ReportSink for NullReporter {
    fn scenario_started(&self, _scenario: &str) {}
    fn scenario_finished(&self, _scenario: &str, _result: &ScenarioResult) {}
    fn step_started(&self, _scenario: &str, _step: &str) {}
    fn step_finished(&self, _scenario: &str, _step: &str, _ok: bool) {}
    fn parameter(&self, _scenario: &str, _key: &str, _value: &str) {}
    fn attachment(&self, _scenario: &str, _name: &str, _mime: &str, _bytes: &[u8]) {}
    fn label(&self, _scenario: &str, _label: Label, _value: &str) {}
    fn annotation(&self, _scenario: &str, _message: &str) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepRecord {
    name: String,
    ok: Option<bool>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttachmentRecord {
    name: String,
    mime: String,
    file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScenarioRecord {
    uuid: Uuid,
    name: String,
    started_at: DateTime<Utc>,
    labels: Vec<(String, String)>,
    steps: Vec<StepRecord>,
    parameters: Vec<(String, String)>,
    attachments: Vec<AttachmentRecord>,
    annotations: Vec<String>,
    result: Option<ScenarioResult>,
}

impl ScenarioRecord {
    fn new(name: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            started_at: Utc::now(),
            labels: Vec::new(),
            steps: Vec::new(),
            parameters: Vec::new(),
            attachments: Vec::new(),
            annotations: Vec::new(),
            result: None,
        }
    }
}

/// Writes the structured report to a directory
pub struct JsonReporter {
    output_dir: PathBuf,
    records: Mutex<HashMap<String, ScenarioRecord>>,
}

impl JsonReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            output_dir,
            records: Mutex::new(HashMap::new()),
        })
    }

    fn with_record<F>(&self, scenario: &str, f: F)
    where
        F: FnOnce(&mut ScenarioRecord),
    {
        let mut records = self.records.lock();
        let record = records
            .entry(scenario.to_string())
            .or_insert_with(|| ScenarioRecord::new(scenario));
        f(record);
    }

    fn extension_for(mime: &str) -> &'static str {
        match mime {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "text/plain" => "txt",
            "application/json" => "json",
            _ => "bin",
        }
    }

    /// Write the suite summary to `results.json`
    pub fn write_summary(&self, suite: &SuiteResult) -> Result<PathBuf> {
        let path = self.output_dir.join("results.json");
        let json = serde_json::to_string_pretty(suite)?;
        std::fs::write(&path, json)?;

        info!("results written to: {}", path.display());
        Ok(path)
    }

    /// Package the whole report directory as `<output_dir>.tar.gz`
    pub fn bundle(&self) -> Result<PathBuf> {
        let file_name = self
            .output_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());
        let bundle_path = self.output_dir.with_extension("tar.gz");

        let file = std::fs::File::create(&bundle_path)?;
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(&file_name, &self.output_dir)?;
        builder.into_inner()?.finish()?;

        info!("report bundle written to: {}", bundle_path.display());
        Ok(bundle_path)
    }

    fn flush_record(&self, scenario: &str) {
        let record = {
            let records = self.records.lock();
            match records.get(scenario) {
                Some(record) => record.clone(),
                None => return,
            }
        };

        let path = self.output_dir.join(format!("{}-result.json", record.uuid));
        match serde_json::to_string_pretty(&record) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(scenario, error = %e, "failed to write scenario record");
                }
            }
            Err(e) => warn!(scenario, error = %e, "failed to serialize scenario record"),
        }
    }
}

impl ReportSink for JsonReporter {
    fn scenario_started(&self, scenario: &str) {
        let mut records = self.records.lock();
        records.insert(scenario.to_string(), ScenarioRecord::new(scenario));
    }

    fn scenario_finished(&self, scenario: &str, result: &ScenarioResult) {
        self.with_record(scenario, |record| {
            record.result = Some(result.clone());
        });
        self.flush_record(scenario);
    }

    fn step_started(&self, scenario: &str, step: &str) {
        debug!(scenario, step, "step started");
        self.with_record(scenario, |record| {
            record.steps.push(StepRecord {
                name: step.to_string(),
                ok: None,
                started_at: Utc::now(),
                finished_at: None,
            });
        });
    }

    fn step_finished(&self, scenario: &str, step: &str, ok: bool) {
        debug!(scenario, step, ok, "step finished");
        self.with_record(scenario, |record| {
            if let Some(open) = record
                .steps
                .iter_mut()
                .rev()
                .find(|s| s.name == step && s.ok.is_none())
            {
                open.ok = Some(ok);
                open.finished_at = Some(Utc::now());
            }
        });
    }

    fn parameter(&self, scenario: &str, key: &str, value: &str) {
        self.with_record(scenario, |record| {
            record.parameters.push((key.to_string(), value.to_string()));
        });
    }

    fn attachment(&self, scenario: &str, name: &str, mime: &str, bytes: &[u8]) {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();

        let uuid = {
            let mut records = self.records.lock();
            records
                .entry(scenario.to_string())
                .or_insert_with(|| ScenarioRecord::new(scenario))
                .uuid
        };

        let file = format!(
            "{}-{}.{}",
            uuid,
            sanitized,
            Self::extension_for(mime)
        );
        if let Err(e) = std::fs::write(self.output_dir.join(&file), bytes) {
            warn!(scenario, attachment = name, error = %e, "failed to write attachment");
            return;
        }

        self.with_record(scenario, |record| {
            record.attachments.push(AttachmentRecord {
                name: name.to_string(),
                mime: mime.to_string(),
                file,
            });
        });
    }

    fn label(&self, scenario: &str, label: Label, value: &str) {
        self.with_record(scenario, |record| {
            record
                .labels
                .push((label.as_str().to_string(), value.to_string()));
        });
    }

    fn annotation(&self, scenario: &str, message: &str) {
        self.with_record(scenario, |record| {
            record.annotations.push(message.to_string());
        });
    }
}
