use super::cascade::{CascadeReport, ConfigError};
use super::steps::StepRenderError;
use crate::shared::logging::{append_log_line, now_secs};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
        }
    }
}

/// Side channel for derivation problems and cascade effects. Never fails the
/// caller: a log file that cannot be written is ignored.
#[derive(Debug)]
pub struct Diagnostics {
    buffer: RefCell<VecDeque<Value>>,
    capacity: usize,
    log_path: Option<PathBuf>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Diagnostics {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: RefCell::new(VecDeque::new()),
            capacity: capacity.max(1),
            log_path: None,
        }
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn record(&self, level: Level, event: &str, message: &str, fields: Map<String, Value>) {
        let mut payload = serde_json::json!({
            "timestamp": now_secs(),
            "level": level.as_str(),
            "event": event,
            "message": message,
        });
        if let Value::Object(object) = &mut payload {
            object.extend(fields);
        }

        if let Some(path) = &self.log_path {
            if let Ok(line) = serde_json::to_string(&payload) {
                let _ = append_log_line(path, &line);
            }
        }

        let mut buffer = self.buffer.borrow_mut();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(payload);
    }

    pub fn entries(&self) -> Vec<Value> {
        self.buffer.borrow().iter().cloned().collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.buffer
            .borrow()
            .iter()
            .filter_map(|entry| entry.get("event").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    pub fn drain(&self) -> Vec<Value> {
        self.buffer.borrow_mut().drain(..).collect()
    }

    pub(crate) fn cascade(&self, intent: &str, report: &CascadeReport) {
        for effect in &report.effects {
            let mut fields = Map::new();
            fields.insert("intent".to_string(), Value::from(intent));
            fields.insert("field".to_string(), Value::from(effect.field().as_str()));
            fields.insert("effect".to_string(), Value::from(effect.as_str()));
            self.record(
                Level::Debug,
                "cascade.effect",
                &format!("{} `{}`", effect.as_str(), effect.field()),
                fields,
            );
        }
    }

    pub(crate) fn rejected(&self, intent: &str, error: &ConfigError) {
        let mut fields = Map::new();
        fields.insert("intent".to_string(), Value::from(intent));
        self.record(Level::Warn, "update.rejected", &error.to_string(), fields);
    }

    pub(crate) fn render_failed(&self, error: &StepRenderError) {
        let mut fields = Map::new();
        fields.insert("step".to_string(), Value::from(error.step_id.as_str()));
        self.record(Level::Warn, "step.render_failed", &error.to_string(), fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn buffer_keeps_most_recent_entries() {
        let diagnostics = Diagnostics::with_capacity(2);
        for event in ["a", "b", "c"] {
            diagnostics.record(Level::Info, event, "msg", Map::new());
        }
        assert_eq!(diagnostics.events(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(diagnostics.drain().len(), 2);
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn entries_are_appended_to_log_file_as_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs/wizard.log");
        let diagnostics = Diagnostics::default().with_log_file(&path);
        let mut fields = Map::new();
        fields.insert("field".to_string(), Value::from("framework"));
        diagnostics.record(Level::Warn, "update.rejected", "nope", fields);

        let raw = fs::read_to_string(&path).expect("read log");
        let line: Value = serde_json::from_str(raw.trim()).expect("json line");
        assert_eq!(line["level"], "warn");
        assert_eq!(line["event"], "update.rejected");
        assert_eq!(line["field"], "framework");
        assert!(line["timestamp"].as_i64().is_some());
    }
}
