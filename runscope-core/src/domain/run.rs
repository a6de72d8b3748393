//! Run: one backtest execution as listed by `GET /runs`.

use super::ids::RunId;
use super::time::parse_instant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One backtest execution. Immutable once fetched; selected by `run_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    /// Kept verbatim; the backend stores it as text. NULL reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub initiated_time: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Run {
    pub fn new(run_id: impl Into<String>, initiated_time: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(run_id),
            initiated_time: initiated_time.into(),
        }
    }

    pub fn initiated_at(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.initiated_time)
    }

    /// Selector label: `run_id (initiated)`.
    pub fn label(&self) -> String {
        match self.initiated_at() {
            Some(at) => format!("{} ({})", self.run_id, at.format("%Y-%m-%d %H:%M")),
            None if self.initiated_time.is_empty() => self.run_id.to_string(),
            None => format!("{} ({})", self.run_id, self.initiated_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_row() {
        let run: Run = serde_json::from_str(
            r#"{"run_id": "5f0c", "initiated_time": "2024-03-01T10:30:00"}"#,
        )
        .unwrap();
        assert_eq!(run.run_id.as_str(), "5f0c");
        assert_eq!(run.label(), "5f0c (2024-03-01 10:30)");
    }

    #[test]
    fn null_initiated_time_does_not_fail_the_list() {
        let runs: Vec<Run> = serde_json::from_str(
            r#"[{"run_id": "a", "initiated_time": null}, {"run_id": "b"}, {"run_id": "c", "initiated_time": "2024-03-01"}]"#,
        )
        .unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].initiated_time, "");
        assert_eq!(runs[0].label(), "a");
        assert_eq!(runs[1].label(), "b");
    }

    #[test]
    fn label_keeps_unparseable_time() {
        let run = Run::new("r", "yesterday");
        assert_eq!(run.label(), "r (yesterday)");
        assert_eq!(Run::new("r", "").label(), "r");
    }
}
