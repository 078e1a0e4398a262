//! 結果の表示と保存

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use splitter_core::domain::OutcomeRecord;
use splitter_core::{BatchReport, BatchSummary};

#[derive(Debug, Serialize)]
pub struct ResultsFile {
    pub batch_id: String,
    pub summary: BatchSummary,
    pub results: Vec<OutcomeRecord>,
}

impl ResultsFile {
    pub fn from_report(report: &BatchReport<String>) -> Self {
        Self {
            batch_id: report.batch_id.to_string(),
            summary: report.summary,
            results: report.records(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("write results {}", path.display()))
    }
}

/// 1 タスク 1 行。失敗は `kind` も付ける。
pub fn render(report: &BatchReport<String>) -> Vec<String> {
    let mut lines: Vec<String> = report
        .outcomes
        .iter()
        .map(|o| match o.result() {
            Ok(text) => format!("[{}] ok: {}", o.label(), text),
            Err(f) => format!("[{}] error ({:?}): {}", o.label(), f.kind, f.message),
        })
        .collect();
    let s = &report.summary;
    lines.push(format!(
        "{} tasks: {} succeeded, {} failed, {} cancelled",
        s.total, s.succeeded, s.failed, s.cancelled
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitter_core::domain::BatchId;
    use splitter_core::{TaskFailure, TaskOutcome};
    use ulid::Ulid;

    fn sample() -> BatchReport<String> {
        let outcomes = vec![
            TaskOutcome::success(0, "done".to_string()),
            TaskOutcome::failed(1, TaskFailure::error("boom")),
        ];
        BatchReport {
            batch_id: BatchId::from_ulid(Ulid::nil()),
            summary: BatchSummary::from_outcomes(&outcomes),
            outcomes,
        }
    }

    #[test]
    fn renders_one_line_per_task_plus_summary() {
        assert_eq!(
            render(&sample()),
            vec![
                "[T1] ok: done".to_string(),
                "[T2] error (Error): boom".to_string(),
                "2 tasks: 1 succeeded, 1 failed, 0 cancelled".to_string(),
            ]
        );
    }

    #[test]
    fn writes_records_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results.json");
        ResultsFile::from_report(&sample()).write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let batch_id: BatchId = value["batch_id"].as_str().unwrap().parse().unwrap();
        assert_eq!(batch_id, BatchId::from_ulid(Ulid::nil()));
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["results"][0]["task_id"], "T1");
        assert_eq!(value["results"][0]["status"], "success");
        assert_eq!(value["results"][1]["status"], "error");
        assert_eq!(value["results"][1]["error"], "boom");
    }
}
