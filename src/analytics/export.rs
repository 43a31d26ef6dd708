//! Periodic click export for the external analytics collaborator.
//!
//! Cursor-based: each cycle picks up events with ids beyond the last
//! exported one and writes them as a CSV or JSONL batch file. The cursor is
//! persisted next to the output files so a restart does not re-export.
//! Export failures are logged and retried next cycle, never surfaced.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{ExportConfig, ExportFormat};
use crate::errors::{Result, SnaplinkError};
use crate::storage::ClickStore;

const CURSOR_FILE: &str = ".export-cursor";

/// Flattened export row
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: i64,
    code: &'a str,
    timestamp: String,
    referrer: Option<&'a str>,
    user_agent_class: &'a str,
}

pub struct ClickExporter {
    clicks: Arc<dyn ClickStore>,
    config: ExportConfig,
    output_dir: PathBuf,
}

impl ClickExporter {
    pub fn new(clicks: Arc<dyn ClickStore>, config: ExportConfig) -> Self {
        let output_dir = PathBuf::from(&config.output_dir);
        Self {
            clicks,
            config,
            output_dir,
        }
    }

    /// Run the export loop until the task is cancelled.
    pub async fn run(self) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(
            "ClickExporter: every {}s, format {}, output {}",
            self.config.interval_secs,
            self.config.format.as_ref(),
            self.output_dir.display()
        );

        loop {
            ticker.tick().await;

            match self.export_once().await {
                Ok(0) => debug!("ClickExporter: nothing to export"),
                Ok(count) => info!("ClickExporter: exported {} events", count),
                Err(e) => error!("ClickExporter: export cycle failed: {}", e),
            }

            if self.config.retention_days > 0 {
                let cutoff = Utc::now() - ChronoDuration::days(self.config.retention_days as i64);
                if let Err(e) = self.clicks.prune_before(cutoff).await {
                    warn!("ClickExporter: retention prune failed: {}", e);
                }
            }
        }
    }

    /// One export cycle; returns the number of exported events.
    pub async fn export_once(&self) -> Result<usize> {
        std::fs::create_dir_all(&self.output_dir)?;

        let cursor = read_cursor(&self.output_dir);
        let batch = self
            .clicks
            .events_after(cursor, self.config.batch_limit)
            .await?;

        if batch.is_empty() {
            return Ok(0);
        }

        let first_id = batch.first().map(|e| e.id).unwrap_or(0);
        let last_id = batch.last().map(|e| e.id).unwrap_or(0);
        let filename = format!(
            "clicks-{:012}-{:012}.{}",
            first_id,
            last_id,
            self.config.format.extension()
        );
        let path = self.output_dir.join(filename);

        let rows: Vec<ExportRow<'_>> = batch
            .iter()
            .map(|stored| ExportRow {
                id: stored.id,
                code: &stored.event.code,
                timestamp: stored.event.timestamp.to_rfc3339(),
                referrer: stored.event.referrer.as_deref(),
                user_agent_class: stored.event.user_agent_class.as_ref(),
            })
            .collect();

        match self.config.format {
            ExportFormat::Csv => write_csv(&path, &rows)?,
            ExportFormat::Jsonl => write_jsonl(&path, &rows)?,
        }

        write_cursor(&self.output_dir, last_id)?;
        debug!("ClickExporter: wrote {}", path.display());
        Ok(rows.len())
    }
}

fn read_cursor(dir: &Path) -> i64 {
    std::fs::read_to_string(dir.join(CURSOR_FILE))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn write_cursor(dir: &Path, cursor: i64) -> Result<()> {
    std::fs::write(dir.join(CURSOR_FILE), cursor.to_string())?;
    Ok(())
}

fn write_csv(path: &Path, rows: &[ExportRow<'_>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| SnaplinkError::serialization(format!("csv open failed: {}", e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| SnaplinkError::serialization(format!("csv write failed: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| SnaplinkError::serialization(format!("csv flush failed: {}", e)))?;
    Ok(())
}

fn write_jsonl(path: &Path, rows: &[ExportRow<'_>]) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    for row in rows {
        let line = serde_json::to_string(row)?;
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{ClickEvent, ClickSink, UserAgentClass};
    use crate::storage::MemoryStore;

    fn event(code: &str) -> ClickEvent {
        ClickEvent {
            code: code.to_string(),
            timestamp: Utc::now(),
            referrer: Some("https://news.example.org".to_string()),
            user_agent_class: UserAgentClass::Browser,
        }
    }

    fn config(dir: &Path, format: ExportFormat) -> ExportConfig {
        ExportConfig {
            enabled: true,
            format,
            interval_secs: 3600,
            output_dir: dir.display().to_string(),
            batch_limit: 1000,
            retention_days: 0,
        }
    }

    #[tokio::test]
    async fn test_export_writes_csv_and_advances_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store
            .flush_events(vec![event("a"), event("b")])
            .await
            .unwrap();

        let exporter = ClickExporter::new(store.clone(), config(dir.path(), ExportFormat::Csv));
        assert_eq!(exporter.export_once().await.unwrap(), 2);

        let exported: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "csv"))
            .collect();
        assert_eq!(exported.len(), 1);

        let content = std::fs::read_to_string(exported[0].path()).unwrap();
        assert!(content.contains("a"));
        assert!(content.contains("browser"));

        // 游标已推进，重复导出为空
        assert_eq!(exporter.export_once().await.unwrap(), 0);

        // 新事件从游标之后继续
        store.flush_events(vec![event("c")]).await.unwrap();
        assert_eq!(exporter.export_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_export_jsonl_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.flush_events(vec![event("x")]).await.unwrap();

        let exporter = ClickExporter::new(store, config(dir.path(), ExportFormat::Jsonl));
        assert_eq!(exporter.export_once().await.unwrap(), 1);

        let exported: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        assert_eq!(exported.len(), 1);

        let content = std::fs::read_to_string(exported[0].path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["code"], "x");
        assert_eq!(parsed["user_agent_class"], "browser");
    }
}
