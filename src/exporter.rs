// Mirrors saved queries and datasets into .sql files

use crate::config::{DatasetDelete, ExportConfig};
use crate::models::{Dataset, SavedQuery};
use crate::naming;
use crate::outcome::{Action, ExportOutcome, LogSink, OutcomeSink};
use eyre::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Best-effort file mirror for host records
///
/// Every operation returns an [`ExportOutcome`] and reports it to the sink.
/// Nothing here returns an error to the caller.
#[derive(Clone)]
pub struct Exporter {
    config: ExportConfig,
    sink: Arc<dyn OutcomeSink>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Exporter {
    /// Exporter reporting to [`LogSink`]
    pub fn new(config: ExportConfig) -> Self {
        Self::with_sink(config, Arc::new(LogSink))
    }

    pub fn with_sink(config: ExportConfig, sink: Arc<dyn OutcomeSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Path of the file mirroring a saved query
    pub fn query_path(&self, query: &SavedQuery) -> PathBuf {
        self.config
            .query_dir
            .join(naming::query_file_name(query, self.config.file_names))
    }

    /// Path of the file mirroring a dataset
    pub fn dataset_path(&self, dataset: &Dataset) -> PathBuf {
        self.config
            .dataset_dir
            .join(naming::dataset_file_name(dataset, self.config.file_names))
    }

    // ========================================================================
    // Saved queries
    // ========================================================================

    /// Write the query's SQL to `<query_dir>/<id>_<label>.sql`
    pub fn export_query(&self, query: &SavedQuery) -> ExportOutcome {
        debug!(id = query.id, label = %query.label, "export_query: called");
        let path = self.query_path(query);
        let outcome = Self::write_sql(&self.config.query_dir, path, Some(&query.sql));
        self.report(outcome)
    }

    /// Remove the query's file; a missing file is fine
    pub fn delete_query(&self, query: &SavedQuery) -> ExportOutcome {
        debug!(id = query.id, label = %query.label, "delete_query: called");
        let outcome = Self::remove_sql(self.query_path(query), true);
        self.report(outcome)
    }

    // ========================================================================
    // Datasets
    // ========================================================================

    /// Write the dataset's SQL to `<dataset_dir>/<table_name>.sql`
    ///
    /// Datasets in the example schema are skipped without touching the disk.
    /// A dataset without SQL (a physical table) fails at the write step.
    pub fn export_dataset(&self, dataset: &Dataset) -> ExportOutcome {
        debug!(table_name = %dataset.table_name, "export_dataset: called");

        if dataset.in_schema(&self.config.example_schema_perm) {
            return self.report(ExportOutcome::Skipped {
                reason: format!("{} is in the example schema", dataset.table_name),
            });
        }

        let path = self.dataset_path(dataset);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.dataset_dir.clone());
        let outcome = Self::write_sql(&dir, path, dataset.sql.as_deref());
        self.report(outcome)
    }

    /// Remove the dataset's file
    ///
    /// Whether a missing file counts as a failure depends on `dataset_delete`.
    pub fn delete_dataset(&self, dataset: &Dataset) -> ExportOutcome {
        let path = self.dataset_path(dataset);
        debug!(table_name = %dataset.table_name, path = ?path, "delete_dataset: called");

        let tolerate_missing = self.config.dataset_delete == DatasetDelete::Tolerant;
        let outcome = Self::remove_sql(path, tolerate_missing);
        self.report(outcome)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn report(&self, outcome: ExportOutcome) -> ExportOutcome {
        self.sink.record(&outcome);
        outcome
    }

    fn write_sql(dir: &Path, path: PathBuf, sql: Option<&str>) -> ExportOutcome {
        if let Err(e) = Self::ensure_dir(dir) {
            return ExportOutcome::Failed {
                action: Action::CreateDir,
                path: dir.to_path_buf(),
                error: format!("{:#}", e),
            };
        }

        let Some(sql) = sql else {
            return ExportOutcome::Failed {
                action: Action::Write,
                path,
                error: "record has no SQL text".to_string(),
            };
        };

        // Truncates any previous content
        match fs::write(&path, sql.as_bytes()).context("Failed to write SQL file") {
            Ok(()) => ExportOutcome::Written {
                path,
                bytes: sql.len(),
            },
            Err(e) => ExportOutcome::Failed {
                action: Action::Write,
                path,
                error: format!("{:#}", e),
            },
        }
    }

    fn ensure_dir(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).context("Failed to create export directory")
    }

    fn remove_sql(path: PathBuf, tolerate_missing: bool) -> ExportOutcome {
        match fs::remove_file(&path) {
            Ok(()) => ExportOutcome::Removed { path },
            Err(e) if e.kind() == ErrorKind::NotFound && tolerate_missing => {
                ExportOutcome::AlreadyAbsent { path }
            }
            Err(e) => ExportOutcome::Failed {
                action: Action::Remove,
                path,
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileNaming;
    use crate::outcome::StatsSink;
    use tempfile::TempDir;

    const EXAMPLES: &str = "[examples].[public]";

    fn exporter(temp: &TempDir) -> Exporter {
        Exporter::new(ExportConfig::rooted_at(temp.path()))
    }

    #[test]
    fn test_query_lifecycle() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);
        let path = temp.path().join("queries/42_daily_report.sql");

        let mut query = SavedQuery::new(42, "daily_report", "SELECT 1");
        let outcome = exporter.export_query(&query);
        assert_eq!(
            outcome,
            ExportOutcome::Written {
                path: path.clone(),
                bytes: 8
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "SELECT 1");

        query.sql = "SELECT 2".to_string();
        exporter.export_query(&query);
        assert_eq!(fs::read_to_string(&path).unwrap(), "SELECT 2");

        let outcome = exporter.delete_query(&query);
        assert_eq!(outcome, ExportOutcome::Removed { path: path.clone() });
        assert!(!path.exists());
    }

    #[test]
    fn test_export_query_replaces_longer_content() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let mut query = SavedQuery::new(1, "q", "SELECT * FROM a_rather_long_table_name");
        exporter.export_query(&query);
        query.sql = "SELECT 1".to_string();
        exporter.export_query(&query);

        let content = fs::read_to_string(exporter.query_path(&query)).unwrap();
        assert_eq!(content, "SELECT 1");
    }

    #[test]
    fn test_export_query_writes_sql_verbatim() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let sql = "-- héllo\r\nSELECT 'a'\n\n";
        let query = SavedQuery::new(3, "raw", sql);
        exporter.export_query(&query);

        let bytes = fs::read(exporter.query_path(&query)).unwrap();
        assert_eq!(bytes, sql.as_bytes());
    }

    #[test]
    fn test_export_query_twice_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let query = SavedQuery::new(5, "same", "SELECT 5");
        exporter.export_query(&query);
        exporter.export_query(&query);

        let entries: Vec<_> = fs::read_dir(temp.path().join("queries")).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(fs::read_to_string(exporter.query_path(&query)).unwrap(), "SELECT 5");
    }

    #[test]
    fn test_delete_query_missing_file() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let query = SavedQuery::new(9, "never_saved", "SELECT 9");
        let outcome = exporter.delete_query(&query);
        assert!(matches!(outcome, ExportOutcome::AlreadyAbsent { .. }));
    }

    #[test]
    fn test_export_query_dir_creation_failure() {
        let temp = TempDir::new().unwrap();
        // A regular file where the directory should go
        let blocker = temp.path().join("queries");
        fs::write(&blocker, "not a directory").unwrap();

        let sink = Arc::new(StatsSink::new());
        let exporter = Exporter::with_sink(ExportConfig::rooted_at(temp.path()), sink.clone());

        let outcome = exporter.export_query(&SavedQuery::new(1, "q", "SELECT 1"));
        match outcome {
            ExportOutcome::Failed { action, path, .. } => {
                assert_eq!(action, Action::CreateDir);
                assert_eq!(path, blocker);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(sink.stats().failed, 1);
    }

    #[test]
    fn test_export_query_write_failure() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);
        let query = SavedQuery::new(1, "q", "SELECT 1");

        // A directory occupying the target file name
        fs::create_dir_all(exporter.query_path(&query)).unwrap();

        let outcome = exporter.export_query(&query);
        assert!(matches!(outcome, ExportOutcome::Failed { action: Action::Write, .. }));
    }

    #[test]
    fn test_dataset_lifecycle() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);
        let path = temp.path().join("datasets/orders.sql");

        let dataset = Dataset::new("orders", "SELECT * FROM raw_orders", Some("[main].[public]"));
        let outcome = exporter.export_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::Written { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "SELECT * FROM raw_orders");

        let outcome = exporter.delete_dataset(&dataset);
        assert_eq!(outcome, ExportOutcome::Removed { path: path.clone() });
        assert!(!path.exists());
    }

    #[test]
    fn test_dataset_without_schema_perm_is_exported() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let dataset = Dataset::new("virtual", "SELECT 1", None);
        let outcome = exporter.export_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::Written { .. }));
    }

    #[test]
    fn test_example_dataset_is_skipped() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let dataset = Dataset::new("orders", "SELECT 1", Some(EXAMPLES));
        let outcome = exporter.export_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::Skipped { .. }));

        // No directory side effect either
        assert!(!temp.path().join("datasets").exists());
    }

    #[test]
    fn test_example_schema_match_is_exact() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let dataset = Dataset::new("orders", "SELECT 1", Some("[examples].[public] "));
        assert!(matches!(exporter.export_dataset(&dataset), ExportOutcome::Written { .. }));
    }

    #[test]
    fn test_delete_dataset_missing_tolerant() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let dataset = Dataset::new("gone", "SELECT 1", None);
        let outcome = exporter.delete_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::AlreadyAbsent { .. }));
    }

    #[test]
    fn test_delete_dataset_missing_strict() {
        let temp = TempDir::new().unwrap();
        let config = ExportConfig {
            dataset_delete: DatasetDelete::Strict,
            ..ExportConfig::rooted_at(temp.path())
        };
        let sink = Arc::new(StatsSink::new());
        let exporter = Exporter::with_sink(config, sink.clone());

        let dataset = Dataset::new("gone", "SELECT 1", None);
        let outcome = exporter.delete_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::Failed { action: Action::Remove, .. }));
        assert_eq!(sink.stats().failed, 1);
    }

    #[test]
    fn test_sanitized_label_stays_in_directory() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);

        let query = SavedQuery::new(7, "../escape", "SELECT 7");
        let outcome = exporter.export_query(&query);
        assert!(matches!(outcome, ExportOutcome::Written { .. }));
        assert!(temp.path().join("queries/7_.._escape.sql").exists());
        assert!(!temp.path().join("escape.sql").exists());
    }

    #[test]
    fn test_raw_label_with_separator_fails_to_write() {
        let temp = TempDir::new().unwrap();
        let config = ExportConfig {
            file_names: FileNaming::Raw,
            ..ExportConfig::rooted_at(temp.path())
        };
        let exporter = Exporter::new(config);

        // queries/7_../ does not exist, so the write cannot land anywhere
        let query = SavedQuery::new(7, "../escape", "SELECT 7");
        let outcome = exporter.export_query(&query);
        assert!(matches!(outcome, ExportOutcome::Failed { action: Action::Write, .. }));
    }

    #[test]
    fn test_delete_query_error_is_reported_not_raised() {
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(StatsSink::new());
        let exporter = Exporter::with_sink(ExportConfig::rooted_at(temp.path()), sink.clone());
        let query = SavedQuery::new(1, "q", "SELECT 1");

        // remove_file cannot delete a directory
        let path = exporter.query_path(&query);
        fs::create_dir_all(&path).unwrap();

        let outcome = exporter.delete_query(&query);
        assert!(matches!(outcome, ExportOutcome::Failed { action: Action::Remove, .. }));
        assert!(path.is_dir());
        assert_eq!(sink.stats().failed, 1);
    }

    #[test]
    fn test_export_dataset_dir_creation_failure() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("datasets");
        fs::write(&blocker, "not a directory").unwrap();
        let exporter = exporter(&temp);

        let dataset = Dataset::new("orders", "SELECT 1", Some("[main].[public]"));
        match exporter.export_dataset(&dataset) {
            ExportOutcome::Failed { action, path, .. } => {
                assert_eq!(action, Action::CreateDir);
                assert_eq!(path, blocker);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_export_dataset_write_failure() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);
        let dataset = Dataset::new("orders", "SELECT 1", None);

        fs::create_dir_all(exporter.dataset_path(&dataset)).unwrap();

        let outcome = exporter.export_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::Failed { action: Action::Write, .. }));
    }

    #[test]
    fn test_export_physical_dataset_fails_after_dir_creation() {
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(StatsSink::new());
        let exporter = Exporter::with_sink(ExportConfig::rooted_at(temp.path()), sink.clone());

        let dataset = Dataset::physical("orders", Some("[main].[public]"));
        let outcome = exporter.export_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::Failed { action: Action::Write, .. }));
        assert!(temp.path().join("datasets").is_dir());
        assert!(!exporter.dataset_path(&dataset).exists());
        assert_eq!(sink.stats().failed, 1);
    }

    #[test]
    fn test_delete_physical_dataset_removes_file() {
        let temp = TempDir::new().unwrap();
        let exporter = exporter(&temp);
        let path = temp.path().join("datasets/orders.sql");
        fs::create_dir_all(temp.path().join("datasets")).unwrap();
        fs::write(&path, "SELECT 1").unwrap();

        let outcome = exporter.delete_dataset(&Dataset::physical("orders", None));
        assert_eq!(outcome, ExportOutcome::Removed { path: path.clone() });
        assert!(!path.exists());
    }

    #[test]
    fn test_raw_table_name_with_separator_nests_file() {
        let temp = TempDir::new().unwrap();
        let config = ExportConfig {
            file_names: FileNaming::Raw,
            ..ExportConfig::rooted_at(temp.path())
        };
        let exporter = Exporter::new(config);

        let dataset = Dataset::new("analytics/orders", "SELECT 1", None);
        let outcome = exporter.export_dataset(&dataset);
        assert!(matches!(outcome, ExportOutcome::Written { .. }));
        assert_eq!(
            fs::read_to_string(temp.path().join("datasets/analytics/orders.sql")).unwrap(),
            "SELECT 1"
        );
    }

    #[test]
    fn test_stats_sink_sees_every_outcome() {
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(StatsSink::new());
        let exporter = Exporter::with_sink(ExportConfig::rooted_at(temp.path()), sink.clone());

        let query = SavedQuery::new(1, "a", "SELECT 1");
        exporter.export_query(&query);
        exporter.delete_query(&query);
        exporter.delete_query(&query);
        exporter.export_dataset(&Dataset::new("sample", "SELECT 1", Some(EXAMPLES)));

        let stats = sink.stats();
        assert_eq!(stats.written, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.already_absent, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 0);
    }
}
