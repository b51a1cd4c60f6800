// Binds the exporter to host lifecycle events

use crate::config::ExportConfig;
use crate::exporter::Exporter;
use crate::host::{DATASET_MODEL, Handler, LifecycleHost, Phase, SAVED_QUERY_MODEL, Target};
use crate::outcome::ExportOutcome;
use eyre::{Result, eyre};
use std::sync::Arc;
use tracing::{info, warn};

/// Export listener
///
/// Registration is deferred to [`ExportListener::initialize`], which the host
/// calls once its model classes are loaded.
#[derive(Debug, Clone)]
pub struct ExportListener {
    exporter: Exporter,
}

impl ExportListener {
    pub fn new(config: ExportConfig) -> Self {
        Self::with_exporter(Exporter::new(config))
    }

    pub fn with_exporter(exporter: Exporter) -> Self {
        Self { exporter }
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Register the export handlers with the host
    ///
    /// | model      | phase                       | handler        |
    /// |------------|-----------------------------|----------------|
    /// | SavedQuery | after_insert, after_update  | export query   |
    /// | SavedQuery | after_delete                | delete query   |
    /// | SqlaTable  | after_insert, after_update  | export dataset |
    /// | SqlaTable  | after_delete                | delete dataset |
    pub fn initialize<H: LifecycleHost + ?Sized>(&self, host: &mut H) -> Result<()> {
        for model in [SAVED_QUERY_MODEL, DATASET_MODEL] {
            if !host.has_model(model) {
                return Err(eyre!(
                    "Model {} is not registered with the host; initialize after models are loaded",
                    model
                ));
            }
        }

        let query_saved = self.query_saved_handler();
        let query_deleted = self.query_deleted_handler();
        let dataset_saved = self.dataset_saved_handler();
        let dataset_deleted = self.dataset_deleted_handler();

        host.listen(SAVED_QUERY_MODEL, Phase::AfterInsert, query_saved.clone())?;
        host.listen(SAVED_QUERY_MODEL, Phase::AfterUpdate, query_saved)?;
        host.listen(SAVED_QUERY_MODEL, Phase::AfterDelete, query_deleted)?;
        host.listen(DATASET_MODEL, Phase::AfterInsert, dataset_saved.clone())?;
        host.listen(DATASET_MODEL, Phase::AfterUpdate, dataset_saved)?;
        host.listen(DATASET_MODEL, Phase::AfterDelete, dataset_deleted)?;

        info!(
            query_dir = ?self.exporter.config().query_dir,
            dataset_dir = ?self.exporter.config().dataset_dir,
            "Registered export listeners"
        );
        Ok(())
    }

    fn query_saved_handler(&self) -> Handler {
        let exporter = self.exporter.clone();
        Arc::new(move |target: &Target| match target {
            Target::SavedQuery(query) => exporter.export_query(query),
            other => unexpected(SAVED_QUERY_MODEL, other),
        })
    }

    fn query_deleted_handler(&self) -> Handler {
        let exporter = self.exporter.clone();
        Arc::new(move |target: &Target| match target {
            Target::SavedQuery(query) => exporter.delete_query(query),
            other => unexpected(SAVED_QUERY_MODEL, other),
        })
    }

    fn dataset_saved_handler(&self) -> Handler {
        let exporter = self.exporter.clone();
        Arc::new(move |target: &Target| match target {
            Target::Dataset(dataset) => exporter.export_dataset(dataset),
            other => unexpected(DATASET_MODEL, other),
        })
    }

    fn dataset_deleted_handler(&self) -> Handler {
        let exporter = self.exporter.clone();
        Arc::new(move |target: &Target| match target {
            Target::Dataset(dataset) => exporter.delete_dataset(dataset),
            other => unexpected(DATASET_MODEL, other),
        })
    }
}

fn unexpected(expected: &str, target: &Target) -> ExportOutcome {
    warn!(expected, got = target.model_name(), "Handler received a record of the wrong model");
    ExportOutcome::Skipped {
        reason: format!("expected {} record, got {}", expected, target.model_name()),
    }
}
