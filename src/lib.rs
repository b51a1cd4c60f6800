// QueryExport - Mirror saved queries and datasets to .sql files on host lifecycle events

pub mod config;
pub mod events;
pub mod exporter;
pub mod host;
pub mod listener;
pub mod models;
pub mod naming;
pub mod outcome;

// Re-export main types for convenience
pub use config::{DatasetDelete, ExportConfig, FileNaming};
pub use events::{LifecycleEvent, read_events, replay};
pub use exporter::Exporter;
pub use host::{DATASET_MODEL, EventBus, Handler, LifecycleHost, Phase, SAVED_QUERY_MODEL, Target};
pub use listener::ExportListener;
pub use models::{Dataset, SavedQuery};
pub use outcome::{Action, ExportOutcome, ExportStats, LogSink, OutcomeSink, StatsSink};
