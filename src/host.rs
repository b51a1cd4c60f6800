// Host lifecycle capability: model registry plus event subscription

use crate::models::{Dataset, SavedQuery};
use crate::outcome::ExportOutcome;
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Host model name for saved queries
pub const SAVED_QUERY_MODEL: &str = "SavedQuery";
/// Host model name for datasets
pub const DATASET_MODEL: &str = "SqlaTable";

/// Post-commit lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AfterInsert,
    AfterUpdate,
    AfterDelete,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::AfterInsert, Phase::AfterUpdate, Phase::AfterDelete];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::AfterInsert => "after_insert",
            Phase::AfterUpdate => "after_update",
            Phase::AfterDelete => "after_delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| eyre!("Unknown lifecycle phase: {}", s))
    }
}

/// Record instance handed to a lifecycle callback
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    SavedQuery(SavedQuery),
    Dataset(Dataset),
}

impl Target {
    /// Host model this record belongs to
    pub fn model_name(&self) -> &'static str {
        match self {
            Target::SavedQuery(_) => SAVED_QUERY_MODEL,
            Target::Dataset(_) => DATASET_MODEL,
        }
    }
}

/// Lifecycle callback
pub type Handler = Arc<dyn Fn(&Target) -> ExportOutcome + Send + Sync>;

/// What the host exposes to listeners
pub trait LifecycleHost {
    /// Whether a model class is registered under this name
    fn has_model(&self, model: &str) -> bool;

    /// Subscribe a callback to a model's lifecycle phase
    fn listen(&mut self, model: &str, phase: Phase, handler: Handler) -> Result<()>;
}

/// In-process host: a model registry and a synchronous handler table
#[derive(Default)]
pub struct EventBus {
    models: HashSet<String>,
    handlers: HashMap<(String, Phase), Vec<Handler>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings: usize = self.handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("models", &self.models)
            .field("bindings", &bindings)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus with both exportable models already registered
    pub fn with_default_models() -> Self {
        let mut bus = Self::new();
        bus.register_model(SAVED_QUERY_MODEL);
        bus.register_model(DATASET_MODEL);
        bus
    }

    pub fn register_model(&mut self, model: impl Into<String>) {
        self.models.insert(model.into());
    }

    /// Number of callbacks bound to (model, phase)
    pub fn handler_count(&self, model: &str, phase: Phase) -> usize {
        self.handlers
            .get(&(model.to_string(), phase))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Run every callback bound to (model, phase), in registration order
    pub fn dispatch(&self, model: &str, phase: Phase, target: &Target) -> Vec<ExportOutcome> {
        let Some(handlers) = self.handlers.get(&(model.to_string(), phase)) else {
            debug!(model, %phase, "dispatch: no handlers bound");
            return Vec::new();
        };

        debug!(model, %phase, count = handlers.len(), "dispatch: running handlers");
        handlers.iter().map(|handler| handler(target)).collect()
    }
}

impl LifecycleHost for EventBus {
    fn has_model(&self, model: &str) -> bool {
        self.models.contains(model)
    }

    fn listen(&mut self, model: &str, phase: Phase, handler: Handler) -> Result<()> {
        if !self.has_model(model) {
            return Err(eyre!("Cannot listen on unknown model: {}", model));
        }
        self.handlers.entry((model.to_string(), phase)).or_default().push(handler);
        Ok(())
    }
}
