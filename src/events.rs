// Lifecycle event logs (JSON Lines)
//
// One event per line:
//   {"model":"SavedQuery","phase":"after_insert","record":{"id":1,"label":"a","sql":"SELECT 1"}}

use crate::host::{DATASET_MODEL, EventBus, Phase, SAVED_QUERY_MODEL, Target};
use crate::models::{Dataset, SavedQuery};
use crate::outcome::ExportOutcome;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// A host lifecycle event ready to dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub phase: Phase,
    pub target: Target,
}

impl LifecycleEvent {
    pub fn model(&self) -> &'static str {
        self.target.model_name()
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    model: String,
    phase: Phase,
    record: serde_json::Value,
}

impl TryFrom<RawEvent> for LifecycleEvent {
    type Error = eyre::Report;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let target = match raw.model.as_str() {
            SAVED_QUERY_MODEL => {
                let query: SavedQuery =
                    serde_json::from_value(raw.record).context("Invalid SavedQuery record")?;
                Target::SavedQuery(query)
            }
            DATASET_MODEL | "Dataset" => {
                let dataset: Dataset =
                    serde_json::from_value(raw.record).context("Invalid dataset record")?;
                Target::Dataset(dataset)
            }
            other => return Err(eyre!("Unknown model: {}", other)),
        };

        Ok(Self {
            phase: raw.phase,
            target,
        })
    }
}

/// Read all events from a JSONL file
pub fn read_events(path: &Path) -> Result<Vec<LifecycleEvent>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open event log {}", path.display()))?;
    let events = parse_events(BufReader::new(file), path)?;

    info!(file = ?path, count = events.len(), "Loaded lifecycle events");
    Ok(events)
}

/// Parse events line by line, skipping blank and malformed lines
pub fn parse_events<R: BufRead>(reader: R, source: &Path) -> Result<Vec<LifecycleEvent>> {
    let mut events = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line
            .with_context(|| format!("Failed to read {} line {}", source.display(), line_num + 1))?;

        if line.trim().is_empty() {
            continue;
        }

        let raw: RawEvent = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    file = ?source,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse event, skipping"
                );
                continue;
            }
        };

        match LifecycleEvent::try_from(raw) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(
                    file = ?source,
                    line = line_num + 1,
                    error = %format!("{:#}", e),
                    "Unusable event, skipping"
                );
            }
        }
    }

    Ok(events)
}

/// Dispatch events through the bus in order, collecting every outcome
pub fn replay(bus: &EventBus, events: &[LifecycleEvent]) -> Vec<ExportOutcome> {
    events
        .iter()
        .flat_map(|event| bus.dispatch(event.model(), event.phase, &event.target))
        .collect()
}
