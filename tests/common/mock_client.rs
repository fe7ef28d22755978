//! Mock remote computation client and definition builder
//!
//! The client answers deterministically from each record's plot id, so rows
//! produced by different batch layouts or retry histories are comparable.
//! Failures are scripted per plot id: any batch containing a scripted plot id
//! gets that plot's behaviour.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use plotstats_core::client::{
    ComputationDefinition, DefinitionBuilder, DefinitionOptions, RemoteComputationClient,
    RemoteError,
};
use plotstats_core::models::{PlotId, Record, ResultRow};

/// Scripted reaction for batches containing a given plot id
#[derive(Debug, Clone)]
pub enum Script {
    /// Always fail with this error
    Fail(RemoteError),
    /// Fail the first `times` calls, then answer normally
    FailTimes { times: usize, error: RemoteError },
    /// Fail unless the definition was built strictly
    FailUnlessStrict(RemoteError),
    /// Answer with one row too few
    Malformed,
}

/// One observed `submit` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCall {
    pub first_plot_id: PlotId,
    pub record_count: usize,
    pub strict: bool,
}

#[derive(Debug, Default)]
struct MockClientState {
    calls: Vec<SubmitCall>,
    script_hits: HashMap<PlotId, usize>,
}

/// Mock client for the remote statistics service
#[derive(Debug, Default)]
pub struct MockRemoteClient {
    scripts: HashMap<PlotId, Script>,
    /// Layers this service cannot resolve; a definition containing one fails structurally
    unresolvable_layers: BTreeSet<String>,
    delay: Option<Duration>,
    state: Mutex<MockClientState>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, plot_id: PlotId, script: Script) -> Self {
        self.scripts.insert(plot_id, script);
        self
    }

    pub fn with_unresolvable_layer(mut self, layer: impl Into<String>) -> Self {
        self.unresolvable_layers.insert(layer.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<SubmitCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn strict_call_count(&self) -> usize {
        self.state.lock().calls.iter().filter(|c| c.strict).count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Statistic values the client reports for a record under a definition
    pub fn expected_row(record: &Record, definition_layers: &[String]) -> ResultRow {
        let mut row = ResultRow::new(record.plot_id)
            .with_value("area", record.geometry.approximate_area_hectares());
        for layer in definition_layers {
            row = row.with_value(layer.clone(), (record.plot_id % 7) as f64 * 0.25);
        }
        if let Some(code) = record.properties.get("admin_code") {
            row = row.with_value("admin_code", code.clone());
        }
        row
    }

    fn scripted_reaction(
        &self,
        records: &[Record],
        definition: &ComputationDefinition,
    ) -> Option<Reaction> {
        let mut state = self.state.lock();
        for record in records {
            let Some(script) = self.scripts.get(&record.plot_id) else {
                continue;
            };
            let hits = state.script_hits.entry(record.plot_id).or_insert(0);
            *hits += 1;
            return match script {
                Script::Fail(error) => Some(Reaction::Error(error.clone())),
                Script::FailTimes { times, error } if *hits <= *times => {
                    Some(Reaction::Error(error.clone()))
                }
                Script::FailTimes { .. } => None,
                Script::FailUnlessStrict(error) if !definition.strict => {
                    Some(Reaction::Error(error.clone()))
                }
                Script::FailUnlessStrict(_) => None,
                Script::Malformed => Some(Reaction::DropRow),
            };
        }
        None
    }
}

enum Reaction {
    Error(RemoteError),
    DropRow,
}

#[async_trait]
impl RemoteComputationClient for MockRemoteClient {
    fn client_name(&self) -> &'static str {
        "MockRemoteClient"
    }

    async fn submit(
        &self,
        records: &[Record],
        definition: &ComputationDefinition,
    ) -> Result<Vec<ResultRow>, RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        self.state.lock().calls.push(SubmitCall {
            first_plot_id: records.first().map(|r| r.plot_id).unwrap_or_default(),
            record_count: records.len(),
            strict: definition.strict,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(layer) = definition
            .layers
            .iter()
            .find(|layer| self.unresolvable_layers.contains(*layer))
        {
            return Err(RemoteError::other(format!(
                "Image.select: Band '{layer}' not found"
            )));
        }

        let mut rows: Vec<ResultRow> = records
            .iter()
            .map(|record| Self::expected_row(record, &definition.layers))
            .collect();

        match self.scripted_reaction(records, definition) {
            Some(Reaction::Error(error)) => Err(error),
            Some(Reaction::DropRow) => {
                rows.pop();
                Ok(rows)
            }
            None => Ok(rows),
        }
    }
}

/// Definition builder whose strict mode drops layers the service cannot resolve
#[derive(Debug, Default)]
pub struct MockDefinitionBuilder {
    unavailable_layers: BTreeSet<String>,
    fail_strict: bool,
    builds: AtomicUsize,
    strict_builds: AtomicUsize,
}

impl MockDefinitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unavailable_layer(mut self, layer: impl Into<String>) -> Self {
        self.unavailable_layers.insert(layer.into());
        self
    }

    /// Make every strict build fail
    pub fn failing_strict(mut self) -> Self {
        self.fail_strict = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn strict_build_count(&self) -> usize {
        self.strict_builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DefinitionBuilder for MockDefinitionBuilder {
    async fn build(
        &self,
        options: &DefinitionOptions,
        strict: bool,
    ) -> plotstats_core::Result<ComputationDefinition> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if strict {
            self.strict_builds.fetch_add(1, Ordering::SeqCst);
            if self.fail_strict {
                return Err(plotstats_core::PlotStatsError::DefinitionError(
                    "strict validation unavailable".to_string(),
                ));
            }
        }

        let layers: Vec<String> = options
            .layers
            .iter()
            .filter(|layer| !strict || !self.unavailable_layers.contains(*layer))
            .cloned()
            .collect();

        Ok(ComputationDefinition::new(
            layers,
            strict,
            json!({ "national_codes": options.national_codes }),
        ))
    }
}
