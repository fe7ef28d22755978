//! # Remote Request Executor
//!
//! Executes exactly one batch against the remote computation client and turns
//! whatever happens into a `BatchOutcome`. Transient failures are retried here
//! with exponential backoff; structural and fatal failures are reported on the
//! first occurrence. The executor never returns an error: a batch that cannot
//! be computed becomes a `BatchFailure` carrying its plot id range.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};

use crate::client::{ComputationDefinition, RemoteComputationClient, RemoteError};
use crate::config::PlotStatsConfig;
use crate::logging::log_batch_operation;
use crate::models::{
    Batch, BatchFailure, BatchOutcome, BatchSuccess, FailureKind, PlotId, ResultRow,
};
use crate::orchestration::error_classifier::{
    BackoffPolicy, FailureClassifier, StandardFailureClassifier,
};

/// Runs single batches with per-call timeout and transient retry
#[derive(Clone)]
pub struct RemoteRequestExecutor {
    client: Arc<dyn RemoteComputationClient>,
    classifier: Arc<dyn FailureClassifier>,
    backoff: BackoffPolicy,
    max_retries: u32,
    request_timeout: Duration,
}

impl std::fmt::Debug for RemoteRequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRequestExecutor")
            .field("client", &self.client.client_name())
            .field("classifier", &self.classifier.classifier_name())
            .field("backoff", &self.backoff)
            .field("max_retries", &self.max_retries)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl RemoteRequestExecutor {
    /// Create an executor using the retry and execution sections of `config`
    pub fn new(client: Arc<dyn RemoteComputationClient>, config: &PlotStatsConfig) -> Self {
        Self {
            client,
            classifier: Arc::new(StandardFailureClassifier::new()),
            backoff: BackoffPolicy::from(&config.retry),
            max_retries: config.retry.max_retries,
            request_timeout: config.execution.request_timeout(),
        }
    }

    /// Replace the failure classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Submit `batch` until it succeeds, fails non-transiently, or retries run out
    ///
    /// Makes at most `max_retries + 1` calls to the client.
    #[instrument(skip(self, batch, definition), fields(batch_index = batch.index(), record_count = batch.len()))]
    pub async fn execute(&self, batch: &Batch, definition: &ComputationDefinition) -> BatchOutcome {
        let max_attempts = self.max_retries.saturating_add(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(attempt, max_attempts, "Submitting batch");

            let error = match self.submit_once(batch, definition).await {
                Ok(rows) => match validate_rows(batch, rows) {
                    Ok(rows) => return self.success(batch, rows, attempt),
                    Err(reason) => {
                        return self.failure(
                            batch,
                            FailureKind::Fatal,
                            format!("malformed response: {reason}"),
                            attempt,
                        );
                    }
                },
                Err(error) => error,
            };

            let classification = self.classifier.classify(&error);
            let retries_left = attempt < max_attempts;

            if classification.kind == FailureKind::Retryable && retries_left {
                let delay = self.backoff.delay_for(attempt, error.retry_after());
                warn!(
                    attempt,
                    max_attempts,
                    error_code = %classification.error_code,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient failure, retrying batch"
                );
                sleep(delay).await;
                continue;
            }

            return self.failure(batch, classification.kind, classification.message, attempt);
        }
    }

    async fn submit_once(
        &self,
        batch: &Batch,
        definition: &ComputationDefinition,
    ) -> Result<Vec<ResultRow>, RemoteError> {
        match timeout(
            self.request_timeout,
            self.client.submit(batch.records(), definition),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(RemoteError::Timeout {
                timeout: self.request_timeout,
            }),
        }
    }

    fn success(&self, batch: &Batch, rows: Vec<ResultRow>, attempts: u32) -> BatchOutcome {
        log_batch_operation(
            "execute",
            None,
            batch.index(),
            batch.len(),
            "success",
            (attempts > 1).then_some("succeeded after retry"),
        );
        BatchOutcome::Success(BatchSuccess {
            batch_index: batch.index(),
            plot_ids: batch.plot_id_range(),
            rows,
            attempts,
        })
    }

    fn failure(
        &self,
        batch: &Batch,
        kind: FailureKind,
        message: String,
        attempts: u32,
    ) -> BatchOutcome {
        let failure = BatchFailure {
            batch_index: batch.index(),
            plot_ids: batch.plot_id_range(),
            kind,
            message,
            attempts,
        };
        log_batch_operation(
            "execute",
            None,
            batch.index(),
            batch.len(),
            &kind.to_string(),
            Some(&failure.message),
        );
        BatchOutcome::Failure(failure)
    }
}

/// Accept only one row per submitted record, keyed by the batch's plot ids
fn validate_rows(batch: &Batch, mut rows: Vec<ResultRow>) -> Result<Vec<ResultRow>, String> {
    if rows.len() != batch.len() {
        return Err(format!(
            "expected {} rows, received {}",
            batch.len(),
            rows.len()
        ));
    }

    let expected: HashSet<PlotId> = batch.plot_ids().collect();
    let mut seen = HashSet::with_capacity(rows.len());
    for row in &rows {
        if !expected.contains(&row.plot_id) {
            return Err(format!("unexpected plot_id {}", row.plot_id));
        }
        if !seen.insert(row.plot_id) {
            return Err(format!("duplicate plot_id {}", row.plot_id));
        }
    }

    rows.sort_by_key(|row| row.plot_id);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geometry::tests::square;
    use crate::models::{RawRecord, Record};
    use crate::orchestration::identity::assign_plot_ids;
    use crate::orchestration::partitioner::partition;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    type Reply = Result<Option<Vec<ResultRow>>, RemoteError>;

    /// Replies from a queue; `Ok(None)` echoes one row per record
    struct QueueClient {
        replies: Mutex<VecDeque<Reply>>,
        calls: AtomicU32,
        stall: Option<Duration>,
    }

    impl QueueClient {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                stall: None,
            })
        }
    }

    #[async_trait]
    impl RemoteComputationClient for QueueClient {
        fn client_name(&self) -> &'static str {
            "queue"
        }

        async fn submit(
            &self,
            records: &[Record],
            _definition: &ComputationDefinition,
        ) -> Result<Vec<ResultRow>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                sleep(stall).await;
            }
            let reply = self.replies.lock().pop_front().unwrap_or(Ok(None));
            match reply? {
                Some(rows) => Ok(rows),
                None => Ok(records
                    .iter()
                    .map(|r| ResultRow::new(r.plot_id).with_value("area", 1.0))
                    .collect()),
            }
        }
    }

    fn batch(n: usize) -> Batch {
        let raw = (0..n)
            .map(|i| RawRecord::new(square(i as f64, 0.0, 0.01)))
            .collect();
        let records: Arc<[Record]> = assign_plot_ids(raw).into();
        partition(records, n).unwrap().remove(0)
    }

    fn executor(client: Arc<QueueClient>, max_retries: u32) -> RemoteRequestExecutor {
        let mut config = PlotStatsConfig::default();
        config.retry.max_retries = max_retries;
        RemoteRequestExecutor::new(client, &config).with_backoff(BackoffPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
            jitter_factor: 0.0,
        })
    }

    fn definition() -> ComputationDefinition {
        ComputationDefinition::new(vec!["area".to_string()], false, serde_json::Value::Null)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let client = QueueClient::new(vec![]);
        let outcome = executor(client.clone(), 3).execute(&batch(4), &definition()).await;

        match outcome {
            BatchOutcome::Success(success) => {
                assert_eq!(success.rows.len(), 4);
                assert_eq!(success.attempts, 1);
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let client = QueueClient::new(vec![
            Err(RemoteError::rate_limited("429")),
            Err(RemoteError::other("connection reset by peer")),
        ]);
        let outcome = executor(client.clone(), 3).execute(&batch(3), &definition()).await;

        assert!(outcome.is_success());
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_reports_retryable() {
        let client = QueueClient::new(
            (0..10)
                .map(|_| Err(RemoteError::Unavailable("busy".to_string())))
                .collect(),
        );
        let outcome = executor(client.clone(), 2).execute(&batch(3), &definition()).await;

        let failure = outcome.failure().expect("failure");
        assert_eq!(failure.kind, FailureKind::Retryable);
        assert_eq!(failure.attempts, 3);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_structural_failure_is_not_retried() {
        let client = QueueClient::new(vec![Err(RemoteError::other(
            "Image.select: Band 'forest_2020' not found",
        ))]);
        let outcome = executor(client.clone(), 3).execute(&batch(2), &definition()).await;

        let failure = outcome.failure().expect("failure");
        assert_eq!(failure.kind, FailureKind::Structural);
        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.plot_ids.first, 1);
        assert_eq!(failure.plot_ids.last, 2);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_fatal() {
        let client = QueueClient::new(vec![Ok(Some(vec![ResultRow::new(1)]))]);
        let outcome = executor(client.clone(), 3).execute(&batch(2), &definition()).await;

        let failure = outcome.failure().expect("failure");
        assert_eq!(failure.kind, FailureKind::Fatal);
        assert!(failure.message.starts_with("malformed response"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        let client = Arc::new(QueueClient {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            stall: Some(Duration::from_millis(200)),
        });
        let mut config = PlotStatsConfig::default();
        config.retry.max_retries = 1;
        let mut executor = RemoteRequestExecutor::new(client.clone(), &config).with_backoff(
            BackoffPolicy {
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                multiplier: 1.0,
                jitter_factor: 0.0,
            },
        );
        executor.request_timeout = Duration::from_millis(10);

        let failure = executor.execute(&batch(1), &definition()).await;
        let failure = failure.failure().expect("failure");
        assert_eq!(failure.kind, FailureKind::Retryable);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_validate_rows_rejects_foreign_and_duplicate_ids() {
        let batch = batch(2);
        let foreign = vec![ResultRow::new(1), ResultRow::new(9)];
        assert!(validate_rows(&batch, foreign).is_err());

        let duplicate = vec![ResultRow::new(1), ResultRow::new(1)];
        assert!(validate_rows(&batch, duplicate).is_err());

        let reversed = vec![ResultRow::new(2), ResultRow::new(1)];
        let rows = validate_rows(&batch, reversed).unwrap();
        assert_eq!(rows[0].plot_id, 1);
    }
}
