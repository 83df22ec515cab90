//! Waiting for a broadcast transaction to land.
//!
//! The waiter only reads. It never resubmits, and cancelling it leaves the
//! broadcast transaction alone: it may still land after the caller stops
//! watching.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ClientError, RpcError};
use crate::network::{Commitment, Network, SignatureStatus};
use crate::rpc::is_account_in_use;
use crate::submit::Submission;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub commitment: Commitment,
    pub poll_interval: Duration,
    /// Upper bound on the wait even while the blockhash is still valid.
    pub timeout: Duration,
    /// Consecutive failed reads tolerated before giving up.
    pub max_read_retries: u32,
    pub log_fetch_attempts: u32,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(90),
            max_read_retries: 5,
            log_fetch_attempts: 3,
        }
    }
}

/// A transaction that executed without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    pub signature: String,
    pub slot: u64,
    pub logs: Vec<String>,
}

pub struct ConfirmationWaiter {
    network: Arc<dyn Network>,
    options: ConfirmOptions,
}

/// Counts consecutive read failures across status and block-height polls.
struct ReadBudget {
    failures: u32,
    max: u32,
}

impl ReadBudget {
    fn ok(&mut self) {
        self.failures = 0;
    }

    fn fail(&mut self, operation: &'static str, err: RpcError) -> Result<(), ClientError> {
        self.failures += 1;
        if self.failures > self.max {
            return Err(ClientError::rpc(operation, err));
        }
        warn!(operation, attempt = self.failures, error = %err, "read failed, retrying");
        Ok(())
    }
}

impl ConfirmationWaiter {
    pub fn new(network: Arc<dyn Network>, options: ConfirmOptions) -> Self {
        Self { network, options }
    }

    pub fn options(&self) -> &ConfirmOptions {
        &self.options
    }

    pub async fn await_confirmation(&self, submission: &Submission) -> Result<Confirmed, ClientError> {
        self.await_confirmation_with_cancel(submission, &CancellationToken::new())
            .await
    }

    /// Poll until the transaction reaches the target commitment, its
    /// blockhash expires, the timeout passes or `cancel` fires.
    pub async fn await_confirmation_with_cancel(
        &self,
        submission: &Submission,
        cancel: &CancellationToken,
    ) -> Result<Confirmed, ClientError> {
        let operation = submission.operation;
        let signature = submission.signature.as_str();
        let deadline = Instant::now() + self.options.timeout;
        let mut reads = ReadBudget { failures: 0, max: self.options.max_read_retries };

        loop {
            let status = watch(cancel, self.network.get_signature_status(signature))
                .await
                .ok_or_else(|| cancelled(submission))?;
            match status {
                Ok(Some(status)) if status.reached(self.options.commitment) => {
                    return self.finish(submission, status, cancel).await;
                }
                Ok(status) => {
                    reads.ok();
                    debug!(operation, signature, seen = status.is_some(), "not yet at target commitment");
                }
                Err(e) => reads.fail(operation, e)?,
            }

            let height = watch(cancel, self.network.get_block_height())
                .await
                .ok_or_else(|| cancelled(submission))?;
            match height {
                Ok(height) if height > submission.last_valid_block_height => {
                    warn!(operation, signature, height, "blockhash expired before confirmation");
                    return Err(timed_out(submission));
                }
                Ok(_) => {}
                Err(e) => reads.fail(operation, e)?,
            }

            if Instant::now() >= deadline {
                warn!(operation, signature, "confirmation timeout elapsed");
                return Err(timed_out(submission));
            }

            watch(cancel, sleep(self.options.poll_interval))
                .await
                .ok_or_else(|| cancelled(submission))?;
        }
    }

    async fn finish(
        &self,
        submission: &Submission,
        status: SignatureStatus,
        cancel: &CancellationToken,
    ) -> Result<Confirmed, ClientError> {
        let operation = submission.operation;
        let logs = self.fetch_logs(submission, cancel).await;

        match status.err {
            None => {
                info!(operation, signature = %submission.signature, slot = status.slot, "transaction confirmed");
                Ok(Confirmed {
                    signature: submission.signature.clone(),
                    slot: status.slot,
                    logs,
                })
            }
            Some(err) if is_account_in_use(&err) => Err(ClientError::AccountContention {
                operation,
                signature: Some(submission.signature.clone()),
                logs,
            }),
            Some(err) => {
                warn!(operation, signature = %submission.signature, error = %err, "transaction failed");
                Err(ClientError::ExecutionFailed {
                    operation,
                    signature: submission.signature.clone(),
                    error_detail: render_error(&err),
                    logs,
                })
            }
        }
    }

    /// Logs are diagnostics: a failed fetch yields an empty list, never an
    /// error. Cancelling cuts the fetch short; the outcome is already known.
    async fn fetch_logs(&self, submission: &Submission, cancel: &CancellationToken) -> Vec<String> {
        let attempts = self.options.log_fetch_attempts.max(1);
        for attempt in 1..=attempts {
            match watch(cancel, self.network.get_transaction(&submission.signature)).await {
                None => break,
                Some(Ok(Some(meta))) => return meta.log_messages,
                Some(Ok(None)) => debug!(signature = %submission.signature, attempt, "transaction not yet indexed"),
                Some(Err(e)) => debug!(signature = %submission.signature, attempt, error = %e, "log fetch failed"),
            }
            if attempt < attempts && watch(cancel, sleep(self.options.poll_interval)).await.is_none() {
                break;
            }
        }
        warn!(operation = submission.operation, signature = %submission.signature, "execution logs unavailable");
        Vec::new()
    }
}

/// Runs `fut` unless `cancel` fires first.
async fn watch<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

fn render_error(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn timed_out(submission: &Submission) -> ClientError {
    ClientError::ConfirmationTimeout {
        operation: submission.operation,
        signature: submission.signature.clone(),
    }
}

fn cancelled(submission: &Submission) -> ClientError {
    ClientError::Cancelled {
        operation: submission.operation,
        signature: submission.signature.clone(),
    }
}
