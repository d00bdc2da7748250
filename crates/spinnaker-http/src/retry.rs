// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resubmission of requests the service rejected with a transient 400.
//!
//! The orchestrator owns no state between invocations: each call keeps its
//! attempt counter on the stack, so one [`Transport`] may be driven by any
//! number of concurrent retry sequences.

use std::time::Duration;

use tracing::{debug, warn};

use crate::client::Transport;
use crate::error::{BuildError, ClientError, Result};
use crate::request::ApiRequest;
use crate::response::ApiResponse;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Attempt ceiling and backoff growth.
///
/// The wait before attempt `k` (1-indexed) is `backoff_unit * (k - 1)^2`:
/// with the defaults 0s, 1s, 4s, 9s, 16s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Multiplier of the quadratic backoff.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    /// Set the attempt ceiling. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Delay to wait before `attempt` (1-indexed).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let n = attempt.saturating_sub(1);
        self.backoff_unit.saturating_mul(n.saturating_mul(n))
    }
}

/// How one attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The service answered with a 2xx status.
    Succeeded { status: u16 },
    /// The attempt failed; `retryable` tells whether another one followed
    /// (or would have, had the ceiling allowed).
    Failed { error: String, retryable: bool },
}

/// Record of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-indexed attempt number.
    pub attempt: u32,
    /// Time slept before this attempt.
    pub delay: Duration,
    pub outcome: AttemptOutcome,
}

/// History of one retry sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptLog {
    records: Vec<AttemptRecord>,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All attempts in order.
    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    /// Number of requests actually sent.
    pub fn attempts(&self) -> usize {
        self.records.len()
    }

    /// Sum of all backoff delays.
    pub fn total_delay(&self) -> Duration {
        self.records.iter().map(|r| r.delay).sum()
    }

    fn push(&mut self, attempt: u32, delay: Duration, outcome: AttemptOutcome) {
        self.records.push(AttemptRecord {
            attempt,
            delay,
            outcome,
        });
    }
}

/// Execute the request produced by `factory`, resubmitting on status 400.
///
/// The factory is called once per attempt so each submission carries a fresh
/// request. A factory failure aborts immediately. Any error other than a 400
/// service rejection is returned unchanged; after the last attempt the last
/// error is returned unchanged.
pub fn execute_with_retry<T, F>(transport: &T, policy: &RetryPolicy, factory: F) -> Result<ApiResponse>
where
    T: Transport + ?Sized,
    F: FnMut() -> std::result::Result<ApiRequest, BuildError>,
{
    let mut log = AttemptLog::new();
    execute_with_retry_logged(transport, policy, factory, &mut log)
}

/// Same as [`execute_with_retry`], recording every attempt in `log`.
pub fn execute_with_retry_logged<T, F>(
    transport: &T,
    policy: &RetryPolicy,
    mut factory: F,
    log: &mut AttemptLog,
) -> Result<ApiResponse>
where
    T: Transport + ?Sized,
    F: FnMut() -> std::result::Result<ApiRequest, BuildError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = Duration::ZERO;

    loop {
        let request = factory().map_err(ClientError::Build)?;

        match transport.execute(&request) {
            Ok(response) => {
                debug!(attempt, status = response.status, url = %request.url, "request succeeded");
                log.push(
                    attempt,
                    delay,
                    AttemptOutcome::Succeeded {
                        status: response.status,
                    },
                );
                return Ok(response);
            }
            Err(err) => {
                let retryable = err.is_retryable();
                log.push(
                    attempt,
                    delay,
                    AttemptOutcome::Failed {
                        error: err.to_string(),
                        retryable,
                    },
                );

                if !retryable {
                    return Err(err);
                }
                if attempt >= max_attempts {
                    warn!(attempts = attempt, url = %request.url, error = %err, "retries exhausted");
                    return Err(err);
                }

                attempt += 1;
                delay = policy.delay_before(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    url = %request.url,
                    error = %err,
                    "retrying rejected request"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }
    }
}
