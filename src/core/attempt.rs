//! Per-unit submission state machine.
//!
//! One [`ReservationAttempt`] drives a single (account, task, date) submission
//! from `Pending` to a terminal state. Every submission is preceded by a
//! freshly sampled delay elapsed on the injected [`Clock`]; submissions are
//! strictly sequential.

use std::sync::Arc;
use std::time::Duration;

use super::classifier::{classify_submission, Classification, Verdict};
use super::model::{Account, ReservationRequest};
use super::reason::ReasonCode;
use super::transport::ReservationTransport;
use crate::util::clock::Clock;
use crate::util::delay::{DelayRange, DelaySampler};

/// Machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Nothing submitted yet.
    Pending,
    /// A submission is in flight.
    Submitted,
    /// Waiting to resubmit after a busy or unrecognised response.
    Busy,
    /// Booking confirmed.
    Success,
    /// Terminal failure.
    Failed(ReasonCode),
}

impl AttemptState {
    /// `Success` or `Failed`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed(_))
    }
}

/// Transient state of one submission unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationAttempt {
    state: AttemptState,
    submissions: u32,
    max_attempts: u32,
    last_delay: Option<Duration>,
}

impl ReservationAttempt {
    /// Fresh attempt allowing `max_attempts` submissions (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: AttemptState::Pending,
            submissions: 0,
            max_attempts: max_attempts.max(1),
            last_delay: None,
        }
    }

    /// Current state.
    pub const fn state(&self) -> AttemptState {
        self.state
    }

    /// Submissions issued so far.
    pub const fn submissions(&self) -> u32 {
        self.submissions
    }

    /// Most recent pre-submission delay.
    pub const fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    /// Record that a submission is leaving after `delay`.
    ///
    /// Only legal from `Pending` or `Busy`; returns `false` otherwise.
    pub fn begin_submission(&mut self, delay: Duration) -> bool {
        if !matches!(self.state, AttemptState::Pending | AttemptState::Busy) {
            return false;
        }
        self.submissions += 1;
        self.last_delay = Some(delay);
        self.state = AttemptState::Submitted;
        true
    }

    /// Apply the verdict for the in-flight submission.
    pub fn complete(&mut self, verdict: Verdict) -> AttemptState {
        if self.state != AttemptState::Submitted {
            return self.state;
        }
        self.state = match verdict {
            Verdict::Confirmed => AttemptState::Success,
            v if v.is_retryable() && self.submissions < self.max_attempts => AttemptState::Busy,
            v => AttemptState::Failed(v.reason()),
        };
        self.state
    }
}

/// Result of running an attempt to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    /// Terminal reason.
    pub reason: ReasonCode,
    /// Submissions issued.
    pub submissions: u32,
    /// Classification of the last response.
    pub last: Option<Classification>,
    /// One line per submission.
    pub trail: Vec<String>,
}

/// Drives [`ReservationAttempt`]s against a transport.
#[derive(Clone)]
pub struct ReservationAttemptMachine {
    transport: Arc<dyn ReservationTransport>,
    clock: Arc<dyn Clock>,
    sampler: Arc<dyn DelaySampler>,
}

impl ReservationAttemptMachine {
    /// Machine over the given collaborators.
    pub fn new(
        transport: Arc<dyn ReservationTransport>,
        clock: Arc<dyn Clock>,
        sampler: Arc<dyn DelaySampler>,
    ) -> Self {
        Self {
            transport,
            clock,
            sampler,
        }
    }

    /// Submit `request` for `account` until a terminal state is reached.
    pub async fn run(
        &self,
        account: &Account,
        request: &ReservationRequest,
        max_attempts: u32,
        delay: DelayRange,
    ) -> AttemptReport {
        let mut attempt = ReservationAttempt::new(max_attempts);
        let mut last = None;
        let mut trail = Vec::new();

        while !attempt.state().is_terminal() {
            let wait = self.sampler.sample(delay);
            self.clock.sleep(wait).await;
            if !attempt.begin_submission(wait) {
                break;
            }

            let result = self.transport.submit(account, request).await;
            let classification = classify_submission(&result);
            let state = attempt.complete(classification.verdict);

            trail.push(format!(
                "submit#{} delay={}ms verdict={:?} http={} code={}",
                attempt.submissions(),
                wait.as_millis(),
                classification.verdict,
                classification
                    .http_status
                    .map_or_else(|| "-".to_string(), |s| s.to_string()),
                classification
                    .reply
                    .code
                    .map_or_else(|| "-".to_string(), |c| c.to_string()),
            ));
            tracing::debug!(
                account = %account.name,
                class_id = %request.class_id,
                submission = attempt.submissions(),
                ?state,
                matched = classification.matched.unwrap_or("-"),
                "attempt transition"
            );
            if state == AttemptState::Busy {
                tracing::warn!(
                    account = %account.name,
                    class_id = %request.class_id,
                    submission = attempt.submissions(),
                    max_attempts = attempt.max_attempts,
                    "platform busy, resubmitting"
                );
            }
            last = Some(classification);
        }

        let reason = match attempt.state() {
            AttemptState::Success => ReasonCode::Ok,
            AttemptState::Failed(reason) => reason,
            AttemptState::Pending | AttemptState::Submitted | AttemptState::Busy => {
                ReasonCode::Unknown
            }
        };
        AttemptReport {
            reason,
            submissions: attempt.submissions(),
            last,
            trail,
        }
    }
}
