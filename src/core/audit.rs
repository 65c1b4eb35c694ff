//! Outcome sinks.
//!
//! Every unit's [`RunOutcome`] is delivered to a sink as soon as it is
//! produced. The tracing sink writes the human-readable line (plus an optional
//! JSON line); the in-memory sink keeps a bounded buffer for tests and
//! embedding callers.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::model::{RunOutcome, RunStatus};

/// Receiver of finished outcomes. Called concurrently from account workers.
pub trait OutcomeSink: Send + Sync {
    /// Record one outcome.
    fn record(&self, outcome: &RunOutcome);
}

/// In-memory sink with a bounded buffer; oldest entries are dropped first.
pub struct InMemoryOutcomeSink {
    outcomes: Mutex<VecDeque<RunOutcome>>,
    max_outcomes: usize,
}

impl InMemoryOutcomeSink {
    /// Sink holding at most `max_outcomes` entries.
    pub fn new(max_outcomes: usize) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::with_capacity(max_outcomes.min(1024))),
            max_outcomes,
        }
    }

    /// Snapshot of stored outcomes in arrival order.
    pub fn outcomes(&self) -> Vec<RunOutcome> {
        self.outcomes.lock().iter().cloned().collect()
    }
}

impl OutcomeSink for InMemoryOutcomeSink {
    fn record(&self, outcome: &RunOutcome) {
        let mut outcomes = self.outcomes.lock();
        if self.max_outcomes == 0 {
            return;
        }
        if outcomes.len() >= self.max_outcomes {
            outcomes.pop_front();
        }
        outcomes.push_back(outcome.clone());
    }
}

/// Structured form of an outcome for machine consumption.
pub fn outcome_json(outcome: &RunOutcome) -> Value {
    json!({
        "ts": outcome.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        "account": outcome.account,
        "task": {
            "id": outcome.task_id,
            "date": outcome.date.to_string(),
            "title": outcome.course.as_ref().map(|c| c.title.as_str()),
            "time": outcome.course.as_ref().map(|c| c.time_label.as_str()),
        },
        "status": outcome.status,
        "reason": outcome.reason,
        "http": outcome.http_status,
        "code": outcome.platform_code,
        "msg": outcome.platform_message,
        "req_id": outcome.request_id,
        "final_url": outcome.final_url,
        "excerpt": outcome.excerpt,
        "submissions": outcome.submissions,
    })
}

/// Sink writing outcomes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOutcomeSink {
    log_json: bool,
}

impl TracingOutcomeSink {
    /// Sink that also emits a JSON line per outcome when `log_json` is set.
    pub const fn new(log_json: bool) -> Self {
        Self { log_json }
    }
}

impl OutcomeSink for TracingOutcomeSink {
    fn record(&self, outcome: &RunOutcome) {
        let course = outcome
            .course
            .as_ref()
            .map(|c| format!("{} | {}", c.title, c.time_label))
            .unwrap_or_default();
        let req_id = outcome.request_id.as_deref().unwrap_or("-");
        let final_url = outcome.final_url.as_deref().unwrap_or("-");
        let excerpt = outcome.excerpt.as_deref().unwrap_or("-");
        match outcome.status {
            RunStatus::Success => tracing::info!(
                account = %outcome.account,
                task = %outcome.task_id,
                date = %outcome.date,
                reason = %outcome.reason,
                http = ?outcome.http_status,
                code = ?outcome.platform_code,
                req_id,
                submissions = outcome.submissions,
                %course,
                final_url,
                excerpt,
                "reservation confirmed"
            ),
            RunStatus::Failure => tracing::info!(
                account = %outcome.account,
                task = %outcome.task_id,
                date = %outcome.date,
                reason = %outcome.reason,
                http = ?outcome.http_status,
                code = ?outcome.platform_code,
                msg = outcome.platform_message.as_deref().unwrap_or("-"),
                req_id,
                submissions = outcome.submissions,
                %course,
                final_url,
                excerpt,
                "reservation failed"
            ),
        }
        for line in &outcome.evidence {
            tracing::info!(account = %outcome.account, task = %outcome.task_id, evidence = %line);
        }
        if self.log_json {
            tracing::info!(target: "slot_sniper::outcome", "{}", outcome_json(outcome));
        }
    }
}
