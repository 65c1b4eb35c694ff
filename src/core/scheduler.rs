//! Accounts × tasks × dates scheduling.
//!
//! Dates are resolved for every task before anything is sent, so a bad date
//! specification fails the run with no outcomes. Each account then runs on its
//! own tokio task; inside an account, units run sequentially or through a
//! semaphore-bounded set. The global deadline is checked as each unit starts;
//! a unit that starts late is recorded as `TIMEOUT` and touches nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;

use super::attempt::ReservationAttemptMachine;
use super::audit::OutcomeSink;
use super::classifier::{classify_listing, classify_order_error, classify_order_page};
use super::date_rule::DateRuleEngine;
use super::error::{ConfigError, TransportError};
use super::matcher::{CourseMatcher, MatchKind};
use super::model::{Account, CourseSummary, MembershipCard, ReservationRequest, RunOutcome, Task};
use super::reason::ReasonCode;
use super::resolver::{
    ResolveError, ResourceResolver, CARD_CATEGORY_FIELD, COURSE_ID_FIELD, MEMBER_CARD_FIELD,
};
use super::transport::ReservationTransport;
use crate::config::RunConfig;
use crate::util::clock::Clock;
use crate::util::delay::DelaySampler;
use crate::util::privacy::{mask_identifier, sanitize_excerpt};

const EXCERPT_CHARS: usize = 160;

/// Form fields carried explicitly on [`ReservationRequest`].
const RESERVED_FIELDS: &[&str] = &["id", COURSE_ID_FIELD, MEMBER_CARD_FIELD, CARD_CATEGORY_FIELD];

/// Defaults the confirm endpoint expects when the order page omits them.
const FIELD_DEFAULTS: &[(&str, &str)] = &[
    ("time_from_stamp", "0"),
    ("time_to_stamp", "0"),
    ("quantity", "1"),
    ("is_waiting", ""),
];

/// Aggregated result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Identifier logged with every run-level line.
    pub run_id: String,
    /// One outcome per (account, task, date), in configuration order.
    pub outcomes: Vec<RunOutcome>,
}

impl RunReport {
    /// True when at least one unit ran and every unit ended OK.
    pub fn succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(RunOutcome::is_ok)
    }

    /// Outcome counts per reason.
    pub fn reason_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// One scheduled (account, task, date) unit.
#[derive(Debug, Clone)]
struct Unit {
    order: (usize, usize, usize),
    task: Arc<Task>,
    date: NaiveDate,
}

/// Shared state for one account's worker.
struct AccountWorker {
    account: Account,
    shop_id: String,
    transport: Arc<dyn ReservationTransport>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn OutcomeSink>,
    machine: ReservationAttemptMachine,
    resolver: ResourceResolver,
    cards: OnceCell<Result<Vec<MembershipCard>, TransportError>>,
    course_guards: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    started_at: Duration,
    deadline: Option<Duration>,
}

impl AccountWorker {
    fn deadline_passed(&self) -> bool {
        self.deadline
            .is_some_and(|limit| self.clock.elapsed().saturating_sub(self.started_at) >= limit)
    }

    fn course_guard(&self, course_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.course_guards
            .lock()
            .entry(course_id.to_string())
            .or_default()
            .clone()
    }

    async fn cards(&self) -> &Result<Vec<MembershipCard>, TransportError> {
        self.cards
            .get_or_init(|| async { self.transport.fetch_cards(&self.account).await })
            .await
    }

    async fn run_unit(&self, unit: &Unit) -> RunOutcome {
        let mut outcome = RunOutcome::new(
            self.account.name.clone(),
            unit.task.id.clone(),
            unit.date,
            ReasonCode::Unknown,
            self.clock.now_local(),
        );

        let reason = if self.deadline_passed() {
            tracing::warn!(
                account = %self.account.name,
                task = %unit.task.id,
                date = %unit.date,
                "global deadline passed, unit not started"
            );
            outcome.evidence.push("global deadline passed before start".into());
            ReasonCode::Timeout
        } else {
            tracing::info!(
                account = %self.account.name,
                task = %unit.task.id,
                date = %unit.date,
                shop = %mask_identifier(&self.shop_id),
                "unit started"
            );
            self.drive(unit, &mut outcome).await
        };

        outcome.set_reason(reason);
        outcome.timestamp = self.clock.now_local();
        self.sink.record(&outcome);
        outcome
    }

    async fn drive(&self, unit: &Unit, outcome: &mut RunOutcome) -> ReasonCode {
        let task = unit.task.as_ref();

        let listing = self
            .transport
            .fetch_courses(&self.account, unit.date, &self.shop_id)
            .await;
        let courses = match classify_listing(&listing) {
            Ok(courses) => courses,
            Err(reason) => {
                match &listing {
                    Ok(l) => {
                        outcome.platform_code = l.code;
                        outcome.platform_message = l.message.clone();
                    }
                    Err(e) => {
                        outcome.http_status = e.status();
                        outcome.excerpt = Some(sanitize_excerpt(&e.to_string(), EXCERPT_CHARS));
                    }
                }
                outcome.evidence.push(format!("listing rejected: {reason}"));
                return reason;
            }
        };

        let selection = match CourseMatcher::for_task(task).select(courses) {
            Ok(selection) => selection,
            Err(failure) => {
                outcome
                    .evidence
                    .push(format!("{} course(s) listed, none selectable", courses.len()));
                return failure.into();
            }
        };
        let course = selection.course;
        outcome.course = Some(CourseSummary::from(course));
        outcome.evidence.push(match selection.kind {
            MatchKind::Filtered => format!("matched course {}", course.id),
            MatchKind::Fallback => format!("fallback to course {}", course.id),
        });

        // Held through submission: one in-flight attempt per (account, course).
        let guard = self.course_guard(&course.id);
        let _held = guard.lock().await;

        let page = match self.transport.fetch_order_page(&self.account, course).await {
            Ok(page) => page,
            Err(e) => {
                outcome.http_status = e.status();
                outcome.excerpt = Some(sanitize_excerpt(&e.to_string(), EXCERPT_CHARS));
                return classify_order_error(&e);
            }
        };
        if let Err(reason) = classify_order_page(&page) {
            outcome.http_status = Some(page.status);
            outcome.final_url = Some(page.final_url.clone()).filter(|u| !u.is_empty());
            outcome.evidence.push(format!("order page rejected: {reason}"));
            return reason;
        }

        // Card ids on the order page win; the listing is only fetched without them.
        let card = match self.resolver.card_from_page(&page) {
            Some(choice) => Ok(choice),
            None => match self.cards().await {
                Ok(cards) => self
                    .resolver
                    .choose_card(cards, &self.account.preferred_cards, course),
                Err(e) => self.resolver.fallback_card(&e.to_string()),
            },
        };
        let card = match card {
            Ok(choice) => {
                outcome.evidence.push(choice.rationale);
                choice.card
            }
            Err(e) => {
                outcome.excerpt = Some(sanitize_excerpt(&e.to_string(), EXCERPT_CHARS));
                return e.reason();
            }
        };

        let course_id = match self.resolver.resolve_course_id(&page) {
            Ok(resolved) => {
                outcome
                    .evidence
                    .extend(resolved.trail.iter().map(ToString::to_string));
                resolved.id
            }
            Err(e) => {
                if let ResolveError::CourseIdMissing(trail) = &e {
                    outcome.evidence.extend(trail.iter().map(ToString::to_string));
                }
                return e.reason();
            }
        };

        let mut fields: BTreeMap<String, String> = page
            .hidden_fields
            .iter()
            .filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in FIELD_DEFAULTS {
            fields
                .entry((*key).to_string())
                .or_insert_with(|| (*value).to_string());
        }
        let request = ReservationRequest {
            class_id: course.id.clone(),
            course_id,
            card_id: card.id,
            card_category_id: card.category_id,
            fields,
        };

        let report = self
            .machine
            .run(&self.account, &request, task.max_attempts, task.delay)
            .await;
        outcome.submissions = report.submissions;
        outcome.evidence.extend(report.trail);
        if let Some(last) = report.last {
            outcome.http_status = last.http_status;
            outcome.platform_code = last.reply.code;
            outcome.platform_message = last.reply.message;
            outcome.request_id = last.reply.request_id;
            outcome.final_url = last.final_url;
            outcome.excerpt = last.excerpt;
        }
        report.reason
    }
}

/// Runs every unit of a [`RunConfig`] and aggregates the outcomes.
pub struct TaskScheduler {
    config: Arc<RunConfig>,
    transport: Arc<dyn ReservationTransport>,
    clock: Arc<dyn Clock>,
    sampler: Arc<dyn DelaySampler>,
    sink: Arc<dyn OutcomeSink>,
}

impl TaskScheduler {
    /// Scheduler over the given collaborators. Unnamed tasks get default ids.
    pub fn new(
        config: RunConfig,
        transport: Arc<dyn ReservationTransport>,
        clock: Arc<dyn Clock>,
        sampler: Arc<dyn DelaySampler>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            config: Arc::new(config.normalized()),
            transport,
            clock,
            sampler,
            sink,
        }
    }

    /// The effective configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolve dates for every task, per account, in reporting order.
    fn resolver(&self) -> ResourceResolver {
        let resolver = ResourceResolver::new(self.config.default_course_id.clone());
        match (
            &self.config.default_member_card_id,
            &self.config.default_card_cat_id,
        ) {
            (Some(card), Some(category)) => resolver.with_default_card(card, category),
            _ => resolver,
        }
    }

    fn plan(&self) -> Result<Vec<Vec<Unit>>, ConfigError> {
        self.config.validate()?;
        let engine = DateRuleEngine::new(self.config.date_rule);
        let now = self.clock.now_local();

        let mut resolved = Vec::with_capacity(self.config.tasks.len());
        for task in &self.config.tasks {
            let dates = engine.resolve(&task.id, task.date.as_ref(), now)?;
            resolved.push((Arc::new(task.clone()), dates));
        }

        Ok(self
            .config
            .accounts
            .iter()
            .enumerate()
            .map(|(a, account)| {
                resolved
                    .iter()
                    .enumerate()
                    .filter(|(_, (task, _))| task.applies_to(&account.name))
                    .flat_map(|(t, (task, dates))| {
                        dates.iter().enumerate().map(move |(d, date)| Unit {
                            order: (a, t, d),
                            task: Arc::clone(task),
                            date: *date,
                        })
                    })
                    .collect()
            })
            .collect())
    }

    /// Execute the run.
    ///
    /// Fails only on configuration errors, before any unit starts.
    pub async fn run(&self) -> Result<RunReport, ConfigError> {
        let plan = self.plan()?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = self.clock.elapsed();
        let deadline = self.config.global_timeout_ms.map(Duration::from_millis);
        let concurrency = self.config.concurrency.max(1);
        let total: usize = plan.iter().map(Vec::len).sum();

        tracing::info!(
            %run_id,
            accounts = self.config.accounts.len(),
            tasks = self.config.tasks.len(),
            units = total,
            concurrency,
            "run started"
        );

        let mut workers = JoinSet::new();
        for (account, units) in self.config.accounts.iter().zip(plan) {
            if units.is_empty() {
                continue;
            }
            let worker = Arc::new(AccountWorker {
                account: account.clone(),
                shop_id: self.config.shop_id.clone(),
                transport: Arc::clone(&self.transport),
                clock: Arc::clone(&self.clock),
                sink: Arc::clone(&self.sink),
                machine: ReservationAttemptMachine::new(
                    Arc::clone(&self.transport),
                    Arc::clone(&self.clock),
                    Arc::clone(&self.sampler),
                ),
                resolver: self.resolver(),
                cards: OnceCell::new(),
                course_guards: Mutex::new(HashMap::new()),
                started_at,
                deadline,
            });
            workers.spawn(run_account(worker, units, concurrency));
        }

        let mut tagged = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcomes) => tagged.extend(outcomes),
                Err(e) => tracing::error!(%run_id, error = %e, "account worker aborted"),
            }
        }
        tagged.sort_by_key(|(order, _)| *order);

        let report = RunReport {
            run_id,
            outcomes: tagged.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        tracing::info!(
            run_id = %report.run_id,
            units = report.outcomes.len(),
            succeeded = report.succeeded(),
            reasons = ?report.reason_counts(),
            "run finished"
        );
        Ok(report)
    }
}

async fn run_account(
    worker: Arc<AccountWorker>,
    units: Vec<Unit>,
    concurrency: usize,
) -> Vec<((usize, usize, usize), RunOutcome)> {
    if concurrency <= 1 {
        let mut outcomes = Vec::with_capacity(units.len());
        for unit in units {
            let outcome = worker.run_unit(&unit).await;
            outcomes.push((unit.order, outcome));
        }
        return outcomes;
    }

    let permits = Arc::new(Semaphore::new(concurrency));
    let mut set = JoinSet::new();
    for unit in units {
        let worker = Arc::clone(&worker);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let outcome = worker.run_unit(&unit).await;
            (unit.order, outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(entry) => outcomes.push(entry),
            Err(e) => tracing::error!(
                account = %worker.account.name,
                error = %e,
                "unit task aborted"
            ),
        }
    }
    outcomes
}
