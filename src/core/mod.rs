//! Reservation decision-and-retry engine.

pub mod attempt;
pub mod audit;
pub mod classifier;
pub mod date_rule;
pub mod error;
pub mod matcher;
pub mod model;
pub mod reason;
pub mod resolver;
pub mod scheduler;
pub mod transport;

pub use attempt::{AttemptReport, AttemptState, ReservationAttempt, ReservationAttemptMachine};
pub use audit::{outcome_json, InMemoryOutcomeSink, OutcomeSink, TracingOutcomeSink};
pub use classifier::{
    classify_listing, classify_order_error, classify_order_page, classify_submission,
    Classification, PlatformReply, Verdict,
};
pub use date_rule::{DateRule, DateRuleEngine, DateSpec};
pub use error::{AppResult, ConfigError, TransportError};
pub use matcher::{CourseMatcher, MatchFailure, MatchKind, Selection};
pub use model::{
    Account, Course, CourseListing, CourseSummary, Credential, MembershipCard, Occupancy,
    OrderPage, ReservationRequest, RunOutcome, RunStatus, SubmissionResponse, Task,
};
pub use reason::ReasonCode;
pub use resolver::{
    CardChoice, IdSource, LinkAttempt, LinkOutcome, ResolveError, ResolvedCourseId,
    ResourceResolver,
};
pub use scheduler::{RunReport, TaskScheduler};
pub use transport::ReservationTransport;
