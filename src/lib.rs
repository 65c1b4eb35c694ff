//! # Slot Sniper
//!
//! A decision-and-retry engine for competing over scarce, time-released
//! reservation slots on a facility-booking platform, across several accounts
//! and several course/time wishes at once.
//!
//! The network call is the easy part. The engine turns a noisy, partially
//! documented web API into a reliable answer to "did I get the slot, and if
//! not, why not":
//!
//! - **Date rules**: literal dates, lists, ranges, or release rules such as
//!   `plus_7_after_17` resolved against the platform's local time.
//! - **Course matching**: strict or relaxed keyword matching with an optional
//!   fallback to any bookable course. Full courses are never overridden.
//! - **Resource resolution**: membership-card choice and a fallback chain for
//!   the course identifier, with evidence for every link tried.
//! - **Attempt machine**: retry-on-busy with freshly sampled delays, strictly
//!   sequential submissions and no retry on permanent rejections.
//! - **Scheduling**: accounts × tasks × dates with bounded per-account
//!   concurrency and a cooperative global deadline.
//! - **Classification**: every unit ends with exactly one reason code.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use slot_sniper::builders::SchedulerBuilder;
//! use slot_sniper::config::ConfigLoader;
//! use slot_sniper::runtime::block_on_run;
//! use slot_sniper::util::init_tracing;
//!
//! init_tracing();
//! let config = ConfigLoader::new().load()?;
//! let scheduler = SchedulerBuilder::new(config)
//!     .transport(Arc::new(MyHttpTransport::new()))
//!     .build()?;
//! let report = block_on_run(&scheduler)?;
//! std::process::exit(if report.succeeded() { 0 } else { 1 });
//! ```
//!
//! For deterministic runs see `tests/scheduler_test.rs`, which drives the
//! engine with [`infra::ScriptedTransport`], [`util::ManualClock`] and
//! [`util::FixedDelay`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Reservation engine: models, matching, resolution, attempts, scheduling.
pub mod core;
/// Run configuration and the layered loader.
pub mod config;
/// Builders to construct the scheduler from configuration.
pub mod builders;
/// Infrastructure adapters (in-memory transport).
pub mod infra;
/// Runtime drivers for synchronous callers.
pub mod runtime;
/// Shared utilities: clocks, delays, privacy, telemetry.
pub mod util;
