//! Builder wiring a [`TaskScheduler`] from configuration and collaborators.

use std::sync::Arc;

use crate::config::RunConfig;
use crate::core::{
    ConfigError, OutcomeSink, ReservationTransport, TaskScheduler, TracingOutcomeSink,
};
use crate::util::{Clock, DelaySampler, SystemClock, UniformDelay};

/// Assembles a scheduler; only the configuration and transport are required.
///
/// Defaults: a [`SystemClock`] in the configured UTC offset (host timezone
/// otherwise), OS-seeded [`UniformDelay`], and a [`TracingOutcomeSink`]
/// honouring `log_json`.
pub struct SchedulerBuilder {
    config: RunConfig,
    transport: Option<Arc<dyn ReservationTransport>>,
    clock: Option<Arc<dyn Clock>>,
    sampler: Option<Arc<dyn DelaySampler>>,
    sink: Option<Arc<dyn OutcomeSink>>,
}

impl SchedulerBuilder {
    /// Start from `config`.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            transport: None,
            clock: None,
            sampler: None,
            sink: None,
        }
    }

    /// Platform transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn ReservationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Delay sampler.
    #[must_use]
    pub fn sampler(mut self, sampler: Arc<dyn DelaySampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Outcome sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and build the scheduler.
    pub fn build(self) -> Result<TaskScheduler, ConfigError> {
        let config = self.config.normalized();
        config.validate()?;

        let transport = self
            .transport
            .ok_or_else(|| ConfigError::Invalid("transport not set".into()))?;
        let clock = self.clock.unwrap_or_else(|| match config.utc_offset() {
            Some(offset) => Arc::new(SystemClock::with_offset(offset)),
            None => Arc::new(SystemClock::new()),
        });
        let sampler = self
            .sampler
            .unwrap_or_else(|| Arc::new(UniformDelay::new()));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingOutcomeSink::new(config.log_json)));

        Ok(TaskScheduler::new(config, transport, clock, sampler, sink))
    }
}
