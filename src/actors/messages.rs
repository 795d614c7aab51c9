//! Message types for the scheduler actor

use tokio::sync::oneshot;

use crate::discovery::DiscoveryReport;

/// Commands that can be sent to the poll loop
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one tick right away, bypassing the interval timer
    ///
    /// Used for testing and manual refresh operations.
    TickNow {
        /// Channel to send the report back
        respond_to: oneshot::Sender<TickReport>,
    },

    /// Gracefully shut down the loop
    ///
    /// The loop finishes any in-flight tick and then exits.
    Shutdown,
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Devices in the registry snapshot
    pub devices: usize,

    /// Samples that produced a reading
    pub sampled: usize,

    /// Samples that failed; their previous readings were kept
    pub failed: usize,

    /// Set when the discovery cadence elapsed and a scan ran after sampling
    pub discovery: Option<DiscoveryReport>,
}
