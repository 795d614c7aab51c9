//! Actor running the sampling loop
//!
//! One task owns both cadences. Sampling ticks walk the registry and write
//! the observation store; discovery runs inline on the same task whenever its
//! cadence has elapsed at a tick boundary, so a scan and a sampling pass never
//! overlap.
//!
//! ```text
//!            ┌──────────────── Scheduler (owned, start/stop) ───────────────┐
//!            │                                                              │
//! interval ──┼─▶ tick: registry.list() ─▶ Sampler ─▶ ObservationStore       │
//!            │        └─ elapsed > discovery cadence? ─▶ DiscoveryService   │
//! commands ──┼─▶ TickNow / Shutdown                                         │
//!            └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc channel into the loop
//! 2. **Request/Response**: oneshot channels for `TickNow` reports

pub mod messages;
pub mod scheduler;
