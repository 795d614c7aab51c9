//! API shared state

use crate::observations::ObservationStore;
use crate::registry::DeviceRegistry;

/// Shared state passed to all API handlers
#[derive(Debug, Clone)]
pub struct ApiState {
    /// Devices managed through `/devices`
    pub registry: DeviceRegistry,

    /// Latest readings served on `/metrics`
    pub observations: ObservationStore,
}

impl ApiState {
    pub fn new(registry: DeviceRegistry, observations: ObservationStore) -> Self {
        Self {
            registry,
            observations,
        }
    }
}
