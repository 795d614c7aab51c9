//! Latest reading per device
//!
//! The scheduler is the only writer. The metrics endpoint reads under a
//! shared lock for a whole enumeration, so a scrape always sees one
//! consistent snapshot and never a half-written reading.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{Reading, exposition};

/// Concurrent map of instance to most recent [`Reading`]
///
/// Cloning yields another handle onto the same store.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    readings: Arc<RwLock<BTreeMap<String, Reading>>>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reading for `reading.instance` as a whole value
    pub async fn record(&self, reading: Reading) {
        let mut readings = self.readings.write().await;
        readings.insert(reading.instance.clone(), reading);
    }

    pub async fn get(&self, instance: &str) -> Option<Reading> {
        self.readings.read().await.get(instance).cloned()
    }

    /// Copy of every reading, ordered by instance
    pub async fn snapshot(&self) -> Vec<Reading> {
        self.readings.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }

    /// Render the scrape body while holding the read lock
    pub async fn render(&self) -> String {
        let readings = self.readings.read().await;
        exposition::render(readings.values())
    }
}
