//! Single-Flight Module
//!
//! Per-key gates that let one caller populate a missing key while concurrent
//! callers for the same key wait instead of fetching again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Gate = Arc<AsyncMutex<()>>;

// == Single Flight ==
#[derive(Debug, Default)]
pub struct SingleFlight {
    gates: Mutex<HashMap<String, Gate>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    // == Enter ==
    /// Waits until no other caller holds the gate for `key`, then holds it.
    ///
    /// The gate is released when the returned guard is dropped. The first
    /// caller to find no gate creates it; later callers queue on it.
    pub async fn enter(&self, key: &str) -> FlightGuard<'_> {
        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
            gates
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let permit = gate.clone().lock_owned().await;

        FlightGuard {
            owner: self,
            key: key.to_string(),
            gate,
            _permit: permit,
        }
    }

    /// Number of keys with an open gate.
    pub fn in_flight(&self) -> usize {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, key: &str, gate: &Gate) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        // Only drop the map entry if it is still ours and nobody else is queued on it.
        if let Some(current) = gates.get(key) {
            if Arc::ptr_eq(current, gate) && Arc::strong_count(gate) <= 3 {
                gates.remove(key);
            }
        }
    }
}

// == Flight Guard ==
/// Holds the gate for one key until dropped.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    gate: Gate,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.release(&self.key, &self.gate);
    }
}
