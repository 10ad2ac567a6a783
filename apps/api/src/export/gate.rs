use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Allows at most one in-flight export per resume.
///
/// Double-clicking "export" would otherwise start two captures of the same
/// surface. The permit is released when dropped.
#[derive(Debug, Default)]
pub struct ExportGate {
    in_flight: Mutex<HashSet<Uuid>>,
}

impl ExportGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `None` when an export for `resume_id` is already running.
    pub fn try_acquire(self: &Arc<Self>, resume_id: Uuid) -> Option<ExportPermit> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(resume_id) {
            return None;
        }
        Some(ExportPermit {
            gate: Arc::clone(self),
            resume_id,
        })
    }
}

pub struct ExportPermit {
    gate: Arc<ExportGate>,
    resume_id: Uuid,
}

impl Drop for ExportPermit {
    fn drop(&mut self) {
        self.gate
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.resume_id);
    }
}
