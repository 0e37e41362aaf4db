//! Dispatch observer that keeps every event for later inspection.

use std::sync::Mutex;

use crate::dispatch::{DispatchEvent, DispatchObserver};

#[derive(Debug, Default)]
pub struct RecordingDispatchObserver {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingDispatchObserver {
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .expect("observer mutex poisoned")
            .clone()
    }
}

impl DispatchObserver for RecordingDispatchObserver {
    fn dispatched(&self, event: &DispatchEvent) {
        self.events
            .lock()
            .expect("observer mutex poisoned")
            .push(event.clone());
    }
}
