//! Shutdown signal released by the test instead of the operating system.

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::runtime::{ShutdownError, ShutdownSignal};

/// Blocks [`ShutdownSignal::wait`] until the paired sender fires or drops.
pub struct ManualShutdownSignal {
    receiver: Mutex<Receiver<()>>,
}

impl ManualShutdownSignal {
    pub fn new() -> (Sender<()>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver: Mutex::new(receiver),
            },
        )
    }
}

impl ShutdownSignal for ManualShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let receiver = self.receiver.lock().expect("shutdown mutex poisoned");
        let _ = receiver.recv();
        Ok(())
    }
}
