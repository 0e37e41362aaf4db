//! Test helpers for the transport module.

use std::io::Read;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::{Connection, ConnectionHandler};

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _connection: Connection) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds every connection open until the peer closes it.
pub(crate) struct BlockingHandler {
    started: Arc<AtomicUsize>,
}

impl BlockingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let started = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            started: Arc::clone(&started),
        });
        (started, handler)
    }
}

impl ConnectionHandler for BlockingHandler {
    fn handle(&self, mut connection: Connection) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        let _ = connection.read_to_end(&mut sink);
    }
}
