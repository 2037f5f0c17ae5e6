//! # Scripted Transport
//!
//! A [`Connector`] that plays back a queue of outcomes instead of touching
//! the network. Each connect attempt consumes one [`ScriptStep`]; once the
//! queue is empty every connect gets the fallback step.
//!
//! It records every connect, write, and close so callers can check that
//! sockets were released and that nothing overlapped.
//!
//! ```
//! use tagpress::transport::{ScriptStep, ScriptedConnector};
//!
//! let connector = ScriptedConnector::new([ScriptStep::Refuse, ScriptStep::accept()]);
//! assert_eq!(connector.connect_attempts(), 0);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Connection, Connector};

/// What happens on one connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Connect fails with `ConnectionRefused`
    Refuse,
    /// Connect never completes
    Hang,
    /// Connection opens, accepts writes, then replies with these bytes
    /// (split into two chunks) followed by EOF
    Accept(Vec<u8>),
    /// Connection opens but the first write fails with `BrokenPipe`
    ResetOnWrite,
    /// Connection opens, accepts writes, and never replies
    Silent,
}

impl ScriptStep {
    /// Accepts and closes without replying.
    pub fn accept() -> Self {
        Self::Accept(Vec::new())
    }

    pub fn reply(bytes: &[u8]) -> Self {
        Self::Accept(bytes.to_vec())
    }
}

#[derive(Default)]
struct Record {
    connect_attempts: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    dropped_open: AtomicUsize,
    live: AtomicUsize,
    peak_live: AtomicUsize,
    writes: Mutex<Vec<Vec<u8>>>,
}

/// Replays [`ScriptStep`]s and records what the transport did.
#[derive(Clone)]
pub struct ScriptedConnector {
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
    fallback: ScriptStep,
    record: Arc<Record>,
}

impl ScriptedConnector {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            fallback: ScriptStep::accept(),
            record: Arc::new(Record::default()),
        }
    }

    /// Printer that accepts every job.
    pub fn online() -> Self {
        Self::new([])
    }

    /// Printer that refuses every connection.
    pub fn offline() -> Self {
        Self::new([]).with_fallback(ScriptStep::Refuse)
    }

    pub fn with_fallback(mut self, step: ScriptStep) -> Self {
        self.fallback = step;
        self
    }

    /// Queue more steps behind the current ones.
    pub fn push(&self, step: ScriptStep) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(step);
        }
    }

    pub fn connect_attempts(&self) -> usize {
        self.record.connect_attempts.load(Ordering::SeqCst)
    }

    /// Connections that were successfully opened
    pub fn opened(&self) -> usize {
        self.record.opened.load(Ordering::SeqCst)
    }

    /// Connections released through [`Connection::close`]
    pub fn closed(&self) -> usize {
        self.record.closed.load(Ordering::SeqCst)
    }

    /// Connections dropped without ever being closed
    pub fn leaked(&self) -> usize {
        self.record.dropped_open.load(Ordering::SeqCst)
    }

    /// Highest number of connections open at the same moment
    pub fn peak_open(&self) -> usize {
        self.record.peak_live.load(Ordering::SeqCst)
    }

    /// Every payload written, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.record
            .writes
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    fn next_step(&self) -> ScriptStep {
        self.steps
            .lock()
            .ok()
            .and_then(|mut steps| steps.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn open(&self, step: ScriptStep) -> Box<dyn Connection> {
        let record = &self.record;
        record.opened.fetch_add(1, Ordering::SeqCst);
        let live = record.live.fetch_add(1, Ordering::SeqCst) + 1;
        record.peak_live.fetch_max(live, Ordering::SeqCst);

        let mut pending = VecDeque::new();
        if let ScriptStep::Accept(reply) = &step {
            if !reply.is_empty() {
                let (a, b) = reply.split_at(reply.len() / 2);
                pending.push_back(a.to_vec());
                pending.push_back(b.to_vec());
            }
        }

        Box::new(ScriptedConnection {
            step,
            pending,
            open: true,
            record: Arc::clone(&self.record),
        })
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _host: &str, _port: u16) -> io::Result<Box<dyn Connection>> {
        self.record.connect_attempts.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            ScriptStep::Refuse => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
            ScriptStep::Hang => std::future::pending().await,
            step => Ok(self.open(step)),
        }
    }
}

struct ScriptedConnection {
    step: ScriptStep,
    pending: VecDeque<Vec<u8>>,
    open: bool,
    record: Arc<Record>,
}

impl ScriptedConnection {
    fn release(&mut self) -> bool {
        if self.open {
            self.open = false;
            self.record.live.fetch_sub(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        if self.step == ScriptStep::ResetOnWrite {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"));
        }
        if let Ok(mut writes) = self.record.writes.lock() {
            writes.push(data.to_vec());
        }
        Ok(())
    }

    async fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        if self.step == ScriptStep::Silent {
            return std::future::pending().await;
        }
        Ok(self.pending.pop_front().unwrap_or_default())
    }

    async fn close(&mut self) -> io::Result<()> {
        if self.release() {
            self.record.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        if self.release() {
            self.record.dropped_open.fetch_add(1, Ordering::SeqCst);
        }
    }
}
