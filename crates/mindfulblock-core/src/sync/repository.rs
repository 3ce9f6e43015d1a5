//! Remote rule repository seam.
//!
//! The repository is a document store with push/subscribe semantics:
//! a push replaces the whole rule document, and every subscriber receives
//! the new snapshot, including the one that pushed it.

use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::{CoreError, Result};
use crate::rules::RuleSnapshot;

pub trait RuleRepository {
    /// Current document.
    fn fetch(&self) -> Result<RuleSnapshot>;

    /// Replace the document.
    fn push(&self, snapshot: &RuleSnapshot) -> Result<()>;

    /// Receive every snapshot written from now on.
    fn subscribe(&self) -> UnboundedReceiver<RuleSnapshot>;
}

impl<R: RuleRepository + ?Sized> RuleRepository for &R {
    fn fetch(&self) -> Result<RuleSnapshot> {
        (**self).fetch()
    }
    fn push(&self, snapshot: &RuleSnapshot) -> Result<()> {
        (**self).push(snapshot)
    }
    fn subscribe(&self) -> UnboundedReceiver<RuleSnapshot> {
        (**self).subscribe()
    }
}

/// Subscriber list shared by repository implementations.
#[derive(Debug, Default)]
pub struct Subscribers {
    senders: Mutex<Vec<UnboundedSender<RuleSnapshot>>>,
}

impl Subscribers {
    pub fn subscribe(&self) -> UnboundedReceiver<RuleSnapshot> {
        let (tx, rx) = unbounded_channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        rx
    }

    /// Send to every live subscriber, forgetting closed ones.
    pub fn publish(&self, snapshot: &RuleSnapshot) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }
}

/// In-process repository, used for tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    document: Mutex<RuleSnapshot>,
    subscribers: Subscribers,
    offline: Mutex<bool>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: RuleSnapshot) -> Self {
        Self {
            document: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.lock() {
            *flag = offline;
        }
    }

    /// Write as if another device had pushed.
    pub fn push_remote(&self, snapshot: RuleSnapshot) {
        if let Ok(mut doc) = self.document.lock() {
            *doc = snapshot.clone();
        }
        self.subscribers.publish(&snapshot);
    }

    fn check_online(&self) -> Result<()> {
        match self.offline.lock() {
            Ok(flag) if !*flag => Ok(()),
            _ => Err(CoreError::RepositoryUnavailable("repository offline".to_string())),
        }
    }
}

impl RuleRepository for MemoryRepository {
    fn fetch(&self) -> Result<RuleSnapshot> {
        self.check_online()?;
        self.document
            .lock()
            .map(|doc| doc.clone())
            .map_err(|_| CoreError::RepositoryUnavailable("repository lock poisoned".to_string()))
    }

    fn push(&self, snapshot: &RuleSnapshot) -> Result<()> {
        self.check_online()?;
        snapshot.validate()?;
        self.push_remote(snapshot.clone());
        Ok(())
    }

    fn subscribe(&self) -> UnboundedReceiver<RuleSnapshot> {
        self.subscribers.subscribe()
    }
}
