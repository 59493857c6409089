use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Vote,
    Flag,
    Reply,
    Interpretation,
    Delete,
}

/// (target, actor, action). The target is the subject acted on, or the verse
/// for a new interpretation.
type LockKey = (Uuid, Uuid, ActionKind);

/// In-process serialization of one actor doing one thing to one target.
/// Entries are evicted once the last holder lets go.
#[derive(Clone, Default)]
pub struct ActionLocks {
    entries: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

pub struct ActionPermit {
    key: LockKey,
    entries: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ActionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, target: Uuid, actor: Uuid, kind: ActionKind) -> ActionPermit {
        let key = (target, actor, kind);
        let mutex = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        ActionPermit {
            key,
            entries: self.entries.clone(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for ActionPermit {
    fn drop(&mut self) {
        self.guard.take();
        // The map holds one reference; anyone still waiting holds another.
        self.entries
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
