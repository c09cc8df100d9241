//! Shared leaderboard: raise-only writes keyed by identity, live snapshots.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::watch;

/// One identity's best-ever score. The store keeps exactly one entry per
/// identity, never an average or a sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub identity: String,
    pub display_name: String,
    pub score: u32,
}

/// Full leaderboard in first-seen order. The order is what makes tie-breaks
/// in ranking deterministic.
pub type Snapshot = Vec<LeaderboardEntry>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt leaderboard file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Entry created, or raised to the incoming score.
    Raised,
    /// Stored score was already at least the incoming one; nothing changed.
    KeptExisting,
}

/// The consumed interface of the shared store. Updates may originate from
/// other sessions; subscribers must treat every snapshot as authoritative.
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Raise-only write: takes effect only when `score` strictly exceeds the
    /// stored score for `identity`. The store re-checks at write time; any
    /// earlier read by the caller is an optimization, not the authority.
    async fn write(
        &self,
        identity: &str,
        display_name: &str,
        score: u32,
    ) -> Result<WriteOutcome, StoreError>;

    /// Live snapshot channel. The receiver already holds the current state.
    fn subscribe(&self) -> watch::Receiver<Snapshot>;
}

/// JSON-file-backed store in the config directory, or memory-only when
/// constructed without a path. Single authority for this process.
pub struct FileStore {
    entries: Mutex<Snapshot>,
    path: Option<PathBuf>,
    tx: watch::Sender<Snapshot>,
}

impl FileStore {
    /// Load from `path` if it exists, otherwise start empty. The file is
    /// created on first raised write.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let entries: Snapshot = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::new(),
            Err(e) => return Err(e.into()),
        };
        let (tx, _) = watch::channel(entries.clone());
        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
            tx,
        })
    }

    /// Volatile store, used in tests and when no path is configured.
    pub fn in_memory() -> Self {
        let (tx, _) = watch::channel(Snapshot::new());
        Self {
            entries: Mutex::new(Snapshot::new()),
            path: None,
            tx,
        }
    }

    fn persist(&self, entries: &Snapshot) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

#[async_trait]
impl LeaderboardStore for FileStore {
    async fn write(
        &self,
        identity: &str,
        display_name: &str,
        score: u32,
    ) -> Result<WriteOutcome, StoreError> {
        // The lock is held across persist and notify so memory, disk and
        // subscribers always advance together and in write order.
        let mut entries = self.entries.lock().expect("leaderboard lock poisoned");
        let mut updated = entries.clone();
        match updated.iter_mut().find(|e| e.identity == identity) {
            Some(entry) if score > entry.score => {
                entry.score = score;
                entry.display_name = display_name.to_string();
            }
            Some(_) => return Ok(WriteOutcome::KeptExisting),
            None => updated.push(LeaderboardEntry {
                identity: identity.to_string(),
                display_name: display_name.to_string(),
                score,
            }),
        }
        // Disk first: a failed persist leaves every view on the old state,
        // so a retry re-runs the whole write.
        self.persist(&updated)?;
        *entries = updated.clone();
        self.tx.send_replace(updated);
        Ok(WriteOutcome::Raised)
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_is_raise_only_and_idempotent() {
        let store = FileStore::in_memory();
        assert_eq!(
            store.write("0xabc", "alice", 50).await.unwrap(),
            WriteOutcome::Raised
        );
        // Same score again: no-op.
        assert_eq!(
            store.write("0xabc", "alice", 50).await.unwrap(),
            WriteOutcome::KeptExisting
        );
        // Lower score from a concurrent session: no-op.
        assert_eq!(
            store.write("0xabc", "alice", 30).await.unwrap(),
            WriteOutcome::KeptExisting
        );
        let snap = store.subscribe().borrow().clone();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].score, 50);
    }

    #[tokio::test]
    async fn stored_score_is_monotonic() {
        let store = FileStore::in_memory();
        let writes = [10u32, 50, 30, 80, 60, 80];
        let mut last = 0;
        for s in writes {
            store.write("0xabc", "alice", s).await.unwrap();
            let now = store.subscribe().borrow()[0].score;
            assert!(now >= last, "score regressed: {last} -> {now}");
            last = now;
        }
        assert_eq!(last, 80);
    }

    #[tokio::test]
    async fn entries_keep_first_seen_order() {
        let store = FileStore::in_memory();
        store.write("0xaaa", "a", 10).await.unwrap();
        store.write("0xbbb", "b", 10).await.unwrap();
        store.write("0xaaa", "a", 20).await.unwrap();
        let snap = store.subscribe().borrow().clone();
        let ids: Vec<_> = snap.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(ids, ["0xaaa", "0xbbb"]);
    }

    #[tokio::test]
    async fn subscription_sees_raised_writes() {
        let store = FileStore::in_memory();
        let mut rx = store.subscribe();
        store.write("0xabc", "alice", 40).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].score, 40);
        // A kept-existing write does not broadcast.
        store.write("0xabc", "alice", 40).await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn failed_persist_leaves_no_trace() {
        let path = std::env::temp_dir().join(format!(
            "snakecast-lb-blocked-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&path);
        let _ = fs::remove_file(&path);
        let store = FileStore::open(path.clone()).unwrap();
        // A directory at the target path makes the file write fail.
        fs::create_dir_all(&path).unwrap();

        let mut rx = store.subscribe();
        assert!(store.write("0xabc", "alice", 80).await.is_err());
        // Memory and subscribers stayed on the old (empty) state, so the
        // optimistic improvement check cannot see a score that never landed.
        assert!(!rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());

        // Retrying the same write runs in full once the path works again.
        fs::remove_dir_all(&path).unwrap();
        assert_eq!(
            store.write("0xabc", "alice", 80).await.unwrap(),
            WriteOutcome::Raised
        );
        assert_eq!(store.subscribe().borrow()[0].score, 80);
        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn survives_reload_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "snakecast-lb-test-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        {
            let store = FileStore::open(path.clone()).unwrap();
            store.write("0xabc", "alice", 70).await.unwrap();
        }
        let store = FileStore::open(path.clone()).unwrap();
        let snap = store.subscribe().borrow().clone();
        assert_eq!(snap[0].score, 70);
        assert_eq!(snap[0].display_name, "alice");
        let _ = fs::remove_file(&path);
    }
}
