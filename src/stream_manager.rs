//! Global registry of active stream keys. Gates admission so two
//! publishers can never claim the same key concurrently, and tracks a
//! per-stream liveness signal observers can await.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A handle to one admitted stream. Dropping this does not remove the
/// stream -- removal is explicit via [`StreamManager::remove`], which
/// also cancels `liveness` so anyone awaiting stream end wakes up.
#[derive(Clone)]
pub struct StreamHandle {
    pub key: String,
    pub started_at: Instant,
    pub liveness: CancellationToken,
}

/// Authoritative admission control against duplicate publishers on the
/// same stream key.
#[derive(Default)]
pub struct StreamManager {
    streams: RwLock<HashMap<String, StreamHandle>>,
}

impl StreamManager {
    pub fn new() -> Self {
        StreamManager {
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Atomically inserts a new entry for `key`. Returns `None` without
    /// mutating anything if the key is already active.
    pub fn create(&self, key: impl Into<String>) -> Option<StreamHandle> {
        let key = key.into();
        let mut streams = self.streams.write();
        if streams.contains_key(&key) {
            warn!(stream_key = %key, "rejected duplicate stream admission");
            return None;
        }
        let handle = StreamHandle {
            key: key.clone(),
            started_at: Instant::now(),
            liveness: CancellationToken::new(),
        };
        streams.insert(key.clone(), handle.clone());
        info!(stream_key = %key, "admitted stream");
        Some(handle)
    }

    /// Removes `key` if present, firing its liveness signal. No-op if
    /// absent.
    pub fn remove(&self, key: &str) {
        if let Some(handle) = self.streams.write().remove(key) {
            handle.liveness.cancel();
            info!(stream_key = %key, "removed stream");
        }
    }

    /// Snapshot of currently active handles.
    pub fn list(&self) -> Vec<StreamHandle> {
        self.streams.read().values().cloned().collect()
    }
}

/// Derives the application-level stream key from an SRT streamID: strips
/// an optional leading `/`, then an optional leading `live/`; an empty
/// remainder becomes `"default"`.
pub fn extract_stream_key(stream_id: &str) -> String {
    let trimmed = stream_id.strip_prefix('/').unwrap_or(stream_id);
    let trimmed = trimmed.strip_prefix("live/").unwrap_or(trimmed);
    if trimmed.is_empty() {
        "default".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_duplicate_key() {
        let manager = StreamManager::new();
        assert!(manager.create("cam1").is_some());
        assert!(manager.create("cam1").is_none());
        assert_eq!(manager.list().len(), 1);
    }

    #[test]
    fn remove_then_recreate_succeeds() {
        let manager = StreamManager::new();
        manager.create("cam1").unwrap();
        manager.remove("cam1");
        assert!(manager.create("cam1").is_some());
    }

    #[test]
    fn remove_fires_liveness_signal() {
        let manager = StreamManager::new();
        let handle = manager.create("cam1").unwrap();
        assert!(!handle.liveness.is_cancelled());
        manager.remove("cam1");
        assert!(handle.liveness.is_cancelled());
    }

    #[test]
    fn remove_nonexistent_is_noop() {
        let manager = StreamManager::new();
        manager.remove("nonexistent");
        assert!(manager.list().is_empty());
    }

    #[test]
    fn stream_key_extraction() {
        assert_eq!(extract_stream_key(""), "default");
        assert_eq!(extract_stream_key("/"), "default");
        assert_eq!(extract_stream_key("live/"), "default");
        assert_eq!(extract_stream_key("/live/cam1"), "cam1");
        assert_eq!(extract_stream_key("liveshow"), "liveshow");
        assert_eq!(extract_stream_key("studio/cam1"), "studio/cam1");
    }
}
