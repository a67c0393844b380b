use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use chrono::{DateTime, Utc};

/// Clients currently holding an open tool-listing stream.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<HashMap<String, ClientInfo>>>,
    next_seq: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub connected_at: DateTime<Utc>,
    seq: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client_id`, replacing any earlier stream with the same id.
    /// The entry is removed when the returned guard drops.
    pub fn register(&self, client_id: String) -> ClientGuard {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let previous = self.lock().insert(
            client_id.clone(),
            ClientInfo {
                connected_at: Utc::now(),
                seq,
            },
        );
        if previous.is_some() {
            tracing::debug!(client_id, "replacing existing client stream");
        }
        tracing::info!(client_id, "client connected");
        ClientGuard {
            registry: self.clone(),
            client_id,
            seq,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.lock().contains_key(client_id)
    }

    fn remove(&self, client_id: &str, seq: u64) {
        let mut guard = self.lock();
        // A newer stream may have taken over this id.
        if guard.get(client_id).is_some_and(|c| c.seq == seq) {
            if let Some(info) = guard.remove(client_id) {
                let connected_ms = (Utc::now() - info.connected_at).num_milliseconds();
                tracing::info!(client_id, connected_ms, "client removed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientInfo>> {
        // The map stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct ClientGuard {
    registry: ClientRegistry,
    client_id: String,
    seq: u64,
}

impl ClientGuard {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.client_id, self.seq);
    }
}
