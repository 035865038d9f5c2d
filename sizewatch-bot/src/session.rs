//! In-memory selection sessions and their store.
//!
//! One session exists per (chat, product) pair while the user is picking
//! sizes. The store is the only shared mutable state in the bot; all
//! mutation goes through [`SessionStore::mutate`], which runs under the
//! per-key shard lock so concurrent button presses on the same session
//! cannot lose updates.

use dashmap::DashMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Key of one selection session: a (chat, product) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: i64,
    pub product_id: String,
}

impl SessionKey {
    pub fn new(chat_id: i64, product_id: impl Into<String>) -> Self {
        Self {
            chat_id,
            product_id: product_id.into(),
        }
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The user is toggling sizes.
    Selecting,
    /// A confirm call to the tracker service is in flight.
    Confirming,
}

/// One in-progress size-selection interaction.
///
/// `sizes` keeps the order the catalog supplied at creation; it is the
/// canonical display order and is never re-sorted. `selected` is only
/// reachable through [`Session::toggle`], which keeps it a subset of
/// `sizes`.
#[derive(Debug, Clone)]
pub struct Session {
    pub chat_id: i64,
    pub product_id: String,
    pub product_url: String,
    pub name: String,
    pub status: SessionStatus,
    sizes: Vec<String>,
    selected: HashSet<String>,
    created_at: Instant,
}

impl Session {
    pub fn new(
        chat_id: i64,
        product_id: impl Into<String>,
        product_url: impl Into<String>,
        name: impl Into<String>,
        sizes: Vec<String>,
    ) -> Self {
        Self {
            chat_id,
            product_id: product_id.into(),
            product_url: product_url.into(),
            name: name.into(),
            status: SessionStatus::Selecting,
            sizes,
            selected: HashSet::new(),
            created_at: Instant::now(),
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.chat_id, self.product_id.clone())
    }

    /// Size labels in canonical display order.
    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    pub fn is_selected(&self, size: &str) -> bool {
        self.selected.contains(size)
    }

    /// Flip membership of `size` in the selection.
    ///
    /// Returns `false` without mutating anything when the label is not one
    /// of this session's sizes, so `selected` stays a subset of `sizes`.
    pub fn toggle(&mut self, size: &str) -> bool {
        if !self.sizes.iter().any(|s| s == size) {
            return false;
        }
        if !self.selected.remove(size) {
            self.selected.insert(size.to_string());
        }
        true
    }

    /// Selected sizes in canonical display order.
    pub fn selected_in_order(&self) -> Vec<String> {
        self.sizes
            .iter()
            .filter(|s| self.selected.contains(*s))
            .cloned()
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Creation instant. Distinguishes this session from one that later
    /// superseded it under the same key.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Keyed storage of active selection sessions.
///
/// Initialized once at startup and shared behind an `Arc`; never torn down
/// mid-process.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionKey, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the session under `key`, if any.
    pub fn get(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.get(key).map(|entry| entry.clone())
    }

    /// Insert a session, unconditionally replacing any prior session under
    /// the same key (supersede, never merge).
    pub fn put(&self, session: Session) {
        self.sessions.insert(session.key(), session);
    }

    pub fn remove(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.remove(key).map(|(_, session)| session)
    }

    /// Remove the session under `key` only when `pred` holds for it.
    ///
    /// Lets the confirm path delete exactly the session it snapshotted,
    /// leaving a session that superseded it mid-flight untouched.
    pub fn remove_if(
        &self,
        key: &SessionKey,
        pred: impl FnOnce(&Session) -> bool,
    ) -> Option<Session> {
        self.sessions
            .remove_if(key, |_, session| pred(session))
            .map(|(_, session)| session)
    }

    /// Apply a transformation to the session under `key` atomically.
    ///
    /// The closure runs while the per-key shard lock is held, so two
    /// near-simultaneous toggles on the same session serialize instead of
    /// losing one update. Absent key: the closure is not invoked and `None`
    /// is returned. Keep the closure cheap; never call out to the network
    /// from inside it.
    pub fn mutate<T>(&self, key: &SessionKey, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.sessions.get_mut(key).map(|mut entry| f(&mut entry))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict sessions created more than `ttl` ago. Returns how many were
    /// removed. Age is measured from creation; button presses do not
    /// extend it.
    ///
    /// Sessions with a confirm in flight are left alone; the confirm path
    /// removes or resets them itself.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.status == SessionStatus::Confirming || session.age() < ttl);
        before - self.sessions.len()
    }
}
