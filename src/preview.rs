use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::ocr::ParsedProblem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub owner: String,
    pub problem: ParsedProblem,
}

struct PreviewEntry {
    preview: Preview,
    expires_at: Instant,
}

/// Short-lived store for OCR previews awaiting confirmation.
///
/// Every key is redeemable once: `take` removes the entry under the same lock
/// that reads it.
pub struct PreviewCache {
    entries: Mutex<HashMap<String, PreviewEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl PreviewCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&self, owner: &str, problem: ParsedProblem) -> String {
        self.insert_at(owner, problem, Instant::now())
    }

    pub fn take(&self, key: &str) -> Option<Preview> {
        self.take_at(key, Instant::now())
    }

    /// Puts a redeemed preview back under its key with a fresh TTL.
    pub fn restore(&self, key: &str, preview: Preview) {
        let expires_at = Instant::now() + self.ttl;
        self.lock()
            .insert(key.to_string(), PreviewEntry { preview, expires_at });
    }

    pub fn peek(&self, key: &str) -> Option<Preview> {
        let now = Instant::now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.preview.clone())
    }

    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        purge(&mut entries, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(&self, owner: &str, problem: ParsedProblem, now: Instant) -> String {
        let key = uuid::Uuid::new_v4().to_string();
        let mut entries = self.lock();
        purge(&mut entries, now);
        while entries.len() >= self.capacity {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            debug!("preview cache full; evicting {}", oldest);
            entries.remove(&oldest);
        }
        entries.insert(
            key.clone(),
            PreviewEntry {
                preview: Preview {
                    owner: owner.to_string(),
                    problem,
                },
                expires_at: now + self.ttl,
            },
        );
        key
    }

    fn take_at(&self, key: &str, now: Instant) -> Option<Preview> {
        let entry = self.lock().remove(key)?;
        if entry.expires_at <= now {
            return None;
        }
        Some(entry.preview)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PreviewEntry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn purge(entries: &mut HashMap<String, PreviewEntry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn problem(stem: &str) -> ParsedProblem {
        ParsedProblem {
            stem: stem.to_string(),
            choices: vec!["① a".to_string()],
        }
    }

    #[test]
    fn take_redeems_once() {
        let cache = PreviewCache::new(Duration::from_secs(60), 8);
        let key = cache.insert("alice", problem("q"));
        let first = cache.take(&key).expect("first take");
        assert_eq!(first.owner, "alice");
        assert_eq!(first.problem, problem("q"));
        assert!(cache.take(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn peek_does_not_consume() {
        let cache = PreviewCache::new(Duration::from_secs(60), 8);
        let key = cache.insert("alice", problem("q"));
        assert!(cache.peek(&key).is_some());
        assert!(cache.take(&key).is_some());
    }

    #[test]
    fn expired_entries_are_not_redeemable() {
        let cache = PreviewCache::new(Duration::from_secs(30), 8);
        let start = Instant::now();
        let key = cache.insert_at("alice", problem("q"), start);
        assert!(cache.take_at(&key, start + Duration::from_secs(31)).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn insert_purges_expired_entries() {
        let cache = PreviewCache::new(Duration::from_secs(10), 8);
        let start = Instant::now();
        cache.insert_at("a", problem("old"), start);
        cache.insert_at("b", problem("new"), start + Duration::from_secs(11));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_evicts_soonest_to_expire() {
        let cache = PreviewCache::new(Duration::from_secs(60), 2);
        let start = Instant::now();
        let first = cache.insert_at("a", problem("1"), start);
        let second = cache.insert_at("a", problem("2"), start + Duration::from_secs(1));
        let third = cache.insert_at("a", problem("3"), start + Duration::from_secs(2));
        assert_eq!(cache.len(), 2);
        assert!(cache.take_at(&first, start).is_none());
        assert!(cache.take_at(&second, start).is_some());
        assert!(cache.take_at(&third, start).is_some());
    }

    #[test]
    fn restored_preview_is_redeemable_again() {
        let cache = PreviewCache::new(Duration::from_secs(60), 8);
        let key = cache.insert("alice", problem("q"));
        let preview = cache.take(&key).expect("take");
        cache.restore(&key, preview);
        let again = cache.take(&key).expect("take after restore");
        assert_eq!(again.owner, "alice");
        assert!(cache.take(&key).is_none());
    }

    #[test]
    fn purge_expired_keeps_live_entries() {
        let stale = PreviewCache::new(Duration::ZERO, 8);
        stale.insert("alice", problem("q"));
        assert_eq!(stale.purge_expired(), 1);
        assert!(stale.is_empty());

        let live = PreviewCache::new(Duration::from_secs(60), 8);
        live.insert("alice", problem("q"));
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn concurrent_takes_redeem_at_most_once() {
        let cache = Arc::new(PreviewCache::new(Duration::from_secs(60), 8));
        let key = cache.insert("alice", problem("q"));
        let handles = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let key = key.clone();
                std::thread::spawn(move || cache.take(&key).is_some())
            })
            .collect::<Vec<_>>();
        let redeemed = handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .filter(|taken| *taken)
            .count();
        assert_eq!(redeemed, 1);
    }
}
