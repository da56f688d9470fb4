//! In-process sorted-set store with Redis semantics
//!
//! Compiled for tests only (enable the `test-util` feature to use it from
//! other crates). Reproduces what the agent and the exporter depend on:
//! member collapse on re-insert, (score, member) ordering, glob key scans.

use super::{SortedSetStore, StoreError};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sets: Arc<RwLock<BTreeMap<String, HashMap<String, f64>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries under `key`, ascending by (score, member)
    pub async fn entries(&self, key: &str) -> Vec<(String, f64)> {
        let sets = self.sets.read().await;
        sets.get(key).map(sorted_entries).unwrap_or_default()
    }

    /// Number of keys held
    pub async fn key_count(&self) -> usize {
        self.sets.read().await.len()
    }
}

fn sorted_entries(set: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = set
        .iter()
        .map(|(member, score)| (member.clone(), *score))
        .collect();
    entries.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    entries
}

#[async_trait]
impl SortedSetStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut sets = self.sets.write().await;
        sets.entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>), StoreError> {
        let sets = self.sets.read().await;
        let count = count.max(1);
        let start = cursor as usize;

        let keys = sets
            .keys()
            .skip(start)
            .take(count)
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();

        let end = start + count;
        let next = if end >= sets.len() { 0 } else { end as u64 };
        Ok((next, keys))
    }

    async fn zrange_from_score(
        &self,
        key: &str,
        min: f64,
        count: usize,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let sets = self.sets.read().await;
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };

        Ok(sorted_entries(set)
            .into_iter()
            .filter(|(_, score)| *score >= min)
            .take(count)
            .collect())
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[^a-z]` and `\` escapes
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text)
}

fn match_from(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => {
            let rest = &p[1..];
            if rest.first() == Some(&'*') {
                return match_from(rest, t);
            }
            (0..=t.len()).any(|skip| match_from(rest, &t[skip..]))
        }
        Some('?') => !t.is_empty() && match_from(&p[1..], &t[1..]),
        Some('[') => {
            let Some(&c) = t.first() else {
                return false;
            };
            match match_class(&p[1..], c) {
                Some((matched, consumed)) => matched && match_from(&p[1 + consumed..], &t[1..]),
                // Unterminated class: '[' is literal
                None => c == '[' && match_from(&p[1..], &t[1..]),
            }
        }
        Some('\\') if p.len() > 1 => {
            !t.is_empty() && t[0] == p[1] && match_from(&p[2..], &t[1..])
        }
        Some(&literal) => !t.is_empty() && t[0] == literal && match_from(&p[1..], &t[1..]),
    }
}

/// Match `c` against a class body (after `[`). Returns whether it matched
/// and how many pattern chars the class used, including the closing `]`.
fn match_class(p: &[char], c: char) -> Option<(bool, usize)> {
    let negate = p.first() == Some(&'^');
    let mut i = usize::from(negate);
    let mut matched = false;

    while i < p.len() {
        match p[i] {
            ']' => return Some((matched != negate, i + 1)),
            '\\' if i + 1 < p.len() => {
                matched |= p[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' => {
                let hi = p[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= lo <= c && c <= hi;
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }
    None
}
