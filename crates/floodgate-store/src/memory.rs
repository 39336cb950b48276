//! In-memory implementation of the shared store.
//!
//! Single-process only: suitable for tests and local development, not for a
//! distributed fleet. Semantics track the Redis adapter, including atomic
//! batch commits (one lock held across the whole batch).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use floodgate_types::{SharedStore, StoreBatch, StoreCommand, StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    List(Vec<String>),
    Sorted(Vec<(f64, String)>),
    Set(HashSet<String>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::List(_) => "list",
            Value::Sorted(_) => "sorted set",
            Value::Set(_) => "set",
        }
    }
}

#[derive(Default)]
struct Shard {
    values: HashMap<String, Value>,
}

impl Shard {
    fn int_mut(&mut self, key: &str) -> StoreResult<&mut i64> {
        match self
            .values
            .entry(key.to_string())
            .or_insert(Value::Int(0))
        {
            Value::Int(v) => Ok(v),
            other => Err(StoreError::encoding(
                key,
                format!("expected integer, found {}", other.kind()),
            )),
        }
    }

    fn apply(&mut self, command: StoreCommand) -> StoreResult<()> {
        match command {
            StoreCommand::Incr { key } => {
                *self.int_mut(&key)? += 1;
            }
            StoreCommand::Set { key, value } => {
                self.values.insert(key, Value::Int(value));
            }
            StoreCommand::ZAdd { key, member, score } => {
                let entry = self
                    .values
                    .entry(key.clone())
                    .or_insert_with(|| Value::Sorted(Vec::new()));
                match entry {
                    Value::Sorted(members) => {
                        match members.iter_mut().find(|(_, m)| *m == member) {
                            Some(existing) => existing.0 = score,
                            None => members.push((score, member)),
                        }
                        members.sort_by(|a, b| a.0.total_cmp(&b.0));
                    }
                    other => {
                        return Err(StoreError::encoding(
                            &key,
                            format!("expected sorted set, found {}", other.kind()),
                        ))
                    }
                }
            }
            StoreCommand::ZRemBelow { key, cutoff } => {
                if let Some(Value::Sorted(members)) = self.values.get_mut(&key) {
                    members.retain(|(score, _)| *score > cutoff);
                }
            }
            StoreCommand::RPush { key, value } => {
                let entry = self
                    .values
                    .entry(key.clone())
                    .or_insert_with(|| Value::List(Vec::new()));
                match entry {
                    Value::List(items) => items.push(value),
                    other => {
                        return Err(StoreError::encoding(
                            &key,
                            format!("expected list, found {}", other.kind()),
                        ))
                    }
                }
            }
            StoreCommand::LTrim { key, start, stop } => {
                if let Some(Value::List(items)) = self.values.get_mut(&key) {
                    let len = items.len() as isize;
                    let from = normalize_index(start, len).max(0);
                    let to = normalize_index(stop, len).min(len - 1);
                    *items = if from > to {
                        Vec::new()
                    } else {
                        items[from as usize..=to as usize].to_vec()
                    };
                }
            }
            StoreCommand::SAdd { key, member } => {
                let entry = self
                    .values
                    .entry(key.clone())
                    .or_insert_with(|| Value::Set(HashSet::new()));
                match entry {
                    Value::Set(members) => {
                        members.insert(member);
                    }
                    other => {
                        return Err(StoreError::encoding(
                            &key,
                            format!("expected set, found {}", other.kind()),
                        ))
                    }
                }
            }
            StoreCommand::Del { key } => {
                self.values.remove(&key);
            }
        }
        Ok(())
    }
}

fn normalize_index(index: isize, len: isize) -> isize {
    if index < 0 {
        len + index
    } else {
        index
    }
}

/// Single-process [`SharedStore`] backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Shard>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn commit(&self, batch: StoreBatch) -> StoreResult<()> {
        let mut shard = self.inner.lock();
        for command in batch.into_commands() {
            shard.apply(command)?;
        }
        Ok(())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut shard = self.inner.lock();
        let value = shard.int_mut(key)?;
        *value += 1;
        Ok(*value)
    }

    async fn decr(&self, key: &str) -> StoreResult<i64> {
        let mut shard = self.inner.lock();
        let value = shard.int_mut(key)?;
        *value -= 1;
        Ok(*value)
    }

    async fn get_i64(&self, key: &str) -> StoreResult<Option<i64>> {
        let shard = self.inner.lock();
        match shard.values.get(key) {
            None => Ok(None),
            Some(Value::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(StoreError::encoding(
                key,
                format!("expected integer, found {}", other.kind()),
            )),
        }
    }

    async fn set_i64(&self, key: &str, value: i64) -> StoreResult<()> {
        let mut shard = self.inner.lock();
        shard.values.insert(key.to_string(), Value::Int(value));
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let shard = self.inner.lock();
        match shard.values.get(key) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => {
                let len = items.len() as isize;
                let from = normalize_index(start, len).max(0);
                let to = normalize_index(stop, len).min(len - 1);
                if from > to {
                    Ok(Vec::new())
                } else {
                    Ok(items[from as usize..=to as usize].to_vec())
                }
            }
            Some(other) => Err(StoreError::encoding(
                key,
                format!("expected list, found {}", other.kind()),
            )),
        }
    }

    async fn list_len(&self, key: &str) -> StoreResult<usize> {
        let shard = self.inner.lock();
        match shard.values.get(key) {
            None => Ok(0),
            Some(Value::List(items)) => Ok(items.len()),
            Some(other) => Err(StoreError::encoding(
                key,
                format!("expected list, found {}", other.kind()),
            )),
        }
    }

    async fn window_range(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>> {
        let shard = self.inner.lock();
        match shard.values.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Sorted(members)) => Ok(members
                .iter()
                .filter(|(score, _)| *score >= min && *score <= max)
                .map(|(_, member)| member.clone())
                .collect()),
            Some(other) => Err(StoreError::encoding(
                key,
                format!("expected sorted set, found {}", other.kind()),
            )),
        }
    }

    async fn zset_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let shard = self.inner.lock();
        match shard.values.get(key) {
            None => Ok(None),
            Some(Value::Sorted(members)) => Ok(members
                .iter()
                .find(|(_, m)| m == member)
                .map(|(score, _)| *score)),
            Some(other) => Err(StoreError::encoding(
                key,
                format!("expected sorted set, found {}", other.kind()),
            )),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut shard = self.inner.lock();
        let entry = shard
            .values
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()));
        match entry {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            other => Err(StoreError::encoding(
                key,
                format!("expected set, found {}", other.kind()),
            )),
        }
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let shard = self.inner.lock();
        match shard.values.get(key) {
            None => Ok(false),
            Some(Value::Set(members)) => Ok(members.contains(member)),
            Some(other) => Err(StoreError::encoding(
                key,
                format!("expected set, found {}", other.kind()),
            )),
        }
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let shard = self.inner.lock();
        match shard.values.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(other) => Err(StoreError::encoding(
                key,
                format!("expected set, found {}", other.kind()),
            )),
        }
    }
}
