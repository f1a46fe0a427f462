//! In-memory model of the pinned map store.
//!
//! [`MemoryBackend`] answers the same calls as the real helper and fails
//! the same way: missing pins, duplicate pins, missing keys and full tables
//! come back as `Store` errors carrying the helper's wording, and unlinking
//! a missing object fails like the `unlink` executable does. Every call is
//! counted so tests can assert that validation stopped a request before
//! anything was "spawned".

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use fwd_bpfmap::command::BPFFS_ROOT;
use fwd_bpfmap::hex::encode_token;
use fwd_bpfmap::spec::BPF_OBJ_NAME_LEN;
use fwd_bpfmap::{
    DumpEntry, ExecContext, MapError, MapInfo, MapKind, MapBackend, MapResult, NextKey,
    TableSpec, UpdatePolicy,
};

const ENOENT: &str = "No such file or directory";
const EEXIST: &str = "File exists";
const E2BIG: &str = "Argument list too long";
const EINVAL: &str = "Invalid argument";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stored {
    Bytes(Vec<u8>),
    Inner(u32),
}

#[derive(Debug)]
struct Pinned {
    id: u32,
    spec: TableSpec,
    entries: BTreeMap<Vec<u8>, Stored>,
}

impl Pinned {
    fn new(id: u32, spec: TableSpec) -> Self {
        let mut entries = BTreeMap::new();
        // Array slots always exist, zero-filled.
        if spec.kind() == MapKind::Array {
            for index in 0..spec.max_entries() {
                entries.insert(
                    index.to_le_bytes().to_vec(),
                    Stored::Bytes(vec![0; spec.value_size()]),
                );
            }
        }
        Self { id, spec, entries }
    }

    /// Listing entry. The kernel keeps at most `BPF_OBJ_NAME_LEN - 1`
    /// bytes of the object name.
    fn info(&self) -> MapInfo {
        MapInfo {
            id: self.id,
            map_type: self.spec.kind().as_str().to_string(),
            name: self
                .spec
                .name()
                .chars()
                .take(BPF_OBJ_NAME_LEN - 1)
                .collect(),
            flags: self.spec.flags(),
            bytes_key: self.spec.key_size(),
            bytes_value: self.spec.value_size(),
            max_entries: self.spec.max_entries(),
            bytes_memlock: 4096,
            frozen: 0,
            btf_id: 0,
            pids: Vec::new(),
        }
    }

    fn dump_entry(key: &[u8], stored: &Stored) -> DumpEntry {
        let key = key.iter().copied().map(encode_token).collect();
        match stored {
            Stored::Bytes(value) => DumpEntry {
                key,
                value: Some(value.iter().copied().map(encode_token).collect()),
                inner_map_id: None,
            },
            Stored::Inner(id) => DumpEntry {
                key,
                value: None,
                inner_map_id: Some(*id),
            },
        }
    }

    fn check_key(&self, key: &[u8]) -> Result<(), String> {
        if key.len() != self.spec.key_size() {
            return Err(format!(
                "key expected {} bytes got {}",
                self.spec.key_size(),
                key.len()
            ));
        }
        Ok(())
    }

    fn write(&mut self, key: &[u8], stored: Stored, policy: UpdatePolicy) -> Result<(), String> {
        self.check_key(key)?;
        if let Stored::Bytes(value) = &stored {
            if value.len() != self.spec.value_size() {
                return Err(format!(
                    "value expected {} bytes got {}",
                    self.spec.value_size(),
                    value.len()
                ));
            }
        }

        let present = self.entries.contains_key(key);
        match policy {
            UpdatePolicy::Exist if !present => return Err(format!("update failed: {}", ENOENT)),
            UpdatePolicy::NoExist if present => return Err(format!("update failed: {}", EEXIST)),
            _ => {}
        }

        if !present {
            if self.spec.kind() == MapKind::Array {
                return Err(format!("update failed: {}", E2BIG));
            }
            if self.entries.len() >= self.spec.max_entries() as usize {
                if self.spec.kind() != MapKind::LruHash {
                    return Err(format!("update failed: {}", E2BIG));
                }
                let victim = self.entries.keys().next().cloned();
                if let Some(victim) = victim {
                    self.entries.remove(&victim);
                }
            }
        }
        self.entries.insert(key.to_vec(), stored);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Store {
    pinned: BTreeMap<String, Pinned>,
    last_id: u32,
    calls: Vec<String>,
}

impl Store {
    fn get(&self, name: &str) -> Result<&Pinned, String> {
        self.pinned
            .get(name)
            .ok_or_else(|| format!("bpf obj get ({}): {}", pin_path(name), ENOENT))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Pinned, String> {
        self.pinned
            .get_mut(name)
            .ok_or_else(|| format!("bpf obj get ({}): {}", pin_path(name), ENOENT))
    }

    fn pin(&mut self, spec: &TableSpec) -> Result<(), String> {
        if self.pinned.contains_key(spec.name()) {
            return Err(format!(
                "can't pin the object ({}): {}",
                pin_path(spec.name()),
                EEXIST
            ));
        }
        self.last_id += 1;
        let id = self.last_id;
        self.pinned
            .insert(spec.name().to_string(), Pinned::new(id, spec.clone()));
        Ok(())
    }
}

fn pin_path(name: &str) -> String {
    format!("{}/{}", BPFFS_ROOT, name)
}

/// In-memory [`MapBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
    fail_list: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `list` call fail as if the helper crashed.
    pub fn set_list_failure(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Number of helper invocations so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Verbs of every helper invocation, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Names of the currently pinned objects.
    pub fn pinned_names(&self) -> Vec<String> {
        self.lock().pinned.keys().cloned().collect()
    }

    /// Number of entries in a pinned table, if it exists.
    pub fn entry_count(&self, name: &str) -> Option<usize> {
        self.lock().pinned.get(name).map(|p| p.entries.len())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        // A panicking test must not poison the model for the rest of the run.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records the call and applies `op` to the store, mapping a plain
    /// error string to the helper's `{"error": ...}` payload.
    fn call<T>(
        &self,
        ctx: &ExecContext,
        command: String,
        op: impl FnOnce(&mut Store) -> Result<T, String>,
    ) -> MapResult<T> {
        let mut store = self.lock();
        store.calls.push(command.clone());
        tracing::debug!(trace_id = %ctx.trace_id(), command = %command, "Memory backend call");
        if ctx.cancel_token().is_cancelled() {
            return Err(MapError::Cancelled { command });
        }
        op(&mut store).map_err(|message| MapError::store(command, message))
    }
}

#[async_trait]
impl MapBackend for MemoryBackend {
    async fn list(&self, ctx: &ExecContext) -> MapResult<Vec<MapInfo>> {
        let fail = self.fail_list.load(Ordering::SeqCst);
        let maps = self.call(ctx, "show".to_string(), |s| {
            Ok(s.pinned.values().map(Pinned::info).collect::<Vec<_>>())
        })?;
        if fail {
            return Err(MapError::execution("show", "exit status 1: helper crashed"));
        }
        Ok(maps)
    }

    async fn create(&self, ctx: &ExecContext, spec: &TableSpec) -> MapResult<()> {
        self.call(ctx, format!("create {}", spec.name()), |s| {
            // Map-of-maps needs an inner map template.
            if spec.kind().is_map_in_map() {
                return Err(format!("map create failed: {}", EINVAL));
            }
            s.pin(spec)
        })
    }

    async fn create_nested(
        &self,
        ctx: &ExecContext,
        spec: &TableSpec,
        inner: &str,
    ) -> MapResult<()> {
        self.call(ctx, format!("create {}", spec.name()), |s| {
            s.get(inner)?;
            s.pin(spec)
        })
    }

    async fn dump(&self, ctx: &ExecContext, name: &str) -> MapResult<Vec<DumpEntry>> {
        self.call(ctx, format!("dump {}", name), |s| {
            let pinned = s.get(name)?;
            Ok(pinned
                .entries
                .iter()
                .map(|(k, v)| Pinned::dump_entry(k, v))
                .collect())
        })
    }

    async fn lookup(&self, ctx: &ExecContext, name: &str, key: &[u8]) -> MapResult<DumpEntry> {
        self.call(ctx, format!("lookup {}", name), |s| {
            let pinned = s.get(name)?;
            pinned.check_key(key)?;
            pinned
                .entries
                .get(key)
                .map(|v| Pinned::dump_entry(key, v))
                .ok_or_else(|| format!("can't lookup element: {}", ENOENT))
        })
    }

    async fn next_key(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: Option<&[u8]>,
    ) -> MapResult<NextKey> {
        self.call(ctx, format!("getnext {}", name), |s| {
            let pinned = s.get(name)?;
            let next = match key {
                Some(key) => {
                    pinned.check_key(key)?;
                    pinned
                        .entries
                        .range::<[u8], _>((
                            std::ops::Bound::Excluded(key),
                            std::ops::Bound::Unbounded,
                        ))
                        .next()
                }
                None => pinned.entries.iter().next(),
            };
            let (next, _) = next.ok_or_else(|| format!("can't get next key: {}", ENOENT))?;
            Ok(NextKey {
                key: key.map(|k| k.iter().copied().map(encode_token).collect()),
                next_key: next.iter().copied().map(encode_token).collect(),
            })
        })
    }

    async fn update(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: &[u8],
        value: &[u8],
        policy: UpdatePolicy,
    ) -> MapResult<()> {
        self.call(ctx, format!("update {}", name), |s| {
            s.get_mut(name)?
                .write(key, Stored::Bytes(value.to_vec()), policy)
        })
    }

    async fn update_nested(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: &[u8],
        inner: &str,
        policy: UpdatePolicy,
    ) -> MapResult<()> {
        self.call(ctx, format!("update {}", name), |s| {
            let inner_id = s.get(inner)?.id;
            let outer = s.get_mut(name)?;
            if !outer.spec.kind().is_map_in_map() {
                return Err(format!("update failed: {}", EINVAL));
            }
            outer.write(key, Stored::Inner(inner_id), policy)
        })
    }

    async fn delete(&self, ctx: &ExecContext, name: &str, key: &[u8]) -> MapResult<()> {
        self.call(ctx, format!("delete {}", name), |s| {
            let pinned = s.get_mut(name)?;
            pinned.check_key(key)?;
            if pinned.spec.kind() == MapKind::Array {
                return Err(format!("delete failed: {}", EINVAL));
            }
            pinned
                .entries
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| format!("delete failed: {}", ENOENT))
        })
    }

    async fn unlink(&self, ctx: &ExecContext, name: &str) -> MapResult<()> {
        let command = format!("unlink {}", pin_path(name));
        let removed = self.call(ctx, command.clone(), |s| Ok(s.pinned.remove(name).is_some()))?;
        if removed {
            Ok(())
        } else {
            Err(MapError::execution(
                command,
                format!(
                    "exit status 1: unlink: cannot unlink '{}': {}",
                    pin_path(name),
                    ENOENT
                ),
            ))
        }
    }
}
