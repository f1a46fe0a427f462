//! Table client facade.
//!
//! A [`Table`] binds one validated [`TableSpec`] to a [`MapBackend`]. It
//! keeps no state about the pinned object: every call asks the store, so
//! the store stays the only source of truth. Key and value lengths are
//! checked before the backend is touched.
//!
//! Calls are not serialized. Two callers doing "check, create, update" on
//! the same name race at the store.

use std::sync::Arc;

use crate::backend::MapBackend;
use crate::command::UpdatePolicy;
use crate::error::{MapError, MapResult};
use crate::exec::ExecContext;
use crate::hex::decode_tokens;
use crate::output::DumpEntry;
use crate::spec::{validate_name, TableSpec};

/// One decoded table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kv {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Kv {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Client for one pinned table.
#[derive(Clone)]
pub struct Table {
    backend: Arc<dyn MapBackend>,
    spec: TableSpec,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("spec", &self.spec).finish()
    }
}

impl Table {
    pub fn new(backend: Arc<dyn MapBackend>, spec: TableSpec) -> Self {
        Self { backend, spec }
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// Creates the pinned table. Fails with the store's error if it exists.
    ///
    /// Map-in-map tables need an inner template; use [`Table::create_in_map`].
    pub async fn create(&self, ctx: &ExecContext) -> MapResult<()> {
        if self.spec.kind().is_map_in_map() {
            return Err(MapError::config(
                "map_type",
                format!("'{}' is a map-in-map table and needs an inner map", self.name()),
            ));
        }
        tracing::info!(trace_id = %ctx.trace_id(), table = %self.name(), kind = %self.spec.kind(), "Creating table");
        self.backend.create(ctx, &self.spec).await
    }

    /// Creates a map-of-maps table using the pinned map `inner` as template.
    pub async fn create_in_map(&self, ctx: &ExecContext, inner: &str) -> MapResult<()> {
        self.require_map_in_map()?;
        validate_name(inner)?;
        tracing::info!(trace_id = %ctx.trace_id(), table = %self.name(), inner = %inner, "Creating map-in-map table");
        self.backend.create_nested(ctx, &self.spec, inner).await
    }

    /// Reports whether the pinned name appears in the store's listing.
    pub async fn try_exists(&self, ctx: &ExecContext) -> MapResult<bool> {
        let maps = self.backend.list(ctx).await?;
        Ok(maps.iter().any(|m| m.name == self.name()))
    }

    /// Same as [`Table::try_exists`], but a failed listing counts as
    /// "exists" so that callers never create a duplicate. The real failure
    /// then surfaces from whatever call follows.
    pub async fn exists(&self, ctx: &ExecContext) -> bool {
        match self.try_exists(ctx).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    trace_id = %ctx.trace_id(),
                    table = %self.name(),
                    error = %e,
                    "Existence check failed, assuming table exists"
                );
                true
            }
        }
    }

    /// Upserts one entry.
    pub async fn update(&self, ctx: &ExecContext, key: &[u8], value: &[u8]) -> MapResult<()> {
        self.update_with_policy(ctx, key, value, UpdatePolicy::Any)
            .await
    }

    /// Writes one entry with an explicit policy.
    pub async fn update_with_policy(
        &self,
        ctx: &ExecContext,
        key: &[u8],
        value: &[u8],
        policy: UpdatePolicy,
    ) -> MapResult<()> {
        self.check_key(key)?;
        MapError::check_size("value", self.spec.value_size(), value.len())?;
        self.backend
            .update(ctx, self.name(), key, value, policy)
            .await
    }

    /// Stores a reference to the pinned map `inner` under `key`.
    pub async fn update_in_map(&self, ctx: &ExecContext, key: &[u8], inner: &str) -> MapResult<()> {
        self.require_map_in_map()?;
        self.check_key(key)?;
        validate_name(inner)?;
        self.backend
            .update_nested(ctx, self.name(), key, inner, UpdatePolicy::Any)
            .await
    }

    /// Returns every entry, or nothing when the table is absent.
    ///
    /// Entry order is whatever the store reports and is not stable.
    pub async fn query(&self, ctx: &ExecContext) -> MapResult<Vec<Kv>> {
        if !self.exists(ctx).await {
            tracing::debug!(trace_id = %ctx.trace_id(), table = %self.name(), "Table absent, empty query");
            return Ok(Vec::new());
        }
        let entries = self.backend.dump(ctx, self.name()).await?;
        let kvs = entries
            .into_iter()
            .map(|e| self.decode_entry(e))
            .collect::<MapResult<Vec<_>>>()?;
        tracing::debug!(trace_id = %ctx.trace_id(), table = %self.name(), entries = kvs.len(), "Queried table");
        Ok(kvs)
    }

    /// Returns the entry stored under `key`.
    pub async fn lookup(&self, ctx: &ExecContext, key: &[u8]) -> MapResult<Kv> {
        self.check_key(key)?;
        let entry = self.backend.lookup(ctx, self.name(), key).await?;
        self.decode_entry(entry)
    }

    /// Returns the key after `key`, or the first key for `None`.
    ///
    /// Past the last key the store answers with an error, which is returned
    /// as is.
    pub async fn next_key(&self, ctx: &ExecContext, key: Option<&[u8]>) -> MapResult<Vec<u8>> {
        if let Some(key) = key {
            self.check_key(key)?;
        }
        let next = self.backend.next_key(ctx, self.name(), key).await?;
        decode_tokens(&next.next_key, self.spec.key_size())
            .map_err(|e| MapError::execution(format!("getnext {}", self.name()), e.to_string()))
    }

    /// Removes one key. A missing key is reported by the store, not hidden.
    pub async fn delete(&self, ctx: &ExecContext, key: &[u8]) -> MapResult<()> {
        self.check_key(key)?;
        self.backend.delete(ctx, self.name(), key).await
    }

    /// Unlinks the pinned object. Every failure is returned, including
    /// an already absent table.
    pub async fn gc(&self, ctx: &ExecContext) -> MapResult<()> {
        tracing::info!(trace_id = %ctx.trace_id(), table = %self.name(), "Unlinking table");
        self.backend.unlink(ctx, self.name()).await
    }

    fn check_key(&self, key: &[u8]) -> MapResult<()> {
        MapError::check_size("key", self.spec.key_size(), key.len())
    }

    fn require_map_in_map(&self) -> MapResult<()> {
        if self.spec.kind().is_map_in_map() {
            Ok(())
        } else {
            Err(MapError::config(
                "map_type",
                format!("'{}' is a {} table, not a map-in-map", self.name(), self.spec.kind()),
            ))
        }
    }

    fn decode_entry(&self, entry: DumpEntry) -> MapResult<Kv> {
        let context = || format!("dump {}", self.name());
        let key = decode_tokens(&entry.key, self.spec.key_size())
            .map_err(|e| MapError::execution(context(), format!("key: {}", e)))?;
        let value = match (entry.value, entry.inner_map_id) {
            (Some(tokens), _) => decode_tokens(&tokens, self.spec.value_size())
                .map_err(|e| MapError::execution(context(), format!("value: {}", e)))?,
            (None, Some(id)) => id.to_le_bytes().to_vec(),
            (None, None) => {
                return Err(MapError::execution(
                    context(),
                    "entry carries neither value nor inner_map_id",
                ))
            }
        };
        Ok(Kv { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MapInfo, NextKey};
    use crate::spec::MapKind;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Backend that serves canned replies and records what was called.
    #[derive(Default)]
    struct Canned {
        maps: Vec<MapInfo>,
        list_fails: bool,
        dump: Vec<DumpEntry>,
        calls: Mutex<Vec<String>>,
    }

    impl Canned {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MapBackend for Canned {
        async fn list(&self, _: &ExecContext) -> MapResult<Vec<MapInfo>> {
            self.record("list");
            if self.list_fails {
                return Err(MapError::execution("bpftool -j map show", "exit status 1"));
            }
            Ok(self.maps.clone())
        }
        async fn create(&self, _: &ExecContext, _: &TableSpec) -> MapResult<()> {
            self.record("create");
            Ok(())
        }
        async fn create_nested(&self, _: &ExecContext, _: &TableSpec, _: &str) -> MapResult<()> {
            self.record("create_nested");
            Ok(())
        }
        async fn dump(&self, _: &ExecContext, _: &str) -> MapResult<Vec<DumpEntry>> {
            self.record("dump");
            Ok(self.dump.clone())
        }
        async fn lookup(&self, _: &ExecContext, _: &str, _: &[u8]) -> MapResult<DumpEntry> {
            self.record("lookup");
            self.dump
                .first()
                .cloned()
                .ok_or_else(|| MapError::store("lookup", "No such file or directory"))
        }
        async fn next_key(&self, _: &ExecContext, _: &str, _: Option<&[u8]>) -> MapResult<NextKey> {
            self.record("next_key");
            Ok(NextKey {
                key: None,
                next_key: vec!["0x1".into(), "0x0".into(), "0x0".into(), "0x0".into()],
            })
        }
        async fn update(
            &self,
            _: &ExecContext,
            _: &str,
            _: &[u8],
            _: &[u8],
            _: UpdatePolicy,
        ) -> MapResult<()> {
            self.record("update");
            Ok(())
        }
        async fn update_nested(
            &self,
            _: &ExecContext,
            _: &str,
            _: &[u8],
            _: &str,
            _: UpdatePolicy,
        ) -> MapResult<()> {
            self.record("update_nested");
            Ok(())
        }
        async fn delete(&self, _: &ExecContext, _: &str, _: &[u8]) -> MapResult<()> {
            self.record("delete");
            Ok(())
        }
        async fn unlink(&self, _: &ExecContext, _: &str) -> MapResult<()> {
            self.record("unlink");
            Ok(())
        }
    }

    fn info(name: &str) -> MapInfo {
        MapInfo {
            id: 1,
            map_type: "hash".to_string(),
            name: name.to_string(),
            flags: 1,
            bytes_key: 4,
            bytes_value: 4,
            max_entries: 8,
            bytes_memlock: 0,
            frozen: 0,
            btf_id: 0,
            pids: Vec::new(),
        }
    }

    fn tokens(bytes: &[u8]) -> Vec<String> {
        bytes.iter().map(|b| format!("0x{:x}", b)).collect()
    }

    fn table(backend: Arc<Canned>, kind: MapKind, key: usize, value: usize) -> Table {
        Table::new(backend, TableSpec::new("t1", kind, key, value, 8).unwrap())
    }

    fn ctx() -> ExecContext {
        ExecContext::new("test")
    }

    #[tokio::test]
    async fn test_size_mismatch_never_reaches_backend() {
        let backend = Arc::new(Canned::default());
        let t = table(backend.clone(), MapKind::Hash, 4, 4);

        let err = t.update(&ctx(), &[1, 2, 3], &[0; 4]).await.unwrap_err();
        assert_eq!(err.to_string(), "key length is 3, table expects 4");
        let err = t.update(&ctx(), &[0; 4], &[0; 5]).await.unwrap_err();
        assert_eq!(err.to_string(), "value length is 5, table expects 4");
        assert!(t.delete(&ctx(), &[0; 2]).await.is_err());
        assert!(t.lookup(&ctx(), &[0; 8]).await.is_err());

        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_exists_matches_pinned_name() {
        let backend = Arc::new(Canned {
            maps: vec![info("other"), info("t1")],
            ..Default::default()
        });
        assert!(table(backend, MapKind::Hash, 4, 4).exists(&ctx()).await);

        let backend = Arc::new(Canned {
            maps: vec![info("other")],
            ..Default::default()
        });
        let t = table(backend, MapKind::Hash, 4, 4);
        assert!(!t.exists(&ctx()).await);
        assert!(!t.try_exists(&ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_fails_safe() {
        let backend = Arc::new(Canned {
            list_fails: true,
            ..Default::default()
        });
        let t = table(backend, MapKind::Hash, 4, 4);
        assert!(t.exists(&ctx()).await);
        assert!(t.try_exists(&ctx()).await.unwrap_err().is_execution());
    }

    #[tokio::test]
    async fn test_query_absent_table_is_empty() {
        let backend = Arc::new(Canned::default());
        let t = table(backend.clone(), MapKind::Hash, 4, 4);
        assert!(t.query(&ctx()).await.unwrap().is_empty());
        assert_eq!(backend.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_query_decodes_entries() {
        let backend = Arc::new(Canned {
            maps: vec![info("t1")],
            dump: vec![DumpEntry {
                key: tokens(&[0x12, 0x34, 0x56, 0x78]),
                value: Some(tokens(&[0x87, 0x65, 0x43, 0x21])),
                inner_map_id: None,
            }],
            ..Default::default()
        });
        let t = table(backend, MapKind::Hash, 4, 4);
        assert_eq!(
            t.query(&ctx()).await.unwrap(),
            vec![Kv::new([0x12, 0x34, 0x56, 0x78], [0x87, 0x65, 0x43, 0x21])]
        );
    }

    #[tokio::test]
    async fn test_query_rejects_wrong_width_entry() {
        let backend = Arc::new(Canned {
            maps: vec![info("t1")],
            dump: vec![DumpEntry {
                key: tokens(&[0x12, 0x34]),
                value: Some(tokens(&[0, 0, 0, 0])),
                inner_map_id: None,
            }],
            ..Default::default()
        });
        let err = table(backend, MapKind::Hash, 4, 4)
            .query(&ctx())
            .await
            .unwrap_err();
        assert!(err.is_execution());
    }

    #[tokio::test]
    async fn test_map_in_map_value_is_inner_id() {
        let backend = Arc::new(Canned {
            maps: vec![info("t1")],
            dump: vec![DumpEntry {
                key: tokens(&[0x61, 0x00]),
                value: None,
                inner_map_id: Some(0x0102),
            }],
            ..Default::default()
        });
        let t = table(backend, MapKind::HashOfMaps, 2, 4);
        let kvs = t.query(&ctx()).await.unwrap();
        assert_eq!(kvs, vec![Kv::new([0x61, 0x00], [0x02, 0x01, 0x00, 0x00])]);
    }

    #[tokio::test]
    async fn test_nested_ops_require_map_in_map() {
        let backend = Arc::new(Canned::default());
        let t = table(backend.clone(), MapKind::Hash, 4, 4);
        assert!(t.create_in_map(&ctx(), "inner").await.is_err());
        assert!(t.update_in_map(&ctx(), &[0; 4], "inner").await.is_err());
        assert!(backend.calls().is_empty());

        let t = table(backend.clone(), MapKind::HashOfMaps, 4, 4);
        assert!(t.create_in_map(&ctx(), "../escape").await.is_err());
        t.create_in_map(&ctx(), "inner").await.unwrap();
        t.update_in_map(&ctx(), &[0; 4], "inner").await.unwrap();
        assert_eq!(backend.calls(), vec!["create_nested", "update_nested"]);
    }

    #[tokio::test]
    async fn test_plain_create_rejects_map_in_map() {
        let backend = Arc::new(Canned::default());
        let err = table(backend.clone(), MapKind::HashOfMaps, 4, 4)
            .create(&ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, MapError::Config { ref field, .. } if field == "map_type"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_next_key_decodes() {
        let backend = Arc::new(Canned::default());
        let t = table(backend, MapKind::Hash, 4, 4);
        assert_eq!(t.next_key(&ctx(), None).await.unwrap(), vec![1, 0, 0, 0]);
    }
}
