//! Helper capability interface.
//!
//! [`MapBackend`] is everything the table facade needs from the store. The
//! production implementation, [`BpfTool`], runs one `bpftool` process per
//! call; a direct syscall binding or an in-memory model can stand in for it
//! without touching callers.
//!
//! Backends return the helper's own shapes (hex token arrays); decoding
//! into bytes happens in the facade.

use async_trait::async_trait;

use crate::command::{
    build_create_cmd, build_create_in_map_cmd, build_delete_cmd, build_dump_cmd,
    build_getnext_cmd, build_lookup_cmd, build_show_cmd, build_unlink_cmd, build_update_cmd,
    build_update_in_map_cmd, ToolPaths, UpdatePolicy,
};
use crate::error::MapResult;
use crate::exec::{run, ExecContext};
use crate::output::{DumpEntry, MapInfo, NextKey};
use crate::spec::TableSpec;

/// Operations against the pinned map store.
#[async_trait]
pub trait MapBackend: Send + Sync {
    /// Lists every map known to the store.
    async fn list(&self, ctx: &ExecContext) -> MapResult<Vec<MapInfo>>;

    /// Creates and pins a table.
    async fn create(&self, ctx: &ExecContext, spec: &TableSpec) -> MapResult<()>;

    /// Creates and pins a map-of-maps table using `inner` as the template.
    async fn create_nested(&self, ctx: &ExecContext, spec: &TableSpec, inner: &str)
        -> MapResult<()>;

    /// Returns every entry of a pinned table.
    async fn dump(&self, ctx: &ExecContext, name: &str) -> MapResult<Vec<DumpEntry>>;

    /// Returns the entry stored under `key`.
    async fn lookup(&self, ctx: &ExecContext, name: &str, key: &[u8]) -> MapResult<DumpEntry>;

    /// Returns the key following `key`, or the first key when `key` is `None`.
    async fn next_key(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: Option<&[u8]>,
    ) -> MapResult<NextKey>;

    /// Writes one key/value pair.
    async fn update(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: &[u8],
        value: &[u8],
        policy: UpdatePolicy,
    ) -> MapResult<()>;

    /// Stores a reference to the pinned map `inner` under `key`.
    async fn update_nested(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: &[u8],
        inner: &str,
        policy: UpdatePolicy,
    ) -> MapResult<()>;

    /// Removes one key.
    async fn delete(&self, ctx: &ExecContext, name: &str, key: &[u8]) -> MapResult<()>;

    /// Removes the pinned object.
    async fn unlink(&self, ctx: &ExecContext, name: &str) -> MapResult<()>;
}

/// `bpftool`-backed store access.
#[derive(Debug, Clone, Default)]
pub struct BpfTool {
    paths: ToolPaths,
}

impl BpfTool {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl MapBackend for BpfTool {
    async fn list(&self, ctx: &ExecContext) -> MapResult<Vec<MapInfo>> {
        let cmd = build_show_cmd(&self.paths);
        run(&cmd, ctx).await?.decode(&cmd.to_string())
    }

    async fn create(&self, ctx: &ExecContext, spec: &TableSpec) -> MapResult<()> {
        run(&build_create_cmd(&self.paths, spec), ctx).await?;
        Ok(())
    }

    async fn create_nested(
        &self,
        ctx: &ExecContext,
        spec: &TableSpec,
        inner: &str,
    ) -> MapResult<()> {
        run(&build_create_in_map_cmd(&self.paths, spec, inner), ctx).await?;
        Ok(())
    }

    async fn dump(&self, ctx: &ExecContext, name: &str) -> MapResult<Vec<DumpEntry>> {
        let cmd = build_dump_cmd(&self.paths, name);
        run(&cmd, ctx).await?.decode(&cmd.to_string())
    }

    async fn lookup(&self, ctx: &ExecContext, name: &str, key: &[u8]) -> MapResult<DumpEntry> {
        let cmd = build_lookup_cmd(&self.paths, name, key);
        run(&cmd, ctx).await?.decode(&cmd.to_string())
    }

    async fn next_key(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: Option<&[u8]>,
    ) -> MapResult<NextKey> {
        let cmd = build_getnext_cmd(&self.paths, name, key);
        run(&cmd, ctx).await?.decode(&cmd.to_string())
    }

    async fn update(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: &[u8],
        value: &[u8],
        policy: UpdatePolicy,
    ) -> MapResult<()> {
        run(&build_update_cmd(&self.paths, name, key, value, policy), ctx).await?;
        Ok(())
    }

    async fn update_nested(
        &self,
        ctx: &ExecContext,
        name: &str,
        key: &[u8],
        inner: &str,
        policy: UpdatePolicy,
    ) -> MapResult<()> {
        run(
            &build_update_in_map_cmd(&self.paths, name, key, inner, policy),
            ctx,
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, ctx: &ExecContext, name: &str, key: &[u8]) -> MapResult<()> {
        run(&build_delete_cmd(&self.paths, name, key), ctx).await?;
        Ok(())
    }

    async fn unlink(&self, ctx: &ExecContext, name: &str) -> MapResult<()> {
        run(&build_unlink_cmd(&self.paths, name), ctx).await?;
        Ok(())
    }
}
