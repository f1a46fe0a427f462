//! Forwarding table client.
//!
//! Parses textual input into a [`ForwardEntry`], packs it with
//! [`ForwardRecord`] and drives the pinned table. The table is created on
//! the first write or delete when it is missing. Each step is a separate
//! store call; concurrent writers race at the store.

use std::time::Duration;

use fwd_bpfmap::{ExecContext, Table};
use fwd_types::Ipv4Address;

use crate::error::{FwdError, Result};
use crate::record::{ForwardEntry, ForwardRecord};

pub struct Forwarder {
    table: Table,
    timeout: Option<Duration>,
}

impl Forwarder {
    /// Wraps a table whose widths match the forwarding record.
    pub fn new(table: Table) -> Result<Self> {
        let spec = table.spec();
        if spec.key_size() != ForwardRecord::KEY_SIZE
            || spec.value_size() != ForwardRecord::VALUE_SIZE
        {
            return Err(FwdError::Config(format!(
                "table '{}' is {}/{} bytes, forwarding records need {}/{}",
                spec.name(),
                spec.key_size(),
                spec.value_size(),
                ForwardRecord::KEY_SIZE,
                ForwardRecord::VALUE_SIZE
            )));
        }
        Ok(Self {
            table,
            timeout: None,
        })
    }

    /// Applies a deadline to every helper call made through [`Forwarder::context`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Call context for one request.
    pub fn context(&self, trace_id: impl Into<String>) -> ExecContext {
        let ctx = ExecContext::new(trace_id);
        match self.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Validates and upserts one rule.
    pub async fn update(
        &self,
        ctx: &ExecContext,
        ip: &str,
        iface: u32,
        src_mac: &str,
        dst_mac: &str,
    ) -> Result<ForwardEntry> {
        let entry = ForwardEntry::parse(ip, iface, src_mac, dst_mac)?;
        self.update_entry(ctx, &entry).await?;
        Ok(entry)
    }

    pub async fn update_entry(&self, ctx: &ExecContext, entry: &ForwardEntry) -> Result<()> {
        self.ensure_table(ctx).await?;
        let kv = ForwardRecord::encode(entry);
        self.table.update(ctx, &kv.key, &kv.value).await?;
        tracing::info!(
            trace_id = %ctx.trace_id(),
            ip = %entry.ip,
            iface = entry.iface,
            src_mac = %entry.src_mac,
            dst_mac = %entry.dst_mac,
            "Forward rule updated"
        );
        Ok(())
    }

    /// Removes the rule for `ip`. A missing rule is an error from the store.
    pub async fn delete(&self, ctx: &ExecContext, ip: &str) -> Result<()> {
        let ip = ip.parse::<Ipv4Address>()?;
        self.ensure_table(ctx).await?;
        self.table
            .delete(ctx, &ForwardRecord::encode_key(ip))
            .await?;
        tracing::info!(trace_id = %ctx.trace_id(), ip = %ip, "Forward rule deleted");
        Ok(())
    }

    /// Every rule in the table; empty when the table does not exist.
    pub async fn query(&self, ctx: &ExecContext) -> Result<Vec<ForwardEntry>> {
        self.table
            .query(ctx)
            .await?
            .iter()
            .map(ForwardRecord::decode)
            .collect()
    }

    /// Unlinks the forwarding table.
    pub async fn gc(&self, ctx: &ExecContext) -> Result<()> {
        self.table.gc(ctx).await?;
        Ok(())
    }

    async fn ensure_table(&self, ctx: &ExecContext) -> Result<()> {
        if !self.table.exists(ctx).await {
            self.table.create(ctx).await?;
        }
        Ok(())
    }
}
