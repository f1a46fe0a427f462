//! Client for pinned BPF maps driven through the `bpftool` helper.
//!
//! The store is only reachable through an external privileged helper, so
//! every operation is one subprocess:
//!
//! - [`spec`]: map shapes and the [`TableSpec`] validation gate
//! - [`command`]: argument vector builders, one per helper verb
//! - [`exec`]: the process runner and output classification
//! - [`hex`]: per-byte hex tokens used in arguments and dumps
//! - [`backend`]: the [`MapBackend`] capability trait and [`BpfTool`]
//! - [`table`]: the [`Table`] facade (create, update, query, delete, gc)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fwd_bpfmap::{BpfTool, ExecContext, MapKind, Table, TableSpec, ToolPaths};
//!
//! async fn demo() -> fwd_bpfmap::MapResult<()> {
//!     let spec = TableSpec::new("hfwd", MapKind::LruHash, 4, 16, 10000)?;
//!     let table = Table::new(Arc::new(BpfTool::new(ToolPaths::default())), spec);
//!     let ctx = ExecContext::new("trace-1");
//!     if !table.exists(&ctx).await {
//!         table.create(&ctx).await?;
//!     }
//!     table.update(&ctx, &[1, 0, 0, 127], &[0; 16]).await?;
//!     for kv in table.query(&ctx).await? {
//!         println!("{:02x?} => {:02x?}", kv.key, kv.value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod command;
pub mod error;
pub mod exec;
pub mod hex;
pub mod output;
pub mod spec;
pub mod table;

pub use backend::{BpfTool, MapBackend};
pub use command::{ToolCommand, ToolPaths, UpdatePolicy};
pub use error::{MapError, MapResult};
pub use exec::{ExecContext, ToolOutput};
pub use output::{DumpEntry, MapInfo, MapPid, NextKey, ToolError};
pub use spec::{MapKind, TableSpec};
pub use table::{Kv, Table};
