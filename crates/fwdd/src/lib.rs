//! MAC/IP forwarding table daemon.
//!
//! Keeps a pinned BPF map of forwarding rules (destination IPv4 address to
//! egress interface plus source/destination MAC) and exposes it over a
//! small JSON action protocol.
//!
//! - [`record`]: the fixed 4-byte key / 16-byte value layout
//! - [`forwarder`]: validated update/delete/query/gc over a [`fwd_bpfmap::Table`]
//! - [`api`] and [`server`]: the HTTP action surface
//! - [`config`]: TOML configuration

pub mod api;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod record;
pub mod server;

pub use api::{ActionResponse, ApiService};
pub use config::FwdConfig;
pub use error::{FwdError, Result};
pub use forwarder::Forwarder;
pub use record::{ForwardEntry, ForwardRecord};
