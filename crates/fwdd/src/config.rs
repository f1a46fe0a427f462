//! Configuration file support for fwdd
//!
//! Loads and validates fwdd configuration from TOML files.
//! Default location: /etc/fwd/fwdd.toml

use crate::error::{FwdError, Result};
use crate::record::ForwardRecord;
use fwd_bpfmap::{TableSpec, ToolPaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fwd/fwdd.toml";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter level ("error", "warn", "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen address, must be an IP literal
    #[serde(default = "default_http_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_http_port")]
    pub port: u16,
}

/// Map helper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpfConfig {
    /// Helper executable
    #[serde(default = "default_bpftool")]
    pub bpftool: String,

    /// Executable used to remove pinned objects
    #[serde(default = "default_unlink")]
    pub unlink: String,

    /// bpffs mount point shared by every table
    #[serde(default = "default_pin_root")]
    pub pin_root: PathBuf,

    /// Per-subprocess deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Forwarding table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Pinned name of the forwarding table
    #[serde(default = "default_table_name")]
    pub name: String,

    /// Map shape
    #[serde(default = "default_map_type")]
    pub map_type: String,

    /// Table capacity
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
}

/// Complete fwdd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FwdConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub bpf: BpfConfig,

    #[serde(default)]
    pub forward: ForwardConfig,
}

// Default functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_bpftool() -> String {
    fwd_bpfmap::command::BPFTOOL_CMD.to_string()
}

fn default_unlink() -> String {
    fwd_bpfmap::command::UNLINK_CMD.to_string()
}

fn default_pin_root() -> PathBuf {
    PathBuf::from(fwd_bpfmap::command::BPFFS_ROOT)
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_table_name() -> String {
    "hfwd".to_string()
}

fn default_map_type() -> String {
    "lru_hash".to_string()
}

fn default_max_entries() -> u32 {
    10000
}

// Default implementations
impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

impl Default for BpfConfig {
    fn default() -> Self {
        Self {
            bpftool: default_bpftool(),
            unlink: default_unlink(),
            pin_root: default_pin_root(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            name: default_table_name(),
            map_type: default_map_type(),
            max_entries: default_max_entries(),
        }
    }
}

impl FwdConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                FwdError::Config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!(
                    "fwdd: Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(FwdError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FwdError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.listen_ip()?;

        if self.http.port == 0 || self.http.port == u16::MAX {
            return Err(FwdError::Config(format!(
                "http.port must be 1..65534, got {}",
                self.http.port
            )));
        }

        if self.bpf.timeout_secs == 0 {
            return Err(FwdError::Config(
                "bpf.timeout_secs must be > 0".to_string(),
            ));
        }

        self.table_spec()?;
        Ok(())
    }

    /// Parsed listen address
    pub fn listen_ip(&self) -> Result<IpAddr> {
        self.http.host.parse().map_err(|_| {
            FwdError::Config(format!(
                "http.host '{}' is not an IP address",
                self.http.host
            ))
        })
    }

    /// Helper executables and mount point
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths::new(&self.bpf.bpftool, &self.bpf.unlink, &self.bpf.pin_root)
    }

    /// Per-subprocess deadline
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_secs(self.bpf.timeout_secs)
    }

    /// Forwarding table definition with the record's fixed widths
    pub fn table_spec(&self) -> Result<TableSpec> {
        TableSpec::parse(
            &self.forward.name,
            &self.forward.map_type,
            ForwardRecord::KEY_SIZE,
            ForwardRecord::VALUE_SIZE,
            self.forward.max_entries,
        )
        .map_err(|e| FwdError::Config(format!("forward table: {}", e)))
    }
}
