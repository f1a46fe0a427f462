//! Argument vector builders for the map helper.
//!
//! Every builder is pure: it renders one [`ToolCommand`] and runs nothing.
//! Arguments are passed to the process as-is, no shell is involved, so
//! no quoting is needed.

use std::fmt;
use std::path::PathBuf;

use crate::hex::encode_arg;
use crate::spec::TableSpec;

/// Default helper executable.
pub const BPFTOOL_CMD: &str = "bpftool";

/// Default executable used to remove pinned objects.
pub const UNLINK_CMD: &str = "unlink";

/// Default bpffs mount point shared by every table.
pub const BPFFS_ROOT: &str = "/sys/fs/bpf";

/// Executables and mount point used to build commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub bpftool: String,
    pub unlink: String,
    pub pin_root: PathBuf,
}

impl ToolPaths {
    pub fn new(
        bpftool: impl Into<String>,
        unlink: impl Into<String>,
        pin_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bpftool: bpftool.into(),
            unlink: unlink.into(),
            pin_root: pin_root.into(),
        }
    }

    /// Filesystem path of a pinned object.
    pub fn pin_path(&self, name: &str) -> String {
        self.pin_root.join(name).display().to_string()
    }

    fn map_cmd(&self, verb: &str) -> ToolCommand {
        ToolCommand::new(&self.bpftool)
            .arg("-j")
            .arg("map")
            .arg(verb)
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self::new(BPFTOOL_CMD, UNLINK_CMD, BPFFS_ROOT)
    }
}

/// Write policy for update commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Create or overwrite.
    Any,
    /// Only overwrite an existing key.
    Exist,
    /// Only create a missing key.
    NoExist,
}

impl UpdatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdatePolicy::Any => "any",
            UpdatePolicy::Exist => "exist",
            UpdatePolicy::NoExist => "noexist",
        }
    }
}

/// One external command: program plus argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn hex_bytes(mut self, label: &str, bytes: &[u8]) -> Self {
        self.args.push(label.to_string());
        self.args.push("hex".to_string());
        self.args.extend(bytes.iter().copied().map(encode_arg));
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Build the map listing command (used for existence checks).
pub fn build_show_cmd(paths: &ToolPaths) -> ToolCommand {
    paths.map_cmd("show")
}

/// Build the pinned map creation command.
pub fn build_create_cmd(paths: &ToolPaths, spec: &TableSpec) -> ToolCommand {
    paths
        .map_cmd("create")
        .arg(paths.pin_path(spec.name()))
        .arg("type")
        .arg(spec.kind().as_str())
        .arg("key")
        .arg(spec.key_size().to_string())
        .arg("value")
        .arg(spec.value_size().to_string())
        .arg("entries")
        .arg(spec.max_entries().to_string())
        .arg("name")
        .arg(spec.name())
        .arg("flags")
        .arg(spec.flags().to_string())
}

/// Build the map-of-maps creation command
///
/// The inner map must already be pinned; it serves as the template for
/// every value stored in the outer table.
pub fn build_create_in_map_cmd(paths: &ToolPaths, spec: &TableSpec, inner: &str) -> ToolCommand {
    paths
        .map_cmd("create")
        .arg(paths.pin_path(spec.name()))
        .arg("type")
        .arg(spec.kind().as_str())
        .arg("inner_map")
        .arg("pinned")
        .arg(paths.pin_path(inner))
        .arg("key")
        .arg(spec.key_size().to_string())
        .arg("value")
        .arg(spec.value_size().to_string())
        .arg("entries")
        .arg(spec.max_entries().to_string())
        .arg("name")
        .arg(spec.name())
        .arg("flags")
        .arg(spec.flags().to_string())
}

/// Build the full scan command.
pub fn build_dump_cmd(paths: &ToolPaths, name: &str) -> ToolCommand {
    paths.map_cmd("dump").arg("pinned").arg(paths.pin_path(name))
}

/// Build the single key lookup command.
pub fn build_lookup_cmd(paths: &ToolPaths, name: &str, key: &[u8]) -> ToolCommand {
    paths
        .map_cmd("lookup")
        .arg("pinned")
        .arg(paths.pin_path(name))
        .hex_bytes("key", key)
}

/// Build the key deletion command.
pub fn build_delete_cmd(paths: &ToolPaths, name: &str, key: &[u8]) -> ToolCommand {
    paths
        .map_cmd("delete")
        .arg("pinned")
        .arg(paths.pin_path(name))
        .hex_bytes("key", key)
}

/// Build the iteration command; without a key the helper returns the first key.
pub fn build_getnext_cmd(paths: &ToolPaths, name: &str, key: Option<&[u8]>) -> ToolCommand {
    let cmd = paths
        .map_cmd("getnext")
        .arg("pinned")
        .arg(paths.pin_path(name));
    match key {
        Some(key) => cmd.hex_bytes("key", key),
        None => cmd,
    }
}

/// Build the key/value write command.
pub fn build_update_cmd(
    paths: &ToolPaths,
    name: &str,
    key: &[u8],
    value: &[u8],
    policy: UpdatePolicy,
) -> ToolCommand {
    paths
        .map_cmd("update")
        .arg("pinned")
        .arg(paths.pin_path(name))
        .hex_bytes("key", key)
        .hex_bytes("value", value)
        .arg(policy.as_str())
}

/// Build the map-of-maps write command, storing a reference to a pinned map.
pub fn build_update_in_map_cmd(
    paths: &ToolPaths,
    name: &str,
    key: &[u8],
    inner: &str,
    policy: UpdatePolicy,
) -> ToolCommand {
    paths
        .map_cmd("update")
        .arg("pinned")
        .arg(paths.pin_path(name))
        .hex_bytes("key", key)
        .arg("value")
        .arg("pinned")
        .arg(paths.pin_path(inner))
        .arg(policy.as_str())
}

/// Build the pinned object removal command.
pub fn build_unlink_cmd(paths: &ToolPaths, name: &str) -> ToolCommand {
    ToolCommand::new(&paths.unlink).arg(paths.pin_path(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::MapKind;
    use pretty_assertions::assert_eq;

    fn paths() -> ToolPaths {
        ToolPaths::default()
    }

    #[test]
    fn test_build_show_cmd() {
        assert_eq!(build_show_cmd(&paths()).to_string(), "bpftool -j map show");
    }

    #[test]
    fn test_build_create_cmd() {
        let spec = TableSpec::new("hfwd", MapKind::LruHash, 4, 16, 10000).unwrap();
        assert_eq!(
            build_create_cmd(&paths(), &spec).to_string(),
            "bpftool -j map create /sys/fs/bpf/hfwd type lru_hash key 4 value 16 \
             entries 10000 name hfwd flags 1"
        );
    }

    #[test]
    fn test_build_create_array_uses_prealloc() {
        let spec = TableSpec::new("arr", MapKind::Array, 4, 8, 32).unwrap();
        let cmd = build_create_cmd(&paths(), &spec);
        assert_eq!(cmd.args.last().map(String::as_str), Some("0"));
    }

    #[test]
    fn test_build_create_in_map_cmd() {
        let spec = TableSpec::new("outer", MapKind::HashOfMaps, 48, 4, 16).unwrap();
        assert_eq!(
            build_create_in_map_cmd(&paths(), &spec, "inner").to_string(),
            "bpftool -j map create /sys/fs/bpf/outer type hash_of_maps inner_map pinned \
             /sys/fs/bpf/inner key 48 value 4 entries 16 name outer flags 1"
        );
    }

    #[test]
    fn test_build_dump_cmd() {
        assert_eq!(
            build_dump_cmd(&paths(), "hfwd").to_string(),
            "bpftool -j map dump pinned /sys/fs/bpf/hfwd"
        );
    }

    #[test]
    fn test_key_bytes_are_two_digit_hex() {
        let key = [0x01, 0x00, 0x0f, 0x7f];
        assert_eq!(
            build_lookup_cmd(&paths(), "hfwd", &key).to_string(),
            "bpftool -j map lookup pinned /sys/fs/bpf/hfwd key hex 01 00 0f 7f"
        );
        assert_eq!(
            build_delete_cmd(&paths(), "hfwd", &key).to_string(),
            "bpftool -j map delete pinned /sys/fs/bpf/hfwd key hex 01 00 0f 7f"
        );
        assert_eq!(
            build_getnext_cmd(&paths(), "hfwd", Some(&key)).to_string(),
            "bpftool -j map getnext pinned /sys/fs/bpf/hfwd key hex 01 00 0f 7f"
        );
    }

    #[test]
    fn test_build_getnext_without_key() {
        assert_eq!(
            build_getnext_cmd(&paths(), "hfwd", None).to_string(),
            "bpftool -j map getnext pinned /sys/fs/bpf/hfwd"
        );
    }

    #[test]
    fn test_build_update_cmd() {
        let cmd = build_update_cmd(
            &paths(),
            "hfwd",
            &[0x12, 0x34],
            &[0xab, 0x0c],
            UpdatePolicy::Any,
        );
        assert_eq!(
            cmd.to_string(),
            "bpftool -j map update pinned /sys/fs/bpf/hfwd key hex 12 34 value hex ab 0c any"
        );
        let cmd = build_update_cmd(&paths(), "hfwd", &[1], &[2], UpdatePolicy::NoExist);
        assert_eq!(cmd.args.last().map(String::as_str), Some("noexist"));
    }

    #[test]
    fn test_build_update_in_map_cmd() {
        let cmd = build_update_in_map_cmd(&paths(), "outer", &[0x61, 0x00], "inner", UpdatePolicy::Any);
        assert_eq!(
            cmd.to_string(),
            "bpftool -j map update pinned /sys/fs/bpf/outer key hex 61 00 value pinned \
             /sys/fs/bpf/inner any"
        );
    }

    #[test]
    fn test_build_unlink_cmd() {
        let cmd = build_unlink_cmd(&paths(), "hfwd");
        assert_eq!(cmd.program, "unlink");
        assert_eq!(cmd.args, vec!["/sys/fs/bpf/hfwd".to_string()]);
    }

    #[test]
    fn test_custom_mount_point() {
        let paths = ToolPaths::new("/usr/sbin/bpftool", "/usr/bin/unlink", "/run/fwd/bpf");
        assert_eq!(
            build_dump_cmd(&paths, "t1").to_string(),
            "/usr/sbin/bpftool -j map dump pinned /run/fwd/bpf/t1"
        );
    }
}
