//! Map shapes and the table definition gate.
//!
//! A [`TableSpec`] can only be obtained through [`TableSpec::new`], which
//! enforces the per-shape key/value bounds the kernel applies at creation
//! time. Nothing is spawned here.

use std::fmt;
use std::str::FromStr;

use crate::error::{MapError, MapResult};

/// Entries are allocated up front.
pub const BPF_F_PREALLOC: u32 = 0;

/// Entries are allocated on demand (`BPF_F_NO_PREALLOC`).
pub const BPF_F_NO_PREALLOC: u32 = 1;

/// Kernel object name buffer (`BPF_OBJ_NAME_LEN`), trailing NUL included.
pub const BPF_OBJ_NAME_LEN: usize = 16;

/// Longest pinned name that `map show` reports back unchanged. Longer names
/// are truncated by the kernel and would never match in the listing.
pub const MAX_NAME_LEN: usize = BPF_OBJ_NAME_LEN - 1;

/// Size of a map reference stored as a value in map-of-maps tables.
pub const MAP_FD_SIZE: usize = 4;

const LPM_MIN_KEY: usize = 5;
const LPM_MAX_KEY: usize = 260;
const LPM_MAX_VALUE: usize = 65535 - LPM_MAX_KEY;

/// Supported map shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    Hash,
    LruHash,
    Array,
    LpmTrie,
    HashOfMaps,
}

impl MapKind {
    /// Returns the shape name as the helper spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            MapKind::Hash => "hash",
            MapKind::LruHash => "lru_hash",
            MapKind::Array => "array",
            MapKind::LpmTrie => "lpm_trie",
            MapKind::HashOfMaps => "hash_of_maps",
        }
    }

    /// Creation flags for this shape.
    pub fn flags(&self) -> u32 {
        match self {
            MapKind::Array => BPF_F_PREALLOC,
            MapKind::Hash | MapKind::LruHash | MapKind::LpmTrie | MapKind::HashOfMaps => {
                BPF_F_NO_PREALLOC
            }
        }
    }

    /// Returns true if values are references to other pinned maps.
    pub fn is_map_in_map(&self) -> bool {
        matches!(self, MapKind::HashOfMaps)
    }

    fn check_sizes(&self, key_size: usize, value_size: usize) -> MapResult<()> {
        match self {
            MapKind::Hash | MapKind::LruHash => {
                if key_size < 1 {
                    return Err(MapError::config("key_size", "must be at least 1"));
                }
                if value_size < 1 {
                    return Err(MapError::config("value_size", "must be at least 1"));
                }
            }
            MapKind::Array => {
                if key_size != 4 {
                    return Err(MapError::config(
                        "key_size",
                        format!("array tables need a 4 byte key, got {}", key_size),
                    ));
                }
            }
            MapKind::LpmTrie => {
                if !(LPM_MIN_KEY..=LPM_MAX_KEY).contains(&key_size) {
                    return Err(MapError::config(
                        "key_size",
                        format!(
                            "lpm_trie key must be {}..={} bytes, got {}",
                            LPM_MIN_KEY, LPM_MAX_KEY, key_size
                        ),
                    ));
                }
                if !(1..=LPM_MAX_VALUE).contains(&value_size) {
                    return Err(MapError::config(
                        "value_size",
                        format!(
                            "lpm_trie value must be 1..={} bytes, got {}",
                            LPM_MAX_VALUE, value_size
                        ),
                    ));
                }
            }
            MapKind::HashOfMaps => {
                if value_size != MAP_FD_SIZE {
                    return Err(MapError::config(
                        "value_size",
                        format!(
                            "hash_of_maps values are {} byte map references, got {}",
                            MAP_FD_SIZE, value_size
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapKind {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(MapKind::Hash),
            "lru_hash" => Ok(MapKind::LruHash),
            "array" => Ok(MapKind::Array),
            "lpm_trie" => Ok(MapKind::LpmTrie),
            "hash_of_maps" => Ok(MapKind::HashOfMaps),
            _ => Err(MapError::config(
                "map_type",
                format!("unsupported map type '{}'", s),
            )),
        }
    }
}

/// Validated definition of one pinned table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    name: String,
    kind: MapKind,
    key_size: usize,
    value_size: usize,
    max_entries: u32,
}

impl TableSpec {
    /// Validates a table definition.
    ///
    /// # Errors
    ///
    /// `MapError::Config` naming the first violated constraint.
    pub fn new(
        name: impl Into<String>,
        kind: MapKind,
        key_size: usize,
        value_size: usize,
        max_entries: u32,
    ) -> MapResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        kind.check_sizes(key_size, value_size)?;
        if max_entries == 0 {
            return Err(MapError::config("max_entries", "must be at least 1"));
        }
        Ok(Self {
            name,
            kind,
            key_size,
            value_size,
            max_entries,
        })
    }

    /// Same as [`TableSpec::new`], taking the shape by name.
    pub fn parse(
        name: impl Into<String>,
        kind: &str,
        key_size: usize,
        value_size: usize,
        max_entries: u32,
    ) -> MapResult<Self> {
        Self::new(name, kind.parse()?, key_size, value_size, max_entries)
    }

    /// Pinned name, also used as the map's object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MapKind {
        self.kind
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    pub fn max_entries(&self) -> u32 {
        self.max_entries
    }

    pub fn flags(&self) -> u32 {
        self.kind.flags()
    }
}

/// Checks a pinned name against the store's object-name rules.
pub fn validate_name(name: &str) -> MapResult<()> {
    if name.is_empty() {
        return Err(MapError::config("name", "must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(MapError::config(
            "name",
            format!("'{}' exceeds {} characters", name, MAX_NAME_LEN),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
    {
        return Err(MapError::config(
            "name",
            format!("'{}' may only contain [A-Za-z0-9_.]", name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_field(err: MapError) -> String {
        match err {
            MapError::Config { field, .. } => field,
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("HASH".parse::<MapKind>().unwrap(), MapKind::Hash);
        assert_eq!("Lru_Hash".parse::<MapKind>().unwrap(), MapKind::LruHash);
        assert_eq!("lpm_trie".parse::<MapKind>().unwrap(), MapKind::LpmTrie);
        assert!("percpu_hash".parse::<MapKind>().is_err());
    }

    #[test]
    fn test_flags_per_kind() {
        assert_eq!(MapKind::Array.flags(), BPF_F_PREALLOC);
        assert_eq!(MapKind::Hash.flags(), BPF_F_NO_PREALLOC);
        assert_eq!(MapKind::LruHash.flags(), BPF_F_NO_PREALLOC);
        assert_eq!(MapKind::LpmTrie.flags(), BPF_F_NO_PREALLOC);
        assert_eq!(MapKind::HashOfMaps.flags(), BPF_F_NO_PREALLOC);
    }

    #[test]
    fn test_hash_bounds() {
        assert!(TableSpec::new("t", MapKind::Hash, 1, 1, 1).is_ok());
        assert_eq!(
            config_field(TableSpec::new("t", MapKind::LruHash, 0, 4, 8).unwrap_err()),
            "key_size"
        );
        assert_eq!(
            config_field(TableSpec::new("t", MapKind::Hash, 4, 0, 8).unwrap_err()),
            "value_size"
        );
    }

    #[test]
    fn test_array_bounds() {
        assert!(TableSpec::new("t", MapKind::Array, 4, 64, 8).is_ok());
        assert_eq!(
            config_field(TableSpec::new("t", MapKind::Array, 8, 4, 8).unwrap_err()),
            "key_size"
        );
    }

    #[test]
    fn test_lpm_bounds() {
        assert!(TableSpec::new("t", MapKind::LpmTrie, 5, 1, 8).is_ok());
        assert!(TableSpec::new("t", MapKind::LpmTrie, 260, 65275, 8).is_ok());
        assert!(TableSpec::new("t", MapKind::LpmTrie, 4, 16, 8).is_err());
        assert!(TableSpec::new("t", MapKind::LpmTrie, 261, 16, 8).is_err());
        assert_eq!(
            config_field(TableSpec::new("t", MapKind::LpmTrie, 8, 65276, 8).unwrap_err()),
            "value_size"
        );
        assert!(TableSpec::new("t", MapKind::LpmTrie, 8, 0, 8).is_err());
    }

    #[test]
    fn test_hash_of_maps_bounds() {
        assert!(TableSpec::new("outer", MapKind::HashOfMaps, 48, 4, 16).is_ok());
        assert_eq!(
            config_field(TableSpec::new("outer", MapKind::HashOfMaps, 48, 8, 16).unwrap_err()),
            "value_size"
        );
    }

    #[test]
    fn test_max_entries() {
        assert_eq!(
            config_field(TableSpec::new("t", MapKind::Hash, 4, 4, 0).unwrap_err()),
            "max_entries"
        );
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("hfwd").is_ok());
        assert!(validate_name("a_b.c0123456789").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("abcdefghijklmnopq").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("has space").is_err());
    }

    #[test]
    fn test_name_fits_kernel_object_name() {
        assert_eq!("fwd_table_15chr".len(), MAX_NAME_LEN);
        assert!(TableSpec::new("fwd_table_15chr", MapKind::LruHash, 4, 16, 8).is_ok());
        assert_eq!(
            config_field(TableSpec::new("fwd_table_16chrx", MapKind::LruHash, 4, 16, 8).unwrap_err()),
            "name"
        );
    }

    #[test]
    fn test_parse_by_name() {
        let spec = TableSpec::parse("hfwd", "LRU_HASH", 4, 16, 10000).unwrap();
        assert_eq!(spec.kind(), MapKind::LruHash);
        assert_eq!(spec.name(), "hfwd");
        assert_eq!(spec.key_size(), 4);
        assert_eq!(spec.value_size(), 16);
        assert_eq!(spec.max_entries(), 10000);
        assert_eq!(spec.flags(), BPF_F_NO_PREALLOC);

        assert_eq!(
            config_field(TableSpec::parse("hfwd", "ringbuf", 4, 16, 8).unwrap_err()),
            "map_type"
        );
    }
}
