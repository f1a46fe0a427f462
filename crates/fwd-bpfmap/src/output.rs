//! JSON shapes printed by the helper in `-j` mode.

use serde::{Deserialize, Serialize};

/// `{"error": "..."}` printed on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub error: String,
}

/// Process holding a reference to a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapPid {
    pub pid: u32,
    pub comm: String,
}

/// One element of the `map show` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    pub id: u32,
    #[serde(rename = "type")]
    pub map_type: String,
    /// Unnamed maps omit the field.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub flags: u32,
    pub bytes_key: usize,
    pub bytes_value: usize,
    pub max_entries: u32,
    #[serde(default)]
    pub bytes_memlock: u64,
    #[serde(default)]
    pub frozen: u32,
    #[serde(default)]
    pub btf_id: u32,
    #[serde(default)]
    pub pids: Vec<MapPid>,
}

/// One element of a `map dump`, also the shape of a `map lookup` reply.
///
/// Map-of-maps tables report the referenced map as `inner_map_id` instead
/// of a value array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpEntry {
    pub key: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_map_id: Option<u32>,
}

/// Reply of `map getnext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextKey {
    #[serde(default)]
    pub key: Option<Vec<String>>,
    pub next_key: Vec<String>,
}
