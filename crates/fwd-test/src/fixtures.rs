//! Test fixtures for table scenarios
//!
//! Provides table definitions for every shape and random entry generators.

use std::collections::BTreeSet;

use fwd_bpfmap::{ExecContext, Kv, MapKind, TableSpec};
use rand::Rng;

/// Context with a recognisable trace id for test logs.
pub fn test_ctx(test_name: &str) -> ExecContext {
    ExecContext::new(format!("test-{}", test_name))
}

/// One valid definition per supported shape.
pub fn one_spec_per_kind() -> Vec<TableSpec> {
    [
        ("t_hash", MapKind::Hash, 4, 8, 64),
        ("t_lru", MapKind::LruHash, 4, 16, 64),
        ("t_array", MapKind::Array, 4, 8, 16),
        ("t_lpm", MapKind::LpmTrie, 8, 4, 64),
        ("t_outer", MapKind::HashOfMaps, 48, 4, 16),
    ]
    .into_iter()
    .filter_map(|(name, kind, key, value, max)| TableSpec::new(name, kind, key, value, max).ok())
    .collect()
}

/// `n` entries with distinct random keys of the given widths.
pub fn random_kvs(rng: &mut impl Rng, n: usize, key_size: usize, value_size: usize) -> Vec<Kv> {
    let mut seen = BTreeSet::new();
    let mut kvs = Vec::with_capacity(n);
    while kvs.len() < n {
        let key: Vec<u8> = (0..key_size).map(|_| rng.gen()).collect();
        if !seen.insert(key.clone()) {
            continue;
        }
        let value: Vec<u8> = (0..value_size).map(|_| rng.gen()).collect();
        kvs.push(Kv::new(key, value));
    }
    kvs
}

/// ASCII text zero-padded (or truncated) to `size` bytes.
pub fn padded_key(text: &str, size: usize) -> Vec<u8> {
    let mut key = text.as_bytes().to_vec();
    key.resize(size, 0);
    key
}
