//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions to encode and decode keys for various indexes.
//! All composite keys are designed to support efficient prefix scans.

use farmhost_core::{AllocationId, FrameId, HostId, ProcId};

/// Encode a host key (just the host ID bytes).
#[must_use]
pub fn host_key(host_id: &HostId) -> Vec<u8> {
    host_id.as_bytes().to_vec()
}

/// Encode a hostname index key.
#[must_use]
pub fn host_name_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Encode a state-host index key: `state || host_id`.
///
/// This allows efficient prefix scans for all hosts in a given hardware state.
#[must_use]
pub fn state_host_key(state: u8, host_id: &HostId) -> Vec<u8> {
    let mut key = Vec::with_capacity(17);
    key.push(state);
    key.extend_from_slice(host_id.as_bytes());
    key
}

/// Encode a state prefix for scanning all hosts by hardware state.
#[must_use]
pub fn state_prefix(state: u8) -> Vec<u8> {
    vec![state]
}

/// Extract the host ID from a state-host key.
///
/// # Panics
///
/// Panics if the key is not at least 17 bytes.
#[must_use]
pub fn extract_host_id_from_state_host_key(key: &[u8]) -> HostId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[1..17]);
    HostId::from_bytes(bytes)
}

/// Encode an allocation key (just the allocation ID bytes).
#[must_use]
pub fn allocation_key(allocation_id: &AllocationId) -> Vec<u8> {
    allocation_id.as_bytes().to_vec()
}

/// Encode an allocation name index key.
#[must_use]
pub fn allocation_name_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Encode a proc key (just the proc ID bytes).
#[must_use]
pub fn proc_key(proc_id: &ProcId) -> Vec<u8> {
    proc_id.as_bytes().to_vec()
}

/// Encode a host-proc index key: `host_id || proc_id`.
///
/// This allows efficient prefix scans for all procs bound to a host.
#[must_use]
pub fn host_proc_key(host_id: &HostId, proc_id: &ProcId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(host_id.as_bytes());
    key.extend_from_slice(proc_id.as_bytes());
    key
}

/// Encode a host prefix for scanning all procs by host.
#[must_use]
pub fn host_prefix(host_id: &HostId) -> Vec<u8> {
    host_id.as_bytes().to_vec()
}

/// Extract the proc ID from a host-proc key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_proc_id_from_host_proc_key(key: &[u8]) -> ProcId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    ProcId::from_bytes(bytes)
}

/// Encode a frame-proc index key (just the frame ID bytes).
#[must_use]
pub fn frame_key(frame_id: &FrameId) -> Vec<u8> {
    frame_id.as_bytes().to_vec()
}

/// Decode a 16-byte identifier stored as an index value.
///
/// Returns `None` if the value has the wrong length.
#[must_use]
pub fn decode_id_bytes(value: &[u8]) -> Option<[u8; 16]> {
    value.try_into().ok()
}
