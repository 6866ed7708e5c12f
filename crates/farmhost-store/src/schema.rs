//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary host records, keyed by `host_id`.
    pub const HOSTS: &str = "hosts";

    /// Index: host id by hostname, keyed by the UTF-8 name.
    pub const HOSTS_BY_NAME: &str = "hosts_by_name";

    /// Index: hosts by hardware state, keyed by `state || host_id`.
    pub const HOSTS_BY_STATE: &str = "hosts_by_state";

    /// Primary allocation records, keyed by `allocation_id`.
    pub const ALLOCATIONS: &str = "allocations";

    /// Index: allocation id by name.
    pub const ALLOCATIONS_BY_NAME: &str = "allocations_by_name";

    /// Primary proc records, keyed by `proc_id`.
    pub const PROCS: &str = "procs";

    /// Index: procs by host, keyed by `host_id || proc_id`.
    pub const PROCS_BY_HOST: &str = "procs_by_host";

    /// Index: proc id by frame, keyed by `frame_id`.
    pub const PROCS_BY_FRAME: &str = "procs_by_frame";

    /// Singleton values such as the default allocation.
    pub const META: &str = "meta";
}

/// Keys stored in the [`cf::META`] column family.
pub mod meta {
    /// The id of the current default allocation.
    pub const DEFAULT_ALLOCATION: &[u8] = b"default_allocation";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::HOSTS,
        cf::HOSTS_BY_NAME,
        cf::HOSTS_BY_STATE,
        cf::ALLOCATIONS,
        cf::ALLOCATIONS_BY_NAME,
        cf::PROCS,
        cf::PROCS_BY_HOST,
        cf::PROCS_BY_FRAME,
        cf::META,
    ]
}
