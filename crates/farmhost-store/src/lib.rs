//! `RocksDB` storage layer for farmhost.
//!
//! This crate provides persistent storage for hosts, allocations and procs using
//! `RocksDB` with column families for efficient indexing, plus the row locks the
//! host manager uses to serialize work on a single host.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `hosts`: Primary host records, keyed by `host_id`
//! - `hosts_by_name`: Unique hostname index
//! - `hosts_by_state`: Index for listing hosts by hardware state
//! - `allocations`: Primary allocation records, keyed by `allocation_id`
//! - `allocations_by_name`: Unique allocation name index
//! - `procs`: Primary proc records, keyed by `proc_id`
//! - `procs_by_host`: Index for listing procs bound to a host
//! - `procs_by_frame`: Index from frame to the proc running it
//! - `meta`: The default allocation pointer
//!
//! # Locking
//!
//! Host and proc methods are individually atomic but never take row locks
//! themselves. Callers that need read-check-write atomicity acquire the row first
//! with [`HostStore::lock_host`] or [`ProcStore::lock_frame`] and hold the guard
//! until the write is done.
//!
//! Allocation writes are rare and serialize internally on a single row, which
//! keeps allocation names unique and exactly one allocation flagged default.
//!
//! Row locks block the calling thread. Hold them only in synchronous code and
//! never across an `.await`.
//!
//! # Example
//!
//! ```no_run
//! use farmhost_store::{HostStore, RocksStore};
//!
//! let store = RocksStore::open("/tmp/farmhost-db").unwrap();
//! let host = store.find_host_by_name("render01").unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use locks::{RowGuard, RowLocks};
pub use rocks::RocksStore;
pub use types::{
    Allocation, HardwareState, Host, LockState, Proc, ProcStatus, ResourceStats,
};

use farmhost_core::{AllocationId, FrameId, HostId, ProcId};

/// Persistent collection of host records.
pub trait HostStore: Send + Sync {
    /// Acquire the row lock for a host.
    ///
    /// Blocks until no other operation holds the row.
    fn lock_host(&self, host_id: &HostId) -> RowGuard;

    /// Acquire the row lock for a hostname.
    ///
    /// Used to serialize creation of a host that does not have an id yet.
    fn lock_host_name(&self, name: &str) -> RowGuard;

    /// Insert or update a host record.
    ///
    /// This also maintains the name and hardware state indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if another host already uses the name.
    fn put_host(&self, host: &Host) -> Result<()>;

    /// Get a host by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_host(&self, host_id: &HostId) -> Result<Option<Host>>;

    /// Get a host by its unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_host_by_name(&self, name: &str) -> Result<Option<Host>>;

    /// Delete a host by ID.
    ///
    /// This also removes the host from all indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the host doesn't exist.
    fn delete_host(&self, host_id: &HostId) -> Result<()>;

    /// List all hosts in a given hardware state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_hosts_by_state(&self, state: HardwareState) -> Result<Vec<Host>>;

    /// List all hosts in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_all_hosts(&self) -> Result<Vec<Host>>;

    /// Overwrite a host's live resource figures.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the host doesn't exist.
    fn update_host_stats(&self, host_id: &HostId, cores: u32, stats: &ResourceStats)
        -> Result<()>;

    /// Update a host's hardware state.
    ///
    /// This also moves the host between hardware state indexes atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the host doesn't exist.
    fn update_host_state(&self, host_id: &HostId, state: HardwareState) -> Result<()>;
}

/// Persistent collection of allocation records.
pub trait AllocationStore: Send + Sync {
    /// Insert or update an allocation record.
    ///
    /// The `is_default` flag is managed by [`AllocationStore::set_default_allocation`]
    /// and is preserved from the stored record on update.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if another allocation already uses the name.
    fn put_allocation(&self, allocation: &Allocation) -> Result<()>;

    /// Get an allocation by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_allocation(&self, allocation_id: &AllocationId) -> Result<Option<Allocation>>;

    /// Get an allocation by its unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_allocation_by_name(&self, name: &str) -> Result<Option<Allocation>>;

    /// List all allocations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_allocations(&self) -> Result<Vec<Allocation>>;

    /// Get the current default allocation, if one has been designated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_default_allocation(&self) -> Result<Option<Allocation>>;

    /// Make an allocation the default, clearing the flag on the previous default.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the allocation doesn't exist.
    fn set_default_allocation(&self, allocation_id: &AllocationId) -> Result<()>;

    /// Make an allocation the default only if no default exists yet.
    ///
    /// Returns `true` if the allocation became the default.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the allocation doesn't exist.
    fn claim_default_allocation(&self, allocation_id: &AllocationId) -> Result<bool>;
}

/// Persistent collection of proc records bound to hosts.
pub trait ProcStore: Send + Sync {
    /// Acquire the row lock for a frame.
    ///
    /// Held while checking and writing a booking so a frame is bound to at
    /// most one proc across all hosts.
    fn lock_frame(&self, frame_id: &FrameId) -> RowGuard;

    /// Insert or update a proc record.
    ///
    /// This also maintains the host and frame indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if another proc is already bound to the frame.
    fn put_proc(&self, proc: &Proc) -> Result<()>;

    /// Get a proc by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_proc(&self, proc_id: &ProcId) -> Result<Option<Proc>>;

    /// Get the proc bound to a frame, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_proc_by_frame(&self, frame_id: &FrameId) -> Result<Option<Proc>>;

    /// Delete a proc, releasing its binding to the host.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the proc doesn't exist.
    fn delete_proc(&self, proc_id: &ProcId) -> Result<()>;

    /// List all procs bound to a host.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_procs_by_host(&self, host_id: &HostId) -> Result<Vec<Proc>>;

    /// Count procs bound to a host.
    ///
    /// This is more efficient than listing when you only need the count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_procs_by_host(&self, host_id: &HostId) -> Result<u32>;

    /// List all procs in the database.
    ///
    /// Use with caution in production; prefer filtered queries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_all_procs(&self) -> Result<Vec<Proc>>;
}

/// The full storage surface used by the host manager.
pub trait Store: HostStore + AllocationStore + ProcStore {}

impl<T: HostStore + AllocationStore + ProcStore> Store for T {}
