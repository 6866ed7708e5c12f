//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the [`HostStore`],
//! [`AllocationStore`] and [`ProcStore`] traits.

use std::path::Path;
use std::sync::Arc;

use farmhost_core::{AllocationId, FrameId, HostId, ProcId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::{RowGuard, RowLocks};
use crate::schema::{all_column_families, cf, meta};
use crate::types::{Allocation, HardwareState, Host, Proc, ResourceStats};
use crate::{AllocationStore, HostStore, ProcStore};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    locks: RowLocks,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            locks: RowLocks::new(),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read a record from a column family.
    fn get_record<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Read a 16-byte id stored as an index value.
    fn get_index_id(&self, cf_name: &str, key: &[u8]) -> Result<Option<[u8; 16]>> {
        let cf = self.cf(cf_name)?;

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| {
                keys::decode_id_bytes(&data).ok_or_else(|| {
                    StoreError::Serialization(format!("corrupt index entry in {cf_name}"))
                })
            })
            .transpose()
    }

    /// Collect every key in a column family that starts with `prefix`.
    fn prefix_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;

        let mut found = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, rocksdb::Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(prefix) {
                break;
            }

            found.push(key);
        }

        Ok(found)
    }

    /// Deserialize every value in a column family.
    fn all_records<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::deserialize(&value)?);
        }

        Ok(records)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Serialize all allocation writes.
    fn lock_allocations(&self) -> RowGuard {
        self.locks.lock("allocations")
    }

    /// Move the default flag to `allocation_id`. Caller holds the allocations row.
    fn write_default_allocation(&self, allocation_id: &AllocationId) -> Result<()> {
        let cf_allocations = self.cf(cf::ALLOCATIONS)?;
        let cf_meta = self.cf(cf::META)?;

        let mut next = self
            .get_allocation(allocation_id)?
            .ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();

        if let Some(mut previous) = self.get_default_allocation()? {
            if previous.allocation_id != *allocation_id {
                previous.is_default = false;
                batch.put_cf(
                    &cf_allocations,
                    keys::allocation_key(&previous.allocation_id),
                    Self::serialize(&previous)?,
                );
            }
        }

        next.is_default = true;
        batch.put_cf(
            &cf_allocations,
            keys::allocation_key(allocation_id),
            Self::serialize(&next)?,
        );
        batch.put_cf(&cf_meta, meta::DEFAULT_ALLOCATION, allocation_id.as_bytes());

        self.write(batch)
    }
}

impl HostStore for RocksStore {
    fn lock_host(&self, host_id: &HostId) -> RowGuard {
        self.locks.lock(format!("host:{host_id}"))
    }

    fn lock_host_name(&self, name: &str) -> RowGuard {
        self.locks.lock(format!("hostname:{name}"))
    }

    fn put_host(&self, host: &Host) -> Result<()> {
        let cf_hosts = self.cf(cf::HOSTS)?;
        let cf_by_name = self.cf(cf::HOSTS_BY_NAME)?;
        let cf_by_state = self.cf(cf::HOSTS_BY_STATE)?;

        let host_key = keys::host_key(&host.host_id);
        let name_key = keys::host_name_key(&host.name);
        let state_key = keys::state_host_key(host.hardware_state.as_u8(), &host.host_id);

        if let Some(owner) = self.get_index_id(cf::HOSTS_BY_NAME, &name_key)? {
            if owner != *host.host_id.as_bytes() {
                return Err(StoreError::Conflict(format!(
                    "hostname already in use: {}",
                    host.name
                )));
            }
        }

        let old = self.get_host(&host.host_id)?;
        let value = Self::serialize(host)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_hosts, &host_key, &value);

        if let Some(old) = old {
            if old.hardware_state != host.hardware_state {
                let old_state_key =
                    keys::state_host_key(old.hardware_state.as_u8(), &host.host_id);
                batch.delete_cf(&cf_by_state, &old_state_key);
            }
            if old.name != host.name {
                batch.delete_cf(&cf_by_name, keys::host_name_key(&old.name));
            }
        }

        batch.put_cf(&cf_by_name, &name_key, host.host_id.as_bytes());
        batch.put_cf(&cf_by_state, &state_key, []);

        self.write(batch)
    }

    fn get_host(&self, host_id: &HostId) -> Result<Option<Host>> {
        self.get_record(cf::HOSTS, &keys::host_key(host_id))
    }

    fn find_host_by_name(&self, name: &str) -> Result<Option<Host>> {
        match self.get_index_id(cf::HOSTS_BY_NAME, &keys::host_name_key(name))? {
            Some(bytes) => self.get_host(&HostId::from_bytes(bytes)),
            None => Ok(None),
        }
    }

    fn delete_host(&self, host_id: &HostId) -> Result<()> {
        let cf_hosts = self.cf(cf::HOSTS)?;
        let cf_by_name = self.cf(cf::HOSTS_BY_NAME)?;
        let cf_by_state = self.cf(cf::HOSTS_BY_STATE)?;

        let host = self.get_host(host_id)?.ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_hosts, keys::host_key(host_id));
        batch.delete_cf(&cf_by_name, keys::host_name_key(&host.name));
        batch.delete_cf(
            &cf_by_state,
            keys::state_host_key(host.hardware_state.as_u8(), host_id),
        );

        self.write(batch)
    }

    fn list_hosts_by_state(&self, state: HardwareState) -> Result<Vec<Host>> {
        let prefix = keys::state_prefix(state.as_u8());

        let mut hosts = Vec::new();
        for key in self.prefix_keys(cf::HOSTS_BY_STATE, &prefix)? {
            let host_id = keys::extract_host_id_from_state_host_key(&key);
            if let Some(host) = self.get_host(&host_id)? {
                hosts.push(host);
            }
        }

        Ok(hosts)
    }

    fn list_all_hosts(&self) -> Result<Vec<Host>> {
        self.all_records(cf::HOSTS)
    }

    fn update_host_stats(
        &self,
        host_id: &HostId,
        cores: u32,
        stats: &ResourceStats,
    ) -> Result<()> {
        let mut host = self.get_host(host_id)?.ok_or(StoreError::NotFound)?;
        let now = chrono::Utc::now();
        host.cores = cores;
        host.stats = stats.clone();
        host.last_report_at = Some(now);
        host.updated_at = now;
        self.put_host(&host)
    }

    fn update_host_state(&self, host_id: &HostId, state: HardwareState) -> Result<()> {
        let mut host = self.get_host(host_id)?.ok_or(StoreError::NotFound)?;
        host.hardware_state = state;
        host.updated_at = chrono::Utc::now();
        self.put_host(&host)
    }
}

impl AllocationStore for RocksStore {
    fn put_allocation(&self, allocation: &Allocation) -> Result<()> {
        let cf_allocations = self.cf(cf::ALLOCATIONS)?;
        let cf_by_name = self.cf(cf::ALLOCATIONS_BY_NAME)?;

        let _guard = self.lock_allocations();

        let name_key = keys::allocation_name_key(&allocation.name);
        if let Some(owner) = self.get_index_id(cf::ALLOCATIONS_BY_NAME, &name_key)? {
            if owner != *allocation.allocation_id.as_bytes() {
                return Err(StoreError::Conflict(format!(
                    "allocation name already in use: {}",
                    allocation.name
                )));
            }
        }

        let old = self.get_allocation(&allocation.allocation_id)?;
        let mut record = allocation.clone();
        record.is_default = old.as_ref().is_some_and(|a| a.is_default);

        let mut batch = WriteBatch::default();
        if let Some(old) = old {
            if old.name != allocation.name {
                batch.delete_cf(&cf_by_name, keys::allocation_name_key(&old.name));
            }
        }
        batch.put_cf(
            &cf_allocations,
            keys::allocation_key(&allocation.allocation_id),
            Self::serialize(&record)?,
        );
        batch.put_cf(&cf_by_name, &name_key, allocation.allocation_id.as_bytes());

        self.write(batch)
    }

    fn get_allocation(&self, allocation_id: &AllocationId) -> Result<Option<Allocation>> {
        self.get_record(cf::ALLOCATIONS, &keys::allocation_key(allocation_id))
    }

    fn find_allocation_by_name(&self, name: &str) -> Result<Option<Allocation>> {
        match self.get_index_id(cf::ALLOCATIONS_BY_NAME, &keys::allocation_name_key(name))? {
            Some(bytes) => self.get_allocation(&AllocationId::from_bytes(bytes)),
            None => Ok(None),
        }
    }

    fn list_allocations(&self) -> Result<Vec<Allocation>> {
        self.all_records(cf::ALLOCATIONS)
    }

    fn get_default_allocation(&self) -> Result<Option<Allocation>> {
        match self.get_index_id(cf::META, meta::DEFAULT_ALLOCATION)? {
            Some(bytes) => self.get_allocation(&AllocationId::from_bytes(bytes)),
            None => Ok(None),
        }
    }

    fn set_default_allocation(&self, allocation_id: &AllocationId) -> Result<()> {
        let _guard = self.lock_allocations();
        self.write_default_allocation(allocation_id)
    }

    fn claim_default_allocation(&self, allocation_id: &AllocationId) -> Result<bool> {
        let _guard = self.lock_allocations();

        if self.get_default_allocation()?.is_some() {
            if self.get_allocation(allocation_id)?.is_none() {
                return Err(StoreError::NotFound);
            }
            return Ok(false);
        }

        self.write_default_allocation(allocation_id)?;
        Ok(true)
    }
}

impl ProcStore for RocksStore {
    fn lock_frame(&self, frame_id: &FrameId) -> RowGuard {
        self.locks.lock(format!("frame:{frame_id}"))
    }

    fn put_proc(&self, proc: &Proc) -> Result<()> {
        let cf_procs = self.cf(cf::PROCS)?;
        let cf_by_host = self.cf(cf::PROCS_BY_HOST)?;
        let cf_by_frame = self.cf(cf::PROCS_BY_FRAME)?;

        let frame_key = keys::frame_key(&proc.frame_id);
        if let Some(owner) = self.get_index_id(cf::PROCS_BY_FRAME, &frame_key)? {
            if owner != *proc.proc_id.as_bytes() {
                return Err(StoreError::Conflict(format!(
                    "frame {} is already bound to another proc",
                    proc.frame_id
                )));
            }
        }

        let old = self.get_proc(&proc.proc_id)?;
        let value = Self::serialize(proc)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_procs, keys::proc_key(&proc.proc_id), &value);

        if let Some(old) = old {
            if old.host_id != proc.host_id {
                batch.delete_cf(
                    &cf_by_host,
                    keys::host_proc_key(&old.host_id, &proc.proc_id),
                );
            }
            if old.frame_id != proc.frame_id {
                batch.delete_cf(&cf_by_frame, keys::frame_key(&old.frame_id));
            }
        }

        batch.put_cf(
            &cf_by_host,
            keys::host_proc_key(&proc.host_id, &proc.proc_id),
            [],
        );
        batch.put_cf(&cf_by_frame, &frame_key, proc.proc_id.as_bytes());

        self.write(batch)
    }

    fn get_proc(&self, proc_id: &ProcId) -> Result<Option<Proc>> {
        self.get_record(cf::PROCS, &keys::proc_key(proc_id))
    }

    fn find_proc_by_frame(&self, frame_id: &FrameId) -> Result<Option<Proc>> {
        match self.get_index_id(cf::PROCS_BY_FRAME, &keys::frame_key(frame_id))? {
            Some(bytes) => self.get_proc(&ProcId::from_bytes(bytes)),
            None => Ok(None),
        }
    }

    fn delete_proc(&self, proc_id: &ProcId) -> Result<()> {
        let cf_procs = self.cf(cf::PROCS)?;
        let cf_by_host = self.cf(cf::PROCS_BY_HOST)?;
        let cf_by_frame = self.cf(cf::PROCS_BY_FRAME)?;

        let proc = self.get_proc(proc_id)?.ok_or(StoreError::NotFound)?;
        let frame_key = keys::frame_key(&proc.frame_id);
        let owns_frame = self
            .get_index_id(cf::PROCS_BY_FRAME, &frame_key)?
            .is_some_and(|owner| owner == *proc_id.as_bytes());

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_procs, keys::proc_key(proc_id));
        batch.delete_cf(&cf_by_host, keys::host_proc_key(&proc.host_id, proc_id));
        if owns_frame {
            batch.delete_cf(&cf_by_frame, &frame_key);
        }

        self.write(batch)
    }

    fn list_procs_by_host(&self, host_id: &HostId) -> Result<Vec<Proc>> {
        let prefix = keys::host_prefix(host_id);

        let mut procs = Vec::new();
        for key in self.prefix_keys(cf::PROCS_BY_HOST, &prefix)? {
            let proc_id = keys::extract_proc_id_from_host_proc_key(&key);
            if let Some(proc) = self.get_proc(&proc_id)? {
                procs.push(proc);
            }
        }

        Ok(procs)
    }

    fn count_procs_by_host(&self, host_id: &HostId) -> Result<u32> {
        let prefix = keys::host_prefix(host_id);
        let count = self.prefix_keys(cf::PROCS_BY_HOST, &prefix)?.len();
        u32::try_from(count).map_err(|_| StoreError::Database("proc count overflow".to_string()))
    }

    fn list_all_procs(&self) -> Result<Vec<Proc>> {
        self.all_records(cf::PROCS)
    }
}
