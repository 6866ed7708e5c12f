//! Host manager service implementation.
//!
//! This module provides the `HostManager` trait and `HostManagerService`
//! implementation that coordinates host state, allocations and proc bookings.
//!
//! Every mutation of a host runs inside a synchronous helper that holds the
//! host's row lock for its whole read-check-write. Calls to host agents happen
//! between those helpers, never while a row lock is held.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use farmhost_core::{AllocationId, FrameId, HostId, ProcId, ShowId};
use farmhost_store::{Allocation, HardwareState, Host, LockState, Proc, Store, StoreError};

use crate::agent_client::HostAgentClient;
use crate::error::{ControlError, Result};
use crate::frames::FrameRegistry;
use crate::lifecycle;
use crate::procs::{reserved_cores, stranded_cores, ProcRegistry};
use crate::search::HostFilter;
use crate::tags;
use crate::types::{
    BookingRequest, DispatchHost, HostReport, HostSearch, ManagerConfig, ProcCriteria,
    RenderHost, UnbookSummary,
};

/// Trait defining the host manager operations.
///
/// This trait provides the complete API used by render host agents, operators
/// and the scheduler.
#[async_trait]
pub trait HostManager: Send + Sync {
    // =========================================================================
    // Host Lifecycle
    // =========================================================================

    /// Set a host's lock state, recording who changed it.
    async fn set_lock(&self, host_id: &HostId, state: LockState, source: &str) -> Result<Host>;

    /// Write a host's hardware state without contacting its agent.
    async fn set_hardware_state(&self, host_id: &HostId, state: HardwareState) -> Result<Host>;

    /// Ask a host to reboot once its frames finish.
    ///
    /// The host is left in `RebootWhenIdle` even if its agent cannot be reached.
    async fn reboot_when_idle(&self, host_id: &HostId) -> Result<()>;

    /// Ask a host to reboot immediately.
    ///
    /// If the agent cannot be reached the host is marked `Down`.
    async fn reboot_now(&self, host_id: &HostId) -> Result<()>;

    /// Overwrite a host's live resource figures from a report.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidRequest` if the report names another host.
    async fn ingest_resource_report(&self, host_id: &HostId, report: &HostReport) -> Result<Host>;

    /// Register a host, or return the existing host with the same name.
    ///
    /// A new host joins `allocation`, or the default allocation when `None`.
    async fn create_host(
        &self,
        render_host: &RenderHost,
        allocation: Option<AllocationId>,
    ) -> Result<Host>;

    /// Create the reporting host on first sight, then ingest the report.
    async fn process_host_report(&self, report: &HostReport) -> Result<Host>;

    /// Delete a host.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` if procs are still bound to the host.
    async fn delete_host(&self, host_id: &HostId) -> Result<()>;

    // =========================================================================
    // Tags and Allocation
    // =========================================================================

    /// Add manual tags. Blank tags are ignored.
    async fn add_tags(&self, host_id: &HostId, tags: &[String]) -> Result<Host>;

    /// Remove manual tags.
    async fn remove_tags(&self, host_id: &HostId, tags: &[String]) -> Result<Host>;

    /// Rename a manual tag. Does nothing if the host has no such tag.
    async fn rename_tag(&self, host_id: &HostId, old: &str, new: &str) -> Result<Host>;

    /// Replace a host's hardware capability tags.
    async fn set_hardware_tags(&self, host_id: &HostId, tags: &[String]) -> Result<Host>;

    /// Move a host to another allocation.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` if procs are bound to the host.
    async fn set_allocation(&self, host_id: &HostId, allocation_id: &AllocationId)
        -> Result<Host>;

    /// Create an allocation. The first allocation created becomes the default.
    async fn create_allocation(&self, name: &str, tag: &str) -> Result<Allocation>;

    /// Get the default allocation.
    async fn get_default_allocation(&self) -> Result<Allocation>;

    /// Make an allocation the default.
    async fn set_default_allocation(&self, allocation_id: &AllocationId) -> Result<Allocation>;

    // =========================================================================
    // Host Queries
    // =========================================================================

    /// Get a host by ID.
    async fn get_host(&self, host_id: &HostId) -> Result<Host>;

    /// Get a host by name.
    async fn find_host(&self, name: &str) -> Result<Host>;

    /// Get the dispatch view of a host by ID.
    async fn get_dispatch_host(&self, host_id: &HostId) -> Result<DispatchHost>;

    /// Get the dispatch view of a host by name.
    async fn find_dispatch_host(&self, name: &str) -> Result<DispatchHost>;

    /// Search hosts, ordered by name.
    async fn search_hosts(&self, search: &HostSearch) -> Result<Vec<Host>>;

    /// Cores on the host not reserved by any bound proc.
    async fn get_stranded_core_units(&self, host_id: &HostId) -> Result<u32>;

    /// Whether the host is locked or NIMBY locked.
    async fn is_locked(&self, host_id: &HostId) -> Result<bool>;

    /// Whether the host's hardware state is `Up`.
    async fn is_host_up(&self, host_id: &HostId) -> Result<bool>;

    /// Whether the host is swapping hard enough to reclaim its procs.
    async fn is_swapping(&self, host_id: &HostId) -> Result<bool>;

    /// Whether the host prefers work from a particular show.
    async fn is_prefer_show(&self, host_id: &HostId) -> Result<bool>;

    /// The show the host prefers, if any.
    async fn get_preferred_show(&self, host_id: &HostId) -> Result<Option<ShowId>>;

    // =========================================================================
    // Procs
    // =========================================================================

    /// Find procs matching the given criteria.
    async fn find_virtual_procs(&self, criteria: &ProcCriteria) -> Result<Vec<Proc>>;

    /// Get the proc running a frame, if any.
    async fn find_virtual_proc(&self, frame_id: &FrameId) -> Result<Option<Proc>>;

    /// Get a proc by ID.
    async fn get_virtual_proc(&self, proc_id: &ProcId) -> Result<Proc>;

    /// Reserve part of a host for a frame.
    async fn book_proc(&self, request: &BookingRequest) -> Result<Proc>;

    /// Mark a booked proc as running.
    async fn start_proc(&self, proc_id: &ProcId) -> Result<Proc>;

    /// Release a proc.
    async fn unbook_proc(&self, proc_id: &ProcId) -> Result<()>;

    /// Release many procs, each on its own.
    async fn unbook_virtual_procs(&self, proc_ids: &[ProcId]) -> Result<UnbookSummary>;

    /// Check that a proc still exists and runs the given frame.
    async fn verify_running_proc(&self, proc_id: &ProcId, frame_id: &FrameId) -> Result<bool>;

    /// The proc on the host furthest over its memory reservation.
    async fn get_worst_memory_offender(&self, host_id: &HostId) -> Result<Option<Proc>>;

    /// Whether the proc's frame is gone or no longer points at it.
    async fn is_orphan(&self, proc_id: &ProcId) -> Result<bool>;

    /// Record memory usage for a proc.
    async fn update_memory_usage(&self, proc_id: &ProcId, used: u64, peak: u64) -> Result<Proc>;
}

/// The main host manager implementation.
pub struct HostManagerService<S: Store, A: HostAgentClient, F: FrameRegistry> {
    store: Arc<S>,
    agent: Arc<A>,
    procs: ProcRegistry<S, F>,
    config: ManagerConfig,
}

impl<S: Store, A: HostAgentClient, F: FrameRegistry> HostManagerService<S, A, F> {
    /// Create a new host manager.
    #[must_use]
    pub fn new(store: Arc<S>, agent: Arc<A>, frames: Arc<F>, config: ManagerConfig) -> Self {
        let procs = ProcRegistry::new(Arc::clone(&store), frames);
        Self {
            store,
            agent,
            procs,
            config,
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(store: Arc<S>, agent: Arc<A>, frames: Arc<F>) -> Self {
        Self::new(store, agent, frames, ManagerConfig::default())
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Make sure a default allocation exists, creating the configured one if not.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn ensure_default_allocation(&self) -> Result<Allocation> {
        if let Some(existing) = self.store.get_default_allocation()? {
            return Ok(existing);
        }

        let name = &self.config.default_allocation_name;
        let allocation = match self.store.find_allocation_by_name(name)? {
            Some(allocation) => allocation,
            None => match self.insert_allocation(name, &self.config.default_allocation_tag) {
                Ok(allocation) => allocation,
                // Lost a race with another bootstrap of the same name.
                Err(ControlError::Conflict(msg)) => self
                    .store
                    .find_allocation_by_name(name)?
                    .ok_or(ControlError::Conflict(msg))?,
                Err(e) => return Err(e),
            },
        };

        if self.store.claim_default_allocation(&allocation.allocation_id)? {
            tracing::info!(
                allocation_id = %allocation.allocation_id,
                name = %allocation.name,
                "Bootstrapped default allocation"
            );
        }

        self.store
            .get_default_allocation()?
            .ok_or(ControlError::NoDefaultAllocation)
    }

    fn load_host(&self, host_id: &HostId) -> Result<Host> {
        self.store
            .get_host(host_id)?
            .ok_or(ControlError::HostNotFound(*host_id))
    }

    fn load_host_by_name(&self, name: &str) -> Result<Host> {
        self.store
            .find_host_by_name(name)?
            .ok_or_else(|| ControlError::UnknownHostname(name.to_string()))
    }

    fn load_allocation(&self, allocation_id: &AllocationId) -> Result<Allocation> {
        self.store
            .get_allocation(allocation_id)?
            .ok_or(ControlError::AllocationNotFound(*allocation_id))
    }

    fn insert_allocation(&self, name: &str, tag: &str) -> Result<Allocation> {
        let name = tags::normalize(name)
            .ok_or_else(|| ControlError::InvalidRequest("allocation name is blank".to_string()))?;
        let tag = tags::normalize(tag)
            .ok_or_else(|| ControlError::InvalidRequest("allocation tag is blank".to_string()))?;

        if self.store.find_allocation_by_name(&name)?.is_some() {
            return Err(ControlError::Conflict(format!(
                "allocation {name} already exists"
            )));
        }

        let allocation = Allocation {
            allocation_id: AllocationId::generate(),
            name,
            tag,
            is_default: false,
            created_at: Utc::now(),
        };
        self.store.put_allocation(&allocation).map_err(|e| match e {
            StoreError::Conflict(msg) => ControlError::Conflict(msg),
            other => other.into(),
        })?;
        Ok(allocation)
    }

    /// Recompute a host's effective tags from its allocation and tag sets.
    fn retag(&self, host: &mut Host) -> Result<()> {
        let allocation_tag = self
            .store
            .get_allocation(&host.allocation_id)?
            .map(|a| a.tag);
        host.tags = tags::recompute(
            &host.name,
            allocation_tag.as_deref(),
            &host.manual_tags,
            &host.hardware_tags,
        );
        Ok(())
    }

    /// Read, modify and write a host under its row lock.
    fn mutate_host<M>(&self, host_id: &HostId, mutate: M) -> Result<Host>
    where
        M: FnOnce(&mut Host) -> Result<()>,
    {
        let _guard = self.store.lock_host(host_id);

        let mut host = self.load_host(host_id)?;
        mutate(&mut host)?;
        host.updated_at = Utc::now();
        self.store.put_host(&host)?;

        Ok(host)
    }

    /// Mutate a host's tag sets, then recompute its effective tags.
    fn mutate_tags<M>(&self, host_id: &HostId, mutate: M) -> Result<Host>
    where
        M: FnOnce(&mut Host) -> Result<()>,
    {
        self.mutate_host(host_id, |host| {
            mutate(host)?;
            self.retag(host)
        })
    }

    fn write_hardware_state(&self, host_id: &HostId, state: HardwareState) -> Result<Host> {
        self.mutate_host(host_id, |host| {
            host.hardware_state = state;
            Ok(())
        })
    }

    fn insert_host(&self, render_host: &RenderHost, allocation: Option<AllocationId>) -> Result<Host> {
        let name = tags::normalize(&render_host.name)
            .ok_or_else(|| ControlError::InvalidRequest("hostname is blank".to_string()))?;

        let _name_guard = self.store.lock_host_name(&name);

        if let Some(existing) = self.store.find_host_by_name(&name)? {
            return Ok(existing);
        }

        let allocation = match allocation {
            Some(allocation_id) => self.load_allocation(&allocation_id)?,
            None => self
                .store
                .get_default_allocation()?
                .ok_or(ControlError::NoDefaultAllocation)?,
        };

        let now = Utc::now();
        let manual_tags = BTreeSet::new();
        let hardware_tags = BTreeSet::new();
        let host = Host {
            host_id: HostId::generate(),
            tags: tags::recompute(&name, Some(&allocation.tag), &manual_tags, &hardware_tags),
            name,
            allocation_id: allocation.allocation_id,
            lock_state: LockState::Open,
            lock_source: None,
            lock_changed_at: None,
            hardware_state: HardwareState::Up,
            cores: render_host.cores,
            stats: render_host.stats.clone(),
            manual_tags,
            hardware_tags,
            preferred_show: None,
            created_at: now,
            updated_at: now,
            last_report_at: None,
        };

        self.store.put_host(&host)?;

        tracing::info!(
            host_id = %host.host_id,
            name = %host.name,
            allocation = %allocation.name,
            "Created host"
        );

        Ok(host)
    }

    fn ingest(&self, host_id: &HostId, report: &HostReport) -> Result<Host> {
        let _guard = self.store.lock_host(host_id);

        let host = self.load_host(host_id)?;
        if host.name != report.host.name.trim() {
            return Err(ControlError::InvalidRequest(format!(
                "report from {} cannot update host {}",
                report.host.name, host.name
            )));
        }

        self.store
            .update_host_stats(host_id, report.host.cores, &report.host.stats)?;

        let reserved = reserved_cores(&self.store.list_procs_by_host(host_id)?);
        if report.host.cores < reserved {
            tracing::warn!(
                host_id = %host_id,
                cores = report.host.cores,
                reserved,
                "Host reports fewer cores than its procs reserve"
            );
        }

        let mut recorded = 0usize;
        for frame in &report.running_frames {
            if self.procs.record_frame_usage(host_id, frame)? {
                recorded += 1;
            } else {
                tracing::debug!(
                    host_id = %host_id,
                    proc_id = %frame.proc_id,
                    frame_id = %frame.frame_id,
                    "Reported frame has no booking on this host"
                );
            }
        }

        tracing::debug!(
            host_id = %host_id,
            frames = report.running_frames.len(),
            recorded,
            "Ingested host report"
        );

        self.load_host(host_id)
    }

    fn reassign(&self, host_id: &HostId, allocation: &Allocation) -> Result<Host> {
        self.mutate_host(host_id, |host| {
            let bound = self.store.count_procs_by_host(host_id)?;
            if bound > 0 {
                return Err(ControlError::Conflict(format!(
                    "host {} has {bound} procs bound",
                    host.name
                )));
            }
            host.allocation_id = allocation.allocation_id;
            self.retag(host)
        })
    }

    fn remove_host(&self, host_id: &HostId) -> Result<()> {
        let _guard = self.store.lock_host(host_id);

        let host = self.load_host(host_id)?;
        let bound = self.store.count_procs_by_host(host_id)?;
        if bound > 0 {
            return Err(ControlError::Conflict(format!(
                "host {} has {bound} procs bound",
                host.name
            )));
        }
        self.store.delete_host(host_id)?;

        tracing::info!(host_id = %host_id, name = %host.name, "Deleted host");
        Ok(())
    }

    fn dispatch_view(&self, host: &Host) -> Result<DispatchHost> {
        let procs = self.store.list_procs_by_host(&host.host_id)?;
        Ok(DispatchHost::from_host(host, &procs))
    }

    /// Apply a failed reboot's fallback state, unless the host's state changed
    /// while the agent was being contacted.
    fn compensate_reboot(
        &self,
        host_id: &HostId,
        requested: HardwareState,
        fallback: HardwareState,
    ) -> Result<Host> {
        let host = self.mutate_host(host_id, |host| {
            if host.hardware_state == requested {
                host.hardware_state = fallback;
            }
            Ok(())
        })?;

        if host.hardware_state != fallback {
            tracing::info!(
                host_id = %host_id,
                state = ?host.hardware_state,
                "Hardware state changed during reboot request, keeping it"
            );
        }

        Ok(host)
    }

    /// Run the agent call for a reboot and compensate the state on failure.
    async fn reboot(&self, host_id: &HostId, requested: HardwareState) -> Result<()> {
        let host = self.write_hardware_state(host_id, requested)?;

        let outcome = if requested == HardwareState::Rebooting {
            self.agent.reboot_now(&host).await
        } else {
            self.agent.reboot_when_idle(&host).await
        };

        match outcome {
            Ok(()) => {
                tracing::info!(host_id = %host_id, state = ?requested, "Reboot requested");
            }
            Err(e) => {
                let fallback = lifecycle::state_after_failed_reboot(requested);
                tracing::warn!(
                    host_id = %host_id,
                    requested = ?requested,
                    fallback = ?fallback,
                    error = %e,
                    "Host agent did not take reboot command"
                );
                if fallback != requested {
                    self.compensate_reboot(host_id, requested, fallback)?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<S, A, F> HostManager for HostManagerService<S, A, F>
where
    S: Store + 'static,
    A: HostAgentClient + 'static,
    F: FrameRegistry + 'static,
{
    // =========================================================================
    // Host Lifecycle
    // =========================================================================

    async fn set_lock(&self, host_id: &HostId, state: LockState, source: &str) -> Result<Host> {
        let host = self.mutate_host(host_id, |host| {
            host.lock_state = state;
            host.lock_source = Some(source.to_string());
            host.lock_changed_at = Some(Utc::now());
            Ok(())
        })?;

        tracing::info!(host_id = %host_id, state = ?state, source, "Set host lock");

        Ok(host)
    }

    async fn set_hardware_state(&self, host_id: &HostId, state: HardwareState) -> Result<Host> {
        let host = self.write_hardware_state(host_id, state)?;

        tracing::info!(host_id = %host_id, state = ?state, "Set hardware state");

        Ok(host)
    }

    async fn reboot_when_idle(&self, host_id: &HostId) -> Result<()> {
        self.reboot(host_id, HardwareState::RebootWhenIdle).await
    }

    async fn reboot_now(&self, host_id: &HostId) -> Result<()> {
        self.reboot(host_id, HardwareState::Rebooting).await
    }

    async fn ingest_resource_report(&self, host_id: &HostId, report: &HostReport) -> Result<Host> {
        self.ingest(host_id, report)
    }

    async fn create_host(
        &self,
        render_host: &RenderHost,
        allocation: Option<AllocationId>,
    ) -> Result<Host> {
        self.insert_host(render_host, allocation)
    }

    async fn process_host_report(&self, report: &HostReport) -> Result<Host> {
        let host = match self.store.find_host_by_name(report.host.name.trim())? {
            Some(host) => host,
            None => self.insert_host(&report.host, None)?,
        };

        self.ingest(&host.host_id, report)
    }

    async fn delete_host(&self, host_id: &HostId) -> Result<()> {
        self.remove_host(host_id)
    }

    // =========================================================================
    // Tags and Allocation
    // =========================================================================

    async fn add_tags(&self, host_id: &HostId, tags: &[String]) -> Result<Host> {
        let added = tags::normalize_all(tags);
        self.mutate_tags(host_id, |host| {
            host.manual_tags.extend(added);
            Ok(())
        })
    }

    async fn remove_tags(&self, host_id: &HostId, tags: &[String]) -> Result<Host> {
        let removed = tags::normalize_all(tags);
        self.mutate_tags(host_id, |host| {
            host.manual_tags.retain(|t| !removed.contains(t));
            Ok(())
        })
    }

    async fn rename_tag(&self, host_id: &HostId, old: &str, new: &str) -> Result<Host> {
        let new = tags::normalize(new)
            .ok_or_else(|| ControlError::InvalidRequest("new tag is blank".to_string()))?;
        let old = old.trim().to_string();

        self.mutate_tags(host_id, |host| {
            if host.manual_tags.remove(&old) {
                host.manual_tags.insert(new);
            }
            Ok(())
        })
    }

    async fn set_hardware_tags(&self, host_id: &HostId, tags: &[String]) -> Result<Host> {
        let hardware = tags::normalize_all(tags);
        let host = self.mutate_tags(host_id, |host| {
            host.hardware_tags = hardware;
            Ok(())
        })?;

        tracing::info!(host_id = %host_id, tags = ?host.hardware_tags, "Set hardware tags");

        Ok(host)
    }

    async fn set_allocation(
        &self,
        host_id: &HostId,
        allocation_id: &AllocationId,
    ) -> Result<Host> {
        let allocation = self.load_allocation(allocation_id)?;

        // Cheap rejection before queueing on the row lock; re-checked under it.
        if self.store.count_procs_by_host(host_id)? > 0 {
            return Err(ControlError::Conflict(format!(
                "host {host_id} has procs bound"
            )));
        }

        let host = self.reassign(host_id, &allocation)?;

        tracing::info!(
            host_id = %host_id,
            allocation = %allocation.name,
            "Moved host to allocation"
        );

        Ok(host)
    }

    async fn create_allocation(&self, name: &str, tag: &str) -> Result<Allocation> {
        let allocation = self.insert_allocation(name, tag)?;
        self.store.claim_default_allocation(&allocation.allocation_id)?;

        tracing::info!(
            allocation_id = %allocation.allocation_id,
            name = %allocation.name,
            "Created allocation"
        );

        self.load_allocation(&allocation.allocation_id)
    }

    async fn get_default_allocation(&self) -> Result<Allocation> {
        self.store
            .get_default_allocation()?
            .ok_or(ControlError::NoDefaultAllocation)
    }

    async fn set_default_allocation(&self, allocation_id: &AllocationId) -> Result<Allocation> {
        self.store
            .set_default_allocation(allocation_id)
            .map_err(|e| match e {
                StoreError::NotFound => ControlError::AllocationNotFound(*allocation_id),
                other => other.into(),
            })?;

        tracing::info!(allocation_id = %allocation_id, "Set default allocation");

        self.load_allocation(allocation_id)
    }

    // =========================================================================
    // Host Queries
    // =========================================================================

    async fn get_host(&self, host_id: &HostId) -> Result<Host> {
        self.load_host(host_id)
    }

    async fn find_host(&self, name: &str) -> Result<Host> {
        self.load_host_by_name(name)
    }

    async fn get_dispatch_host(&self, host_id: &HostId) -> Result<DispatchHost> {
        let host = self.load_host(host_id)?;
        self.dispatch_view(&host)
    }

    async fn find_dispatch_host(&self, name: &str) -> Result<DispatchHost> {
        let host = self.load_host_by_name(name)?;
        self.dispatch_view(&host)
    }

    async fn search_hosts(&self, search: &HostSearch) -> Result<Vec<Host>> {
        let filter = HostFilter::compile(search)?;

        let candidates = if search.states.is_empty() {
            self.store.list_all_hosts()?
        } else {
            let mut hosts = Vec::new();
            for state in &search.states {
                hosts.extend(self.store.list_hosts_by_state(*state)?);
            }
            hosts
        };

        let mut hosts: Vec<Host> = candidates.into_iter().filter(|h| filter.matches(h)).collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        hosts.dedup_by(|a, b| a.host_id == b.host_id);

        Ok(hosts)
    }

    async fn get_stranded_core_units(&self, host_id: &HostId) -> Result<u32> {
        let host = self.load_host(host_id)?;
        let procs = self.store.list_procs_by_host(host_id)?;
        Ok(stranded_cores(host.cores, &procs))
    }

    async fn is_locked(&self, host_id: &HostId) -> Result<bool> {
        Ok(lifecycle::is_locked(self.load_host(host_id)?.lock_state))
    }

    async fn is_host_up(&self, host_id: &HostId) -> Result<bool> {
        Ok(lifecycle::is_up(self.load_host(host_id)?.hardware_state))
    }

    async fn is_swapping(&self, host_id: &HostId) -> Result<bool> {
        let host = self.load_host(host_id)?;
        Ok(lifecycle::is_kill_mode(
            &host.stats,
            self.config.kill_mode_min_swap_used,
            self.config.kill_mode_max_free_memory,
        ))
    }

    async fn is_prefer_show(&self, host_id: &HostId) -> Result<bool> {
        Ok(self.load_host(host_id)?.preferred_show.is_some())
    }

    async fn get_preferred_show(&self, host_id: &HostId) -> Result<Option<ShowId>> {
        Ok(self.load_host(host_id)?.preferred_show)
    }

    // =========================================================================
    // Procs
    // =========================================================================

    async fn find_virtual_procs(&self, criteria: &ProcCriteria) -> Result<Vec<Proc>> {
        self.procs.find_virtual_procs(criteria)
    }

    async fn find_virtual_proc(&self, frame_id: &FrameId) -> Result<Option<Proc>> {
        self.procs.find_virtual_proc(frame_id)
    }

    async fn get_virtual_proc(&self, proc_id: &ProcId) -> Result<Proc> {
        self.procs.get_virtual_proc(proc_id)
    }

    async fn book_proc(&self, request: &BookingRequest) -> Result<Proc> {
        self.procs.book_proc(request)
    }

    async fn start_proc(&self, proc_id: &ProcId) -> Result<Proc> {
        self.procs.start_proc(proc_id)
    }

    async fn unbook_proc(&self, proc_id: &ProcId) -> Result<()> {
        self.procs.unbook_proc(proc_id).map(|_| ())
    }

    async fn unbook_virtual_procs(&self, proc_ids: &[ProcId]) -> Result<UnbookSummary> {
        self.procs.unbook_virtual_procs(proc_ids)
    }

    async fn verify_running_proc(&self, proc_id: &ProcId, frame_id: &FrameId) -> Result<bool> {
        self.procs.verify_running_proc(proc_id, frame_id)
    }

    async fn get_worst_memory_offender(&self, host_id: &HostId) -> Result<Option<Proc>> {
        self.procs.get_worst_memory_offender(host_id)
    }

    async fn is_orphan(&self, proc_id: &ProcId) -> Result<bool> {
        let proc = self.procs.get_virtual_proc(proc_id)?;
        self.procs.is_orphan(&proc).await
    }

    async fn update_memory_usage(&self, proc_id: &ProcId, used: u64, peak: u64) -> Result<Proc> {
        self.procs.update_memory_usage(proc_id, used, peak)
    }
}
