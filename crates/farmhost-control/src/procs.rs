//! Proc booking and queries.
//!
//! A proc is a reservation of part of a host for one frame. Booking, starting
//! and unbooking all run under the row lock of the proc's host, the same lock
//! the host manager takes for allocation changes, so a host can never change
//! allocation while a booking on it is in flight. A booking also holds its
//! frame's row, taken after the host row, so a frame is bound to at most one
//! proc across all hosts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use farmhost_core::{AllocationId, FrameId, HostId, ProcId};
use farmhost_store::{Proc, ProcStatus, Store};

use crate::error::{ControlError, Result};
use crate::frames::FrameRegistry;
use crate::types::{BookingRequest, ProcCriteria, ProcSearch, RunningFrame, UnbookSummary};

/// Sum of cores reserved by a set of procs.
#[must_use]
pub fn reserved_cores(procs: &[Proc]) -> u32 {
    procs
        .iter()
        .map(|p| p.reserved_cores)
        .fold(0, u32::saturating_add)
}

/// Cores of a host not reserved by any of its bound procs.
#[must_use]
pub fn stranded_cores(cores: u32, procs: &[Proc]) -> u32 {
    cores.saturating_sub(reserved_cores(procs))
}

/// The proc using the most memory beyond its reservation.
///
/// Ties go to the proc using the most memory overall.
#[must_use]
pub fn worst_memory_offender(procs: Vec<Proc>) -> Option<Proc> {
    procs
        .into_iter()
        .max_by_key(|p| (p.memory_overage(), p.used_memory))
}

fn sort_procs(procs: &mut [Proc]) {
    procs.sort_by(|a, b| {
        a.booked_at
            .cmp(&b.booked_at)
            .then_with(|| a.proc_id.cmp(&b.proc_id))
    });
}

/// Proc bookings on top of the proc store.
pub struct ProcRegistry<S: Store, F: FrameRegistry> {
    store: Arc<S>,
    frames: Arc<F>,
}

impl<S: Store, F: FrameRegistry> ProcRegistry<S, F> {
    /// Create a new registry.
    #[must_use]
    pub fn new(store: Arc<S>, frames: Arc<F>) -> Self {
        Self { store, frames }
    }

    /// Find procs matching the given criteria.
    ///
    /// Results are ordered by booking time.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn find_virtual_procs(&self, criteria: &ProcCriteria) -> Result<Vec<Proc>> {
        let mut procs = match criteria {
            ProcCriteria::Host(host_id) => self.store.list_procs_by_host(host_id)?,
            ProcCriteria::HardwareState(state) => {
                let mut procs = Vec::new();
                for host in self.store.list_hosts_by_state(*state)? {
                    procs.extend(self.store.list_procs_by_host(&host.host_id)?);
                }
                procs
            }
            ProcCriteria::LocalAssignment(assignment) => self
                .store
                .list_all_procs()?
                .into_iter()
                .filter(|p| p.local_assignment == Some(*assignment))
                .collect(),
            ProcCriteria::Frame(frame_id) => {
                self.store.find_proc_by_frame(frame_id)?.into_iter().collect()
            }
            ProcCriteria::Search(search) => return self.search(search),
        };

        sort_procs(&mut procs);
        Ok(procs)
    }

    fn search(&self, search: &ProcSearch) -> Result<Vec<Proc>> {
        let candidates = if search.hosts.is_empty() {
            self.store.list_all_procs()?
        } else {
            let mut procs = Vec::new();
            for host_id in &search.hosts {
                procs.extend(self.store.list_procs_by_host(host_id)?);
            }
            procs
        };

        let mut allocation_of: HashMap<HostId, Option<AllocationId>> = HashMap::new();
        let mut found = Vec::new();

        for proc in candidates {
            if !search.matches_proc(&proc) {
                continue;
            }

            if !search.allocations.is_empty() {
                let allocation = if let Some(cached) = allocation_of.get(&proc.host_id) {
                    *cached
                } else {
                    let allocation = self
                        .store
                        .get_host(&proc.host_id)?
                        .map(|h| h.allocation_id);
                    allocation_of.insert(proc.host_id, allocation);
                    allocation
                };

                if !allocation.is_some_and(|a| search.allocations.contains(&a)) {
                    continue;
                }
            }

            found.push(proc);
        }

        sort_procs(&mut found);
        if let Some(limit) = search.limit {
            found.truncate(limit);
        }

        Ok(found)
    }

    /// Get the proc running a frame, if the frame is booked.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn find_virtual_proc(&self, frame_id: &FrameId) -> Result<Option<Proc>> {
        Ok(self.store.find_proc_by_frame(frame_id)?)
    }

    /// Get a proc by ID.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ProcNotFound` if the proc doesn't exist.
    pub fn get_virtual_proc(&self, proc_id: &ProcId) -> Result<Proc> {
        self.store
            .get_proc(proc_id)?
            .ok_or(ControlError::ProcNotFound(*proc_id))
    }

    /// Reserve part of a host for a frame.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::HostNotFound` if the host doesn't exist,
    /// `ControlError::Conflict` if the frame is already booked or the host
    /// lacks the cores, and `ControlError::InvalidRequest` for a zero-core booking.
    pub fn book_proc(&self, request: &BookingRequest) -> Result<Proc> {
        if request.cores == 0 {
            return Err(ControlError::InvalidRequest(
                "a booking must reserve at least one core".to_string(),
            ));
        }

        let _guard = self.store.lock_host(&request.host_id);
        let _frame_guard = self.store.lock_frame(&request.frame_id);

        let host = self
            .store
            .get_host(&request.host_id)?
            .ok_or(ControlError::HostNotFound(request.host_id))?;

        if let Some(existing) = self.store.find_proc_by_frame(&request.frame_id)? {
            return Err(ControlError::Conflict(format!(
                "frame {} is already booked on proc {}",
                request.frame_id, existing.proc_id
            )));
        }

        let bound = self.store.list_procs_by_host(&host.host_id)?;
        let idle = stranded_cores(host.cores, &bound);
        if request.cores > idle {
            return Err(ControlError::Conflict(format!(
                "host {} has {idle} idle cores, {} requested",
                host.name, request.cores
            )));
        }

        let now = Utc::now();
        let proc = Proc {
            proc_id: ProcId::generate(),
            host_id: host.host_id,
            frame_id: request.frame_id,
            job_id: request.job_id,
            show_id: request.show_id,
            local_assignment: request.local_assignment,
            reserved_cores: request.cores,
            reserved_memory: request.memory,
            reserved_gpu: request.gpu,
            used_memory: 0,
            peak_memory: 0,
            status: ProcStatus::Booked,
            booked_at: now,
            updated_at: now,
        };

        self.store.put_proc(&proc)?;

        tracing::info!(
            proc_id = %proc.proc_id,
            host_id = %host.host_id,
            frame_id = %proc.frame_id,
            cores = proc.reserved_cores,
            "Booked proc"
        );

        Ok(proc)
    }

    /// Mark a booked proc as running.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ProcNotFound` if the proc doesn't exist.
    pub fn start_proc(&self, proc_id: &ProcId) -> Result<Proc> {
        let host_id = self.get_virtual_proc(proc_id)?.host_id;
        let _guard = self.store.lock_host(&host_id);

        let mut proc = self.get_virtual_proc(proc_id)?;
        if proc.status != ProcStatus::Running {
            proc.status = ProcStatus::Running;
            proc.updated_at = Utc::now();
            self.store.put_proc(&proc)?;
            tracing::debug!(proc_id = %proc_id, "Started proc");
        }

        Ok(proc)
    }

    /// Release a proc's reservation.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ProcNotFound` if the proc doesn't exist.
    pub fn unbook_proc(&self, proc_id: &ProcId) -> Result<Proc> {
        let host_id = self.get_virtual_proc(proc_id)?.host_id;
        let _guard = self.store.lock_host(&host_id);

        let proc = self.get_virtual_proc(proc_id)?;
        self.store.delete_proc(proc_id)?;

        tracing::info!(
            proc_id = %proc_id,
            host_id = %host_id,
            frame_id = %proc.frame_id,
            "Unbooked proc"
        );

        Ok(proc)
    }

    /// Release many procs. Each proc is handled on its own.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::UnbookFailed` only if procs were given and none
    /// could be released.
    pub fn unbook_virtual_procs(&self, proc_ids: &[ProcId]) -> Result<UnbookSummary> {
        let mut summary = UnbookSummary::default();

        for proc_id in proc_ids {
            match self.unbook_proc(proc_id) {
                Ok(_) => summary.unbooked.push(*proc_id),
                Err(e) => {
                    tracing::warn!(proc_id = %proc_id, error = %e, "Failed to unbook proc");
                    summary.failures.push((*proc_id, e.to_string()));
                }
            }
        }

        if !proc_ids.is_empty() && summary.unbooked.is_empty() {
            return Err(ControlError::UnbookFailed {
                failed: summary.failure_count(),
            });
        }

        if summary.failure_count() > 0 {
            tracing::warn!(
                unbooked = summary.unbooked.len(),
                failed = summary.failure_count(),
                "Bulk unbook finished with failures"
            );
        }

        Ok(summary)
    }

    /// Check that a proc still exists and is running the given frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn verify_running_proc(&self, proc_id: &ProcId, frame_id: &FrameId) -> Result<bool> {
        Ok(self
            .store
            .get_proc(proc_id)?
            .is_some_and(|p| p.frame_id == *frame_id))
    }

    /// Find the proc on a host using the most memory beyond its reservation.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::HostNotFound` if the host doesn't exist.
    pub fn get_worst_memory_offender(&self, host_id: &HostId) -> Result<Option<Proc>> {
        if self.store.get_host(host_id)?.is_none() {
            return Err(ControlError::HostNotFound(*host_id));
        }
        Ok(worst_memory_offender(self.store.list_procs_by_host(host_id)?))
    }

    /// Check whether a proc's frame is gone or no longer points at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame registry cannot be queried.
    pub async fn is_orphan(&self, proc: &Proc) -> Result<bool> {
        let orphan = match self.frames.lookup_frame(&proc.frame_id).await? {
            Some(frame) => frame.proc_id != Some(proc.proc_id),
            None => true,
        };
        Ok(orphan)
    }

    /// Record memory usage for a proc.
    ///
    /// The peak never decreases.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ProcNotFound` if the proc doesn't exist.
    pub fn update_memory_usage(&self, proc_id: &ProcId, used: u64, peak: u64) -> Result<Proc> {
        let host_id = self.get_virtual_proc(proc_id)?.host_id;
        let _guard = self.store.lock_host(&host_id);

        let mut proc = self.get_virtual_proc(proc_id)?;
        self.write_usage(&mut proc, used, peak)?;
        Ok(proc)
    }

    /// Record usage reported by a host for one of its running frames.
    ///
    /// Returns false if the proc is gone or is not this host's booking of the
    /// frame. The caller must hold the host's row lock.
    pub(crate) fn record_frame_usage(&self, host_id: &HostId, frame: &RunningFrame) -> Result<bool> {
        let Some(mut proc) = self.store.get_proc(&frame.proc_id)? else {
            return Ok(false);
        };
        if proc.host_id != *host_id || proc.frame_id != frame.frame_id {
            return Ok(false);
        }

        proc.status = ProcStatus::Running;
        self.write_usage(&mut proc, frame.used_memory, frame.peak_memory)?;
        Ok(true)
    }

    fn write_usage(&self, proc: &mut Proc, used: u64, peak: u64) -> Result<()> {
        proc.used_memory = used;
        proc.peak_memory = proc.peak_memory.max(peak).max(used);
        proc.updated_at = Utc::now();
        self.store.put_proc(proc)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{FrameRecord, InMemoryFrameRegistry};
    use farmhost_core::{JobId, LocalAssignmentId, ShowId};
    use farmhost_store::{
        HardwareState, Host, HostStore, LockState, ProcStore, ResourceStats, RocksStore,
    };
    use tempfile::TempDir;

    struct Fixture {
        registry: ProcRegistry<RocksStore, InMemoryFrameRegistry>,
        store: Arc<RocksStore>,
        frames: Arc<InMemoryFrameRegistry>,
        _dir: TempDir,
    }

    fn setup() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let frames = Arc::new(InMemoryFrameRegistry::new());
        let registry = ProcRegistry::new(Arc::clone(&store), Arc::clone(&frames));
        Fixture {
            registry,
            store,
            frames,
            _dir: dir,
        }
    }

    fn add_host(store: &RocksStore, name: &str, cores: u32) -> Host {
        let now = Utc::now();
        let host = Host {
            host_id: HostId::generate(),
            name: name.to_string(),
            allocation_id: AllocationId::generate(),
            lock_state: LockState::Open,
            lock_source: None,
            lock_changed_at: None,
            hardware_state: HardwareState::Up,
            cores,
            stats: ResourceStats::default(),
            manual_tags: std::collections::BTreeSet::new(),
            hardware_tags: std::collections::BTreeSet::new(),
            tags: vec![name.to_string()],
            preferred_show: None,
            created_at: now,
            updated_at: now,
            last_report_at: None,
        };
        store.put_host(&host).unwrap();
        host
    }

    fn request(host: &Host, cores: u32) -> BookingRequest {
        BookingRequest::new(host.host_id, FrameId::generate(), JobId::generate(), cores, 1024)
    }

    #[test]
    fn stranded_cores_saturates() {
        assert_eq!(stranded_cores(4, &[]), 4);
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        fixture.registry.book_proc(&request(&host, 3)).unwrap();
        let procs = fixture.store.list_procs_by_host(&host.host_id).unwrap();
        assert_eq!(reserved_cores(&procs), 3);
        assert_eq!(stranded_cores(8, &procs), 5);
        assert_eq!(stranded_cores(2, &procs), 0);
    }

    #[test]
    fn booking_rejects_over_reservation() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 4);

        fixture.registry.book_proc(&request(&host, 3)).unwrap();
        let result = fixture.registry.book_proc(&request(&host, 2));

        assert!(matches!(result, Err(ControlError::Conflict(_))));
        assert_eq!(fixture.store.count_procs_by_host(&host.host_id).unwrap(), 1);
    }

    #[test]
    fn booking_rejects_unknown_host_and_zero_cores() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 4);

        let mut unknown = request(&host, 1);
        unknown.host_id = HostId::generate();
        assert!(matches!(
            fixture.registry.book_proc(&unknown),
            Err(ControlError::HostNotFound(_))
        ));

        assert!(matches!(
            fixture.registry.book_proc(&request(&host, 0)),
            Err(ControlError::InvalidRequest(_))
        ));
    }

    #[test]
    fn frame_booked_once() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);

        let first = request(&host, 1);
        fixture.registry.book_proc(&first).unwrap();

        let mut again = request(&host, 1);
        again.frame_id = first.frame_id;
        let result = fixture.registry.book_proc(&again);
        assert!(matches!(result, Err(ControlError::Conflict(_))));
    }

    #[test]
    fn frame_booked_once_across_hosts() {
        let fixture = setup();
        let hosts: Vec<_> = (0..8)
            .map(|i| add_host(&fixture.store, &format!("render{i:02}"), 8))
            .collect();
        let frame_id = FrameId::generate();
        let job_id = JobId::generate();

        let booked = std::thread::scope(|scope| {
            let handles: Vec<_> = hosts
                .iter()
                .map(|host| {
                    let registry = &fixture.registry;
                    let booking = BookingRequest::new(host.host_id, frame_id, job_id, 1, 1024);
                    scope.spawn(move || registry.book_proc(&booking).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(booked, 1);
        let all = fixture.store.list_all_procs().unwrap();
        assert_eq!(all.len(), 1);
        let bound = fixture.registry.find_virtual_proc(&frame_id).unwrap().unwrap();
        assert_eq!(bound.proc_id, all[0].proc_id);

        fixture.registry.unbook_proc(&bound.proc_id).unwrap();
        assert!(fixture.registry.find_virtual_proc(&frame_id).unwrap().is_none());
    }

    #[test]
    fn unbook_then_verify() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let proc = fixture.registry.book_proc(&request(&host, 2)).unwrap();

        assert!(fixture
            .registry
            .verify_running_proc(&proc.proc_id, &proc.frame_id)
            .unwrap());
        assert!(!fixture
            .registry
            .verify_running_proc(&proc.proc_id, &FrameId::generate())
            .unwrap());

        fixture.registry.unbook_proc(&proc.proc_id).unwrap();
        assert!(!fixture
            .registry
            .verify_running_proc(&proc.proc_id, &proc.frame_id)
            .unwrap());
        assert!(matches!(
            fixture.registry.unbook_proc(&proc.proc_id),
            Err(ControlError::ProcNotFound(_))
        ));
    }

    #[test]
    fn bulk_unbook_is_best_effort() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let a = fixture.registry.book_proc(&request(&host, 1)).unwrap();
        let b = fixture.registry.book_proc(&request(&host, 1)).unwrap();
        let missing = ProcId::generate();

        let summary = fixture
            .registry
            .unbook_virtual_procs(&[a.proc_id, missing, b.proc_id])
            .unwrap();

        assert_eq!(summary.unbooked, vec![a.proc_id, b.proc_id]);
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.failures[0].0, missing);
        assert_eq!(fixture.store.count_procs_by_host(&host.host_id).unwrap(), 0);
    }

    #[test]
    fn bulk_unbook_fails_when_nothing_released() {
        let fixture = setup();
        let result = fixture
            .registry
            .unbook_virtual_procs(&[ProcId::generate(), ProcId::generate()]);
        assert!(matches!(result, Err(ControlError::UnbookFailed { failed: 2 })));

        let empty = fixture.registry.unbook_virtual_procs(&[]).unwrap();
        assert!(empty.unbooked.is_empty());
    }

    #[test]
    fn worst_offender_breaks_ties_on_usage() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let small = fixture.registry.book_proc(&request(&host, 1)).unwrap();
        let large = fixture.registry.book_proc(&request(&host, 1)).unwrap();
        let under = fixture.registry.book_proc(&request(&host, 1)).unwrap();

        // Both 512 KB over the 1024 KB reservation; `large` uses more.
        fixture
            .registry
            .update_memory_usage(&small.proc_id, 1536, 1536)
            .unwrap();
        let mut large_proc = fixture.registry.get_virtual_proc(&large.proc_id).unwrap();
        large_proc.reserved_memory = 2048;
        fixture.store.put_proc(&large_proc).unwrap();
        fixture
            .registry
            .update_memory_usage(&large.proc_id, 2560, 2560)
            .unwrap();
        fixture
            .registry
            .update_memory_usage(&under.proc_id, 10, 10)
            .unwrap();

        let worst = fixture
            .registry
            .get_worst_memory_offender(&host.host_id)
            .unwrap()
            .unwrap();
        assert_eq!(worst.proc_id, large.proc_id);

        assert!(matches!(
            fixture.registry.get_worst_memory_offender(&HostId::generate()),
            Err(ControlError::HostNotFound(_))
        ));
    }

    #[test]
    fn peak_memory_never_drops() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let proc = fixture.registry.book_proc(&request(&host, 1)).unwrap();

        fixture
            .registry
            .update_memory_usage(&proc.proc_id, 4096, 4096)
            .unwrap();
        let updated = fixture
            .registry
            .update_memory_usage(&proc.proc_id, 1024, 2048)
            .unwrap();

        assert_eq!(updated.used_memory, 1024);
        assert_eq!(updated.peak_memory, 4096);
    }

    #[test]
    fn report_usage_only_for_own_procs() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let other = add_host(&fixture.store, "render02", 8);
        let proc = fixture.registry.book_proc(&request(&host, 1)).unwrap();

        let frame = RunningFrame {
            proc_id: proc.proc_id,
            frame_id: proc.frame_id,
            used_memory: 900,
            peak_memory: 1000,
        };
        assert!(!fixture
            .registry
            .record_frame_usage(&other.host_id, &frame)
            .unwrap());
        assert!(fixture
            .registry
            .record_frame_usage(&host.host_id, &frame)
            .unwrap());

        let stored = fixture.registry.get_virtual_proc(&proc.proc_id).unwrap();
        assert_eq!(stored.status, ProcStatus::Running);
        assert_eq!(stored.peak_memory, 1000);
    }

    #[test]
    fn start_proc_marks_running() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let proc = fixture.registry.book_proc(&request(&host, 1)).unwrap();
        assert_eq!(proc.status, ProcStatus::Booked);

        let started = fixture.registry.start_proc(&proc.proc_id).unwrap();
        assert_eq!(started.status, ProcStatus::Running);
    }

    #[tokio::test]
    async fn orphan_detection() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let proc = fixture.registry.book_proc(&request(&host, 1)).unwrap();

        // Frame unknown to the job system.
        assert!(fixture.registry.is_orphan(&proc).await.unwrap());

        fixture.frames.insert(FrameRecord {
            frame_id: proc.frame_id,
            job_id: proc.job_id,
            proc_id: Some(proc.proc_id),
        });
        assert!(!fixture.registry.is_orphan(&proc).await.unwrap());

        // Frame moved to another proc.
        fixture.frames.bind(&proc.frame_id, ProcId::generate());
        assert!(fixture.registry.is_orphan(&proc).await.unwrap());
    }

    #[test]
    fn find_by_criteria() {
        let fixture = setup();
        let up = add_host(&fixture.store, "render01", 8);
        let repair = add_host(&fixture.store, "render02", 8);
        fixture
            .store
            .update_host_state(&repair.host_id, HardwareState::Repair)
            .unwrap();

        let assignment = LocalAssignmentId::generate();
        let show = ShowId::generate();
        let mut local = request(&up, 1);
        local.local_assignment = Some(assignment);
        local.show_id = Some(show);
        let local = fixture.registry.book_proc(&local).unwrap();
        let plain = fixture.registry.book_proc(&request(&up, 1)).unwrap();
        let broken = fixture.registry.book_proc(&request(&repair, 1)).unwrap();

        let on_up = fixture
            .registry
            .find_virtual_procs(&ProcCriteria::Host(up.host_id))
            .unwrap();
        assert_eq!(on_up.len(), 2);

        let in_repair = fixture
            .registry
            .find_virtual_procs(&ProcCriteria::HardwareState(HardwareState::Repair))
            .unwrap();
        assert_eq!(in_repair.len(), 1);
        assert_eq!(in_repair[0].proc_id, broken.proc_id);

        let by_assignment = fixture
            .registry
            .find_virtual_procs(&ProcCriteria::LocalAssignment(assignment))
            .unwrap();
        assert_eq!(by_assignment.len(), 1);
        assert_eq!(by_assignment[0].proc_id, local.proc_id);

        let by_frame = fixture
            .registry
            .find_virtual_proc(&plain.frame_id)
            .unwrap()
            .unwrap();
        assert_eq!(by_frame.proc_id, plain.proc_id);

        let by_show = fixture
            .registry
            .find_virtual_procs(&ProcCriteria::Search(ProcSearch {
                shows: vec![show],
                ..ProcSearch::default()
            }))
            .unwrap();
        assert_eq!(by_show.len(), 1);
    }

    #[test]
    fn search_by_allocation_with_limit() {
        let fixture = setup();
        let host = add_host(&fixture.store, "render01", 8);
        let elsewhere = add_host(&fixture.store, "render02", 8);
        for _ in 0..3 {
            fixture.registry.book_proc(&request(&host, 1)).unwrap();
        }
        fixture.registry.book_proc(&request(&elsewhere, 1)).unwrap();

        let found = fixture
            .registry
            .find_virtual_procs(&ProcCriteria::Search(ProcSearch {
                allocations: vec![host.allocation_id],
                limit: Some(2),
                ..ProcSearch::default()
            }))
            .unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.host_id == host.host_id));
    }
}
