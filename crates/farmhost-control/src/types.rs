//! Request, report and configuration types for host manager operations.
//!
//! These types define the contracts between render host agents, the scheduler
//! and the host manager.

use std::time::Duration;

use farmhost_core::{
    AllocationId, FrameId, HostId, JobId, LocalAssignmentId, ProcId, ShowId,
};
use farmhost_store::{HardwareState, Host, LockState, Proc, ProcStatus, ResourceStats};
use serde::{Deserialize, Serialize};

use crate::lifecycle;

/// Identity and capacity of a render host, as reported by its agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderHost {
    /// Hostname. Must be unique across the farm.
    pub name: String,
    /// Total core capacity.
    pub cores: u32,
    /// Live resource figures.
    pub stats: ResourceStats,
}

/// A frame currently running on a reporting host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningFrame {
    /// The proc the frame was booked under.
    pub proc_id: ProcId,
    /// The frame being run.
    pub frame_id: FrameId,
    /// Memory in use, in kilobytes.
    pub used_memory: u64,
    /// Peak memory used so far, in kilobytes.
    pub peak_memory: u64,
}

/// A periodic status report pushed by a render host agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostReport {
    /// The reporting host.
    pub host: RenderHost,
    /// Frames the host is currently running.
    #[serde(default)]
    pub running_frames: Vec<RunningFrame>,
}

impl HostReport {
    /// A report from a host with no running frames.
    #[must_use]
    pub fn idle(name: impl Into<String>, cores: u32, stats: ResourceStats) -> Self {
        Self {
            host: RenderHost {
                name: name.into(),
                cores,
                stats,
            },
            running_frames: Vec::new(),
        }
    }
}

/// A host as seen by the dispatcher: the host record plus what is left to book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchHost {
    /// Host identifier.
    pub host_id: HostId,
    /// Hostname.
    pub name: String,
    /// Allocation the host belongs to.
    pub allocation_id: AllocationId,
    /// Lock state.
    pub lock_state: LockState,
    /// Hardware state.
    pub hardware_state: HardwareState,
    /// Total cores.
    pub cores: u32,
    /// Cores not reserved by any bound proc.
    pub idle_cores: u32,
    /// Physical memory not reserved by any bound proc, in kilobytes.
    pub idle_memory: u64,
    /// GPU memory not reserved by any bound proc, in kilobytes.
    pub idle_gpu: u64,
    /// Effective tags.
    pub tags: Vec<String>,
    /// Whether the scheduler may place new work here.
    pub dispatchable: bool,
}

impl DispatchHost {
    /// Build the dispatch view of a host from its currently bound procs.
    #[must_use]
    pub fn from_host(host: &Host, procs: &[Proc]) -> Self {
        let reserved_memory: u64 = procs.iter().map(|p| p.reserved_memory).sum();
        let reserved_gpu: u64 = procs.iter().map(|p| p.reserved_gpu).sum();

        Self {
            host_id: host.host_id,
            name: host.name.clone(),
            allocation_id: host.allocation_id,
            lock_state: host.lock_state,
            hardware_state: host.hardware_state,
            cores: host.cores,
            idle_cores: crate::procs::stranded_cores(host.cores, procs),
            idle_memory: host.stats.total_memory.saturating_sub(reserved_memory),
            idle_gpu: host.stats.total_gpu.saturating_sub(reserved_gpu),
            tags: host.tags.clone(),
            dispatchable: lifecycle::is_dispatchable(host.lock_state, host.hardware_state),
        }
    }
}

/// Criteria for searching hosts. Empty lists match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostSearch {
    /// Regular expressions matched against the hostname. A host matches if any does.
    #[serde(default)]
    pub names: Vec<String>,
    /// Allocations the host must belong to.
    #[serde(default)]
    pub allocations: Vec<AllocationId>,
    /// Hardware states the host must be in.
    #[serde(default)]
    pub states: Vec<HardwareState>,
}

/// Free-form criteria for searching procs. Empty lists and `None` match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcSearch {
    /// Hosts the proc must be bound to.
    #[serde(default)]
    pub hosts: Vec<HostId>,
    /// Allocations the proc's host must belong to.
    #[serde(default)]
    pub allocations: Vec<AllocationId>,
    /// Jobs the proc must belong to.
    #[serde(default)]
    pub jobs: Vec<JobId>,
    /// Shows the proc must belong to.
    #[serde(default)]
    pub shows: Vec<ShowId>,
    /// Booking statuses to include.
    #[serde(default)]
    pub statuses: Vec<ProcStatus>,
    /// Minimum memory in use, in kilobytes.
    #[serde(default)]
    pub min_used_memory: Option<u64>,
    /// Maximum memory in use, in kilobytes.
    #[serde(default)]
    pub max_used_memory: Option<u64>,
    /// Maximum number of procs to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ProcSearch {
    /// Check the proc-local criteria (everything except allocations).
    #[must_use]
    pub fn matches_proc(&self, proc: &Proc) -> bool {
        (self.hosts.is_empty() || self.hosts.contains(&proc.host_id))
            && (self.jobs.is_empty() || self.jobs.contains(&proc.job_id))
            && (self.shows.is_empty() || proc.show_id.is_some_and(|s| self.shows.contains(&s)))
            && (self.statuses.is_empty() || self.statuses.contains(&proc.status))
            && self.min_used_memory.is_none_or(|min| proc.used_memory >= min)
            && self.max_used_memory.is_none_or(|max| proc.used_memory <= max)
    }
}

/// How to select procs in `find_virtual_procs`.
#[derive(Debug, Clone)]
pub enum ProcCriteria {
    /// Procs bound to one host.
    Host(HostId),
    /// Procs bound to any host in the given hardware state.
    HardwareState(HardwareState),
    /// Procs booked under a local assignment.
    LocalAssignment(LocalAssignmentId),
    /// The proc running a frame.
    Frame(FrameId),
    /// Free-form search.
    Search(ProcSearch),
}

/// Request from the scheduler to reserve part of a host for a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Host to book on.
    pub host_id: HostId,
    /// Frame to run.
    pub frame_id: FrameId,
    /// Job owning the frame.
    pub job_id: JobId,
    /// Show owning the job.
    #[serde(default)]
    pub show_id: Option<ShowId>,
    /// Local assignment the booking is made under.
    #[serde(default)]
    pub local_assignment: Option<LocalAssignmentId>,
    /// Cores to reserve.
    pub cores: u32,
    /// Memory to reserve, in kilobytes.
    pub memory: u64,
    /// GPU memory to reserve, in kilobytes.
    #[serde(default)]
    pub gpu: u64,
}

impl BookingRequest {
    /// Create a request for the given cores and memory with no show or local assignment.
    #[must_use]
    pub const fn new(
        host_id: HostId,
        frame_id: FrameId,
        job_id: JobId,
        cores: u32,
        memory: u64,
    ) -> Self {
        Self {
            host_id,
            frame_id,
            job_id,
            show_id: None,
            local_assignment: None,
            cores,
            memory,
            gpu: 0,
        }
    }
}

/// Outcome of a bulk unbook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnbookSummary {
    /// Procs that were released.
    pub unbooked: Vec<ProcId>,
    /// Procs that could not be released, with the reason.
    pub failures: Vec<(ProcId, String)>,
}

impl UnbookSummary {
    /// Number of procs that could not be released.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Configuration for the host manager.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Port the render host agents listen on.
    #[serde(default = "ManagerConfig::default_agent_port")]
    pub agent_port: u16,

    /// Agent request timeout in seconds.
    #[serde(default = "ManagerConfig::default_agent_request_timeout")]
    pub agent_request_timeout_seconds: u64,

    /// Agent connect timeout in seconds.
    #[serde(default = "ManagerConfig::default_agent_connect_timeout")]
    pub agent_connect_timeout_seconds: u64,

    /// Swap in use above which a host may be in kill mode, in kilobytes.
    #[serde(default = "ManagerConfig::default_kill_mode_swap")]
    pub kill_mode_min_swap_used: u64,

    /// Free memory below which a host may be in kill mode, in kilobytes.
    #[serde(default = "ManagerConfig::default_kill_mode_memory")]
    pub kill_mode_max_free_memory: u64,

    /// Name of the allocation created at startup if no default exists.
    #[serde(default = "ManagerConfig::default_allocation_name")]
    pub default_allocation_name: String,

    /// Tag of the allocation created at startup if no default exists.
    #[serde(default = "ManagerConfig::default_allocation_tag")]
    pub default_allocation_tag: String,
}

impl ManagerConfig {
    const fn default_agent_port() -> u16 {
        8444
    }

    const fn default_agent_request_timeout() -> u64 {
        10
    }

    const fn default_agent_connect_timeout() -> u64 {
        3
    }

    const fn default_kill_mode_swap() -> u64 {
        1024 * 1024 // 1 GB
    }

    const fn default_kill_mode_memory() -> u64 {
        512 * 1024 // 512 MB
    }

    fn default_allocation_name() -> String {
        "local.general".to_string()
    }

    fn default_allocation_tag() -> String {
        "general".to_string()
    }

    /// Get the agent request timeout as a `Duration`.
    #[must_use]
    pub const fn agent_request_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_request_timeout_seconds)
    }

    /// Get the agent connect timeout as a `Duration`.
    #[must_use]
    pub const fn agent_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_connect_timeout_seconds)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            agent_port: Self::default_agent_port(),
            agent_request_timeout_seconds: Self::default_agent_request_timeout(),
            agent_connect_timeout_seconds: Self::default_agent_connect_timeout(),
            kill_mode_min_swap_used: Self::default_kill_mode_swap(),
            kill_mode_max_free_memory: Self::default_kill_mode_memory(),
            default_allocation_name: Self::default_allocation_name(),
            default_allocation_tag: Self::default_allocation_tag(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn proc_with(used_memory: u64, status: ProcStatus) -> Proc {
        Proc {
            proc_id: ProcId::generate(),
            host_id: HostId::generate(),
            frame_id: FrameId::generate(),
            job_id: JobId::generate(),
            show_id: None,
            local_assignment: None,
            reserved_cores: 1,
            reserved_memory: 1024,
            reserved_gpu: 0,
            used_memory,
            peak_memory: used_memory,
            status,
            booked_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn manager_config_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.agent_port, 8444);
        assert_eq!(config.agent_request_timeout(), Duration::from_secs(10));
        assert_eq!(config.agent_connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.default_allocation_name, "local.general");
    }

    #[test]
    fn manager_config_partial_json() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{"agent_port": 9000, "default_allocation_tag": "farm"}"#)
                .unwrap();
        assert_eq!(config.agent_port, 9000);
        assert_eq!(config.default_allocation_tag, "farm");
        assert_eq!(config.kill_mode_max_free_memory, 512 * 1024);
    }

    #[test]
    fn host_report_without_frames() {
        let report: HostReport = serde_json::from_str(
            r#"{"host": {"name": "render01", "cores": 8, "stats": {
                "total_memory": 64, "free_memory": 64, "total_swap": 0, "free_swap": 0,
                "total_mcp": 0, "free_mcp": 0, "total_gpu": 0, "free_gpu": 0,
                "load": 0, "boot_time": "2024-01-01T00:00:00Z", "os": "linux"}}}"#,
        )
        .unwrap();
        assert_eq!(report.host.name, "render01");
        assert!(report.running_frames.is_empty());
    }

    #[test]
    fn proc_search_filters() {
        let running = proc_with(4096, ProcStatus::Running);
        let booked = proc_with(100, ProcStatus::Booked);

        let everything = ProcSearch::default();
        assert!(everything.matches_proc(&running));
        assert!(everything.matches_proc(&booked));

        let heavy_running = ProcSearch {
            statuses: vec![ProcStatus::Running],
            min_used_memory: Some(2048),
            ..ProcSearch::default()
        };
        assert!(heavy_running.matches_proc(&running));
        assert!(!heavy_running.matches_proc(&booked));

        let by_show = ProcSearch {
            shows: vec![ShowId::generate()],
            ..ProcSearch::default()
        };
        assert!(!by_show.matches_proc(&running));
    }

    #[test]
    fn unbook_summary_counts_failures() {
        let summary = UnbookSummary {
            unbooked: vec![ProcId::generate()],
            failures: vec![(ProcId::generate(), "gone".into())],
        };
        assert_eq!(summary.failure_count(), 1);
    }
}
