//! Domain types stored in the database.
//!
//! These types represent the persisted state of hosts, allocations and procs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use farmhost_core::{AllocationId, FrameId, HostId, JobId, LocalAssignmentId, ProcId, ShowId};
use serde::{Deserialize, Serialize};

/// A render host record stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// Unique identifier for the host.
    pub host_id: HostId,
    /// Unique hostname, as reported by the host agent.
    pub name: String,
    /// The allocation (pool) this host belongs to.
    pub allocation_id: AllocationId,
    /// Whether the host is open for farm work.
    pub lock_state: LockState,
    /// Who last changed the lock state.
    #[serde(default)]
    pub lock_source: Option<String>,
    /// When the lock state last changed.
    #[serde(default)]
    pub lock_changed_at: Option<DateTime<Utc>>,
    /// Hardware health of the host.
    pub hardware_state: HardwareState,
    /// Total core capacity.
    pub cores: u32,
    /// Live resource figures from the most recent report.
    pub stats: ResourceStats,
    /// Tags set by operators.
    #[serde(default)]
    pub manual_tags: BTreeSet<String>,
    /// Hardware capability tags. Empty until deliberately set.
    #[serde(default)]
    pub hardware_tags: BTreeSet<String>,
    /// Effective tag list, recomputed after every tag or allocation change.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Show whose work this host should prefer, if any.
    #[serde(default)]
    pub preferred_show: Option<ShowId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Last resource report from the host agent.
    #[serde(default)]
    pub last_report_at: Option<DateTime<Utc>>,
}

/// Resource figures pushed by a render host agent.
///
/// Memory, swap, cache and GPU amounts are in kilobytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStats {
    /// Physical memory installed.
    pub total_memory: u64,
    /// Physical memory currently free.
    pub free_memory: u64,
    /// Swap configured.
    pub total_swap: u64,
    /// Swap currently free.
    pub free_swap: u64,
    /// Local scratch cache ("mcp") capacity.
    pub total_mcp: u64,
    /// Local scratch cache free.
    pub free_mcp: u64,
    /// GPU memory installed.
    pub total_gpu: u64,
    /// GPU memory free.
    pub free_gpu: u64,
    /// Integer load average (load * 100).
    pub load: u32,
    /// When the host last booted.
    pub boot_time: DateTime<Utc>,
    /// Operating system string.
    pub os: String,
}

impl Default for ResourceStats {
    fn default() -> Self {
        Self {
            total_memory: 0,
            free_memory: 0,
            total_swap: 0,
            free_swap: 0,
            total_mcp: 0,
            free_mcp: 0,
            total_gpu: 0,
            free_gpu: 0,
            load: 0,
            boot_time: DateTime::<Utc>::UNIX_EPOCH,
            os: String::new(),
        }
    }
}

impl ResourceStats {
    /// Swap currently in use.
    #[must_use]
    pub const fn used_swap(&self) -> u64 {
        self.total_swap.saturating_sub(self.free_swap)
    }
}

/// Lock state of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Available for farm work.
    Open,
    /// Locked by an operator.
    Locked,
    /// Reclaimed by its owner ("not in my backyard").
    NimbyLocked,
}

/// Hardware state of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HardwareState {
    /// Healthy and reporting.
    Up = 1,
    /// Not reporting, or a reboot could not be delivered.
    Down = 2,
    /// A reboot has been acknowledged by the agent.
    Rebooting = 3,
    /// Will reboot once its running frames finish.
    RebootWhenIdle = 4,
    /// Taken out of service for repair.
    Repair = 5,
}

impl HardwareState {
    /// All hardware states, in index order.
    pub const ALL: [Self; 5] = [
        Self::Up,
        Self::Down,
        Self::Rebooting,
        Self::RebootWhenIdle,
        Self::Repair,
    ];

    /// Convert the state to its numeric representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert a numeric value to a `HardwareState`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            2 => Some(Self::Down),
            3 => Some(Self::Rebooting),
            4 => Some(Self::RebootWhenIdle),
            5 => Some(Self::Repair),
            _ => None,
        }
    }
}

/// An allocation (host pool) record stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique identifier for the allocation.
    pub allocation_id: AllocationId,
    /// Unique allocation name.
    pub name: String,
    /// Tag applied to every host in this allocation.
    pub tag: String,
    /// Whether newly reporting hosts land in this allocation.
    pub is_default: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A virtual proc: part of a host's resources reserved for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proc {
    /// Unique identifier for the proc.
    pub proc_id: ProcId,
    /// Host the proc is bound to.
    pub host_id: HostId,
    /// Frame the proc is running.
    pub frame_id: FrameId,
    /// Job owning the frame.
    pub job_id: JobId,
    /// Show owning the job.
    #[serde(default)]
    pub show_id: Option<ShowId>,
    /// Local assignment this proc was booked under, if any.
    #[serde(default)]
    pub local_assignment: Option<LocalAssignmentId>,
    /// Cores reserved on the host.
    pub reserved_cores: u32,
    /// Memory reserved, in kilobytes.
    pub reserved_memory: u64,
    /// GPU memory reserved, in kilobytes.
    #[serde(default)]
    pub reserved_gpu: u64,
    /// Memory the frame is currently using, in kilobytes.
    #[serde(default)]
    pub used_memory: u64,
    /// Peak memory the frame has used, in kilobytes.
    #[serde(default)]
    pub peak_memory: u64,
    /// Booking status.
    pub status: ProcStatus,
    /// When the proc was booked.
    pub booked_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Proc {
    /// Memory used beyond the reservation. Negative when under the reservation.
    #[must_use]
    pub fn memory_overage(&self) -> i128 {
        i128::from(self.used_memory) - i128::from(self.reserved_memory)
    }
}

/// Booking status of a proc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcStatus {
    /// Resources reserved, frame not yet started on the host.
    Booked,
    /// The host has started the frame.
    Running,
}
