//! Host manager for the farmhost render farm.
//!
//! This crate provides the business logic for tracking render hosts: their lock
//! and hardware state, resource reports, allocation membership, tags, and the
//! procs the scheduler books onto them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │   Host agents    │  │    Operators     │  │    Scheduler     │
//! │  (reports)       │  │ (lock/tag/move)  │  │  (book/unbook)   │
//! └────────┬─────────┘  └────────┬─────────┘  └────────┬─────────┘
//!          └─────────────────────┼─────────────────────┘
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HostManagerService                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │  Lifecycle  │ │    Tags     │ │    ProcRegistry     │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//!               ┌────────────────┼────────────────┐
//!               ▼                ▼                ▼
//!        ┌──────────┐     ┌────────────┐    ┌──────────┐
//!        │  Store   │     │ Host agent │    │  Frame   │
//!        │ (RocksDB)│     │   (HTTP)   │    │ registry │
//!        └──────────┘     └────────────┘    └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use farmhost_control::{
//!     HostManager, HostManagerService, HostReport, InMemoryFrameRegistry, NoopHostAgentClient,
//! };
//! use farmhost_store::{ResourceStats, RocksStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/farmhost")?);
//! let manager = HostManagerService::with_defaults(
//!     store,
//!     Arc::new(NoopHostAgentClient::new()),
//!     Arc::new(InMemoryFrameRegistry::new()),
//! );
//! manager.ensure_default_allocation()?;
//!
//! let report = HostReport::idle("render01", 8, ResourceStats::default());
//! let host = manager.process_host_report(&report).await?;
//!
//! println!("Host {} has tags {:?}", host.name, host.tags);
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! All writes to a host, including proc bookings on it, run under the host's
//! row lock. An allocation change re-checks that no procs are bound while
//! holding that lock, so it cannot interleave with a booking.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod agent_client;
pub mod error;
pub mod frames;
pub mod lifecycle;
pub mod procs;
pub mod search;
pub mod service;
pub mod tags;
pub mod types;

pub use agent_client::{AgentError, HostAgentClient, HttpHostAgentClient, NoopHostAgentClient};
pub use error::{ControlError, Result};
pub use frames::{FrameRecord, FrameRegistry, InMemoryFrameRegistry};
pub use procs::ProcRegistry;
pub use search::HostFilter;
pub use service::{HostManager, HostManagerService};
pub use types::{
    BookingRequest, DispatchHost, HostReport, HostSearch, ManagerConfig, ProcCriteria,
    ProcSearch, RenderHost, RunningFrame, UnbookSummary,
};

// Re-export commonly used types from dependencies for convenience
pub use farmhost_core::{AllocationId, FrameId, HostId, JobId, LocalAssignmentId, ProcId, ShowId};
pub use farmhost_store::{
    Allocation, HardwareState, Host, LockState, Proc, ProcStatus, ResourceStats,
};
