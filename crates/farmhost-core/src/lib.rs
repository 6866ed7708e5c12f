//! Core types and utilities for farmhost.
//!
//! This crate provides the foundational types used throughout the farmhost
//! render-farm host manager:
//!
//! - **Identifiers**: Strongly-typed IDs for hosts, allocations, procs and the
//!   external frames, jobs and shows they refer to
//! - **Parse errors**: [`IdError`] for identifiers arriving as strings
//!
//! # Example
//!
//! ```
//! use farmhost_core::{HostId, ProcId};
//!
//! let host_id = HostId::generate();
//! let parsed: HostId = host_id.to_string().parse().unwrap();
//! assert_eq!(host_id, parsed);
//!
//! let proc_id = ProcId::generate();
//! assert_ne!(proc_id.as_uuid(), host_id.as_uuid());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{AllocationId, FrameId, HostId, IdError, JobId, LocalAssignmentId, ProcId, ShowId};
