//! Frame lookup used for orphan detection.
//!
//! Frames belong to the job system, which this crate does not own. The host
//! manager only needs to ask whether a frame still exists and which proc it
//! currently points at.

use std::collections::HashMap;

use async_trait::async_trait;
use farmhost_core::{FrameId, JobId, ProcId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the job system knows about a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// The frame.
    pub frame_id: FrameId,
    /// Job owning the frame.
    pub job_id: JobId,
    /// Proc the frame is currently running on, if any.
    pub proc_id: Option<ProcId>,
}

/// Trait for resolving frames.
#[async_trait]
pub trait FrameRegistry: Send + Sync {
    /// Look up a frame.
    ///
    /// Returns `None` if the frame no longer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn lookup_frame(&self, frame_id: &FrameId) -> Result<Option<FrameRecord>>;
}

/// An in-memory frame registry.
#[derive(Debug, Default)]
pub struct InMemoryFrameRegistry {
    frames: RwLock<HashMap<FrameId, FrameRecord>>,
}

impl InMemoryFrameRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a frame.
    pub fn insert(&self, record: FrameRecord) {
        self.frames.write().insert(record.frame_id, record);
    }

    /// Point a frame at a proc. Returns false if the frame is unknown.
    pub fn bind(&self, frame_id: &FrameId, proc_id: ProcId) -> bool {
        match self.frames.write().get_mut(frame_id) {
            Some(record) => {
                record.proc_id = Some(proc_id);
                true
            }
            None => false,
        }
    }

    /// Remove a frame.
    pub fn remove(&self, frame_id: &FrameId) -> Option<FrameRecord> {
        self.frames.write().remove(frame_id)
    }

    /// Get the number of known frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.read().len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.read().is_empty()
    }
}

#[async_trait]
impl FrameRegistry for InMemoryFrameRegistry {
    async fn lookup_frame(&self, frame_id: &FrameId) -> Result<Option<FrameRecord>> {
        Ok(self.frames.read().get(frame_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FrameRecord {
        FrameRecord {
            frame_id: FrameId::generate(),
            job_id: JobId::generate(),
            proc_id: None,
        }
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let registry = InMemoryFrameRegistry::new();
        assert!(registry.is_empty());

        let frame = record();
        registry.insert(frame.clone());
        assert_eq!(registry.len(), 1);

        let found = registry.lookup_frame(&frame.frame_id).await.unwrap();
        assert_eq!(found, Some(frame));
    }

    #[tokio::test]
    async fn bind_and_remove() {
        let registry = InMemoryFrameRegistry::new();
        let frame = record();
        let proc_id = ProcId::generate();

        assert!(!registry.bind(&frame.frame_id, proc_id));

        registry.insert(frame.clone());
        assert!(registry.bind(&frame.frame_id, proc_id));
        let found = registry.lookup_frame(&frame.frame_id).await.unwrap().unwrap();
        assert_eq!(found.proc_id, Some(proc_id));

        assert!(registry.remove(&frame.frame_id).is_some());
        assert!(registry.lookup_frame(&frame.frame_id).await.unwrap().is_none());
    }
}
