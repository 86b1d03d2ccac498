//! Table of live poll loops, at most one per job id.
//!
//! Each loop holds a [`PollLease`] for as long as it runs. Registering a job
//! that already has a loop cancels the old loop's token and replaces its entry;
//! the old lease then notices on its next tick and, on drop, leaves the newer
//! entry alone because the generations differ.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Registry entry for one running poll loop.
#[derive(Debug, Clone)]
pub struct PollHandle {
    token: CancellationToken,
    generation: u64,
    registered_at: Instant,
}

impl PollHandle {
    /// Token observed by the loop and its in-flight request.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }
}

/// Owned table of poll handles keyed by job id.
///
/// Handle tokens are children of the registry's root token, so cancelling the
/// root (engine shutdown) stops every loop at once.
#[derive(Debug)]
pub struct PollRegistry {
    handles: DashMap<String, PollHandle>,
    next_generation: AtomicU64,
    root: CancellationToken,
}

impl Default for PollRegistry {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl PollRegistry {
    #[must_use]
    pub fn new(root: CancellationToken) -> Self {
        Self {
            handles: DashMap::new(),
            next_generation: AtomicU64::new(0),
            root,
        }
    }

    /// Installs a fresh handle for `job_id`, silently cancelling any existing one.
    pub fn register(&self, job_id: &str) -> PollLease<'_> {
        let handle = PollHandle {
            token: self.root.child_token(),
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            registered_at: Instant::now(),
        };
        let lease = PollLease {
            registry: self,
            job_id: job_id.to_string(),
            generation: handle.generation,
            token: handle.token.clone(),
        };
        if let Some(previous) = self.handles.insert(job_id.to_string(), handle) {
            debug!(job_id, "replacing active poll loop");
            previous.token.cancel();
        }
        lease
    }

    /// Cancels and removes the loop for `job_id`. Returns `false` if none was active.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.handles.remove(job_id) {
            Some((_, handle)) => {
                handle.token.cancel();
                debug!(job_id, "poll loop cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every loop and empties the table. Returns how many were active.
    pub fn clear_all(&self) -> usize {
        let job_ids: Vec<String> = self.job_ids();
        let mut cleared = 0;
        for job_id in job_ids {
            if self.cancel(&job_id) {
                cleared += 1;
            }
        }
        cleared
    }

    #[must_use]
    pub fn has(&self, job_id: &str) -> bool {
        self.handles.contains_key(job_id)
    }

    #[must_use]
    pub fn get(&self, job_id: &str) -> Option<PollHandle> {
        self.handles.get(job_id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Job ids with an active loop, sorted.
    #[must_use]
    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn release(&self, job_id: &str, generation: u64) {
        self.handles
            .remove_if(job_id, |_, handle| handle.generation == generation);
    }
}

/// Proof of registration held by a running poll loop; deregisters on drop.
#[derive(Debug)]
pub struct PollLease<'a> {
    registry: &'a PollRegistry,
    job_id: String,
    generation: u64,
    token: CancellationToken,
}

impl PollLease<'_> {
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for PollLease<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.job_id, self.generation);
    }
}
