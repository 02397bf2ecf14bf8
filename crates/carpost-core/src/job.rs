//! # Jobs and the Job Repository
//!
//! A [`Job`] names a job's metadata root, its author and the block height it
//! was posted at. Jobs are immutable once built.
//!
//! [`JobRepository`] interns jobs by identifier so that repeated lookups
//! return the same shared instance. It is an explicit object: the caller
//! constructs one per process (or per test) and injects it wherever jobs are
//! materialized, so its lifetime and clearing are visible at the call site.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::address::AccountAddress;
use crate::identifier::Identifier;

/// A posted job, as listed by the remote store.
///
/// Serializes to and from the listing DTO `{cid, author, block}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    /// Identifier of the job's metadata root.
    pub cid: Identifier,
    /// Account that posted the job.
    pub author: AccountAddress,
    /// Block height the job was posted at.
    pub block: u64,
}

impl Job {
    pub fn new(cid: Identifier, author: AccountAddress, block: u64) -> Self {
        Self { cid, author, block }
    }
}

/// Interning cache of jobs keyed by metadata root identifier.
///
/// Cloning shares the underlying cache. The lock is `parking_lot` and never
/// held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct JobRepository {
    jobs: Arc<RwLock<HashMap<Identifier, Arc<Job>>>>,
}

impl JobRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached job for `cid`, creating it from the given fields if
    /// absent. An existing entry is returned unchanged.
    pub fn get_or_create(&self, cid: Identifier, author: AccountAddress, block: u64) -> Arc<Job> {
        if let Some(job) = self.jobs.read().get(&cid) {
            return Arc::clone(job);
        }
        let mut guard = self.jobs.write();
        Arc::clone(
            guard
                .entry(cid)
                .or_insert_with(|| Arc::new(Job::new(cid, author, block))),
        )
    }

    /// Intern an already-decoded job.
    pub fn intern(&self, job: Job) -> Arc<Job> {
        self.get_or_create(job.cid, job.author, job.block)
    }

    /// Intern a listing, preserving its order.
    pub fn intern_all(&self, jobs: impl IntoIterator<Item = Job>) -> Vec<Arc<Job>> {
        jobs.into_iter().map(|job| self.intern(job)).collect()
    }

    /// Look up a cached job.
    pub fn get(&self, cid: &Identifier) -> Option<Arc<Job>> {
        self.jobs.read().get(cid).cloned()
    }

    /// Number of cached jobs.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Drop every cached job.
    pub fn clear(&self) {
        self.jobs.write().clear();
    }
}
