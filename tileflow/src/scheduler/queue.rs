//! Viewport-prioritized job queue.
//!
//! Jobs are deduplicated by equality: a job equal to one already pending, or
//! to one a worker is still producing, is not added again. Priorities are
//! recomputed lazily, right before a removal, whenever jobs were added or the
//! viewport moved since the last pass.
//!
//! # Scheduling pass
//!
//! 1. Snapshot the viewport.
//! 2. Recompute the priority of every pending job.
//! 3. Stable sort ascending, so equal priorities keep insertion order.
//! 4. Truncate to the capacity, forgetting the least urgent excess.
//!
//! # Waiting
//!
//! [`JobQueue::remove`] suspends until a job is available. Waiters register
//! with a [`Notify`] before checking for work, so an `add` racing with the
//! check is never lost.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::job::Job;

use super::priority::{priority, DEFAULT_ZOOM_PENALTY};
use super::viewport::ViewportState;

/// Default number of pending jobs kept after a scheduling pass.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Pending jobs kept after a scheduling pass.
    pub capacity: usize,
    /// Priority added per zoom level of difference.
    pub zoom_penalty: f64,
}

impl SchedulerConfig {
    /// Set the capacity. A capacity of zero would empty the queue on every
    /// pass, so at least one job is always kept.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_zoom_penalty(mut self, zoom_penalty: f64) -> Self {
        self.zoom_penalty = zoom_penalty;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            zoom_penalty: DEFAULT_ZOOM_PENALTY,
        }
    }
}

/// A pending job and its priority from the last pass.
#[derive(Debug, Clone)]
struct QueueEntry {
    job: Job,
    priority: f64,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Sorted by priority after a pass; new entries are appended.
    entries: VecDeque<QueueEntry>,
    /// Jobs in `entries`, for O(1) dedup.
    pending: HashSet<Job>,
    /// Jobs handed to a worker and not yet completed.
    assigned: HashSet<Job>,
    /// Entries were added since the last pass.
    dirty: bool,
    /// Viewport generation used by the last pass.
    scheduled_generation: u64,
}

/// Pending-job queue ordered by distance to the viewport.
pub struct JobQueue {
    state: Mutex<QueueState>,
    available: Notify,
    viewport: Arc<ViewportState>,
    config: SchedulerConfig,
}

impl JobQueue {
    pub fn new(viewport: Arc<ViewportState>, config: SchedulerConfig) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Notify::new(),
            viewport,
            config,
        }
    }

    /// Add a job unless an equal one is pending or in production.
    ///
    /// Returns `true` if the job was added. The new entry is unprioritized
    /// until the next scheduling pass.
    pub fn add(&self, job: Job) -> bool {
        {
            let mut state = self.state.lock();
            if state.pending.contains(&job) || state.assigned.contains(&job) {
                return false;
            }
            state.pending.insert(job.clone());
            state.entries.push_back(QueueEntry {
                job,
                priority: f64::MAX,
            });
            state.dirty = true;
        }
        self.available.notify_one();
        true
    }

    /// Remove the most urgent job, waiting until one is available.
    ///
    /// The returned job counts as assigned until [`JobQueue::complete`] is
    /// called for it.
    pub async fn remove(&self) -> Job {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job) = self.try_remove() {
                return job;
            }
            notified.await;
        }
    }

    /// Remove the most urgent job if there is one, without waiting.
    pub fn try_remove(&self) -> Option<Job> {
        let mut state = self.state.lock();
        if state.entries.is_empty() {
            return None;
        }
        if state.dirty || state.scheduled_generation != self.viewport.generation() {
            self.schedule(&mut state);
        }
        let entry = state.entries.pop_front()?;
        state.pending.remove(&entry.job);
        state.assigned.insert(entry.job.clone());
        Some(entry.job)
    }

    /// Mark an assigned job as finished, allowing equal jobs to be added again.
    pub fn complete(&self, job: &Job) {
        self.state.lock().assigned.remove(job);
    }

    /// Run a scheduling pass immediately.
    pub fn schedule_now(&self) {
        let mut state = self.state.lock();
        self.schedule(&mut state);
    }

    fn schedule(&self, state: &mut QueueState) {
        let (viewport, generation) = self.viewport.snapshot();

        for entry in state.entries.iter_mut() {
            entry.priority = priority(&entry.job.tile(), &viewport, self.config.zoom_penalty);
        }
        state
            .entries
            .make_contiguous()
            .sort_by(|a, b| a.priority.total_cmp(&b.priority));

        let trimmed = state.entries.len().saturating_sub(self.config.capacity);
        if trimmed > 0 {
            for dropped in state.entries.drain(self.config.capacity..) {
                state.pending.remove(&dropped.job);
            }
        }

        state.dirty = false;
        state.scheduled_generation = generation;
        debug!(
            pending = state.entries.len(),
            trimmed,
            zoom = viewport.zoom(),
            "Scheduling pass"
        );
    }

    /// Drop every pending job. Assigned jobs are unaffected.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.pending.clear();
        state.dirty = false;
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs handed out and not yet completed.
    pub fn assigned_len(&self) -> usize {
        self.state.lock().assigned.len()
    }

    /// Nothing pending and nothing in production.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.entries.is_empty() && state.assigned.is_empty()
    }

    /// Whether an equal job is pending or assigned.
    pub fn contains(&self, job: &Job) -> bool {
        let state = self.state.lock();
        state.pending.contains(job) || state.assigned.contains(job)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Arc<ViewportState> {
        &self.viewport
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("JobQueue")
            .field("pending", &state.entries.len())
            .field("assigned", &state.assigned.len())
            .field("config", &self.config)
            .finish()
    }
}
