// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch queue and running set.
//!
//! Only the scheduler touches this, always under its one mutex.

use pj_core::JobId;
use pj_runner::{RunHandle, WorkerOutcome};
use std::collections::{HashMap, VecDeque};

/// Why the scheduler asked a running worker to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    Cancel,
    Shutdown,
}

#[derive(Debug)]
pub(crate) struct Running {
    pub handle: RunHandle,
    pub stop: Option<StopReason>,
    /// Exit received; set until the terminal state is committed
    pub exit: Option<WorkerOutcome>,
}

#[derive(Debug)]
pub(crate) struct Registry {
    queue: VecDeque<JobId>,
    running: HashMap<JobId, Running>,
    accepting: bool,
}

impl Registry {
    pub fn new(pending: impl IntoIterator<Item = JobId>) -> Self {
        Self { queue: pending.into_iter().collect(), running: HashMap::new(), accepting: true }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn stop_accepting(&mut self) {
        self.accepting = false;
    }

    pub fn enqueue(&mut self, id: JobId) {
        self.queue.push_back(id);
    }

    pub fn enqueue_front(&mut self, id: JobId) {
        self.queue.push_front(id);
    }

    /// Oldest queued job, if a slot is free under `max_running`.
    pub fn next_dispatchable(&mut self, max_running: usize) -> Option<JobId> {
        if !self.accepting || self.running.len() >= max_running {
            return None;
        }
        self.queue.pop_front()
    }

    /// Remove `id` from the queue; `false` if it was not queued.
    pub fn remove_queued(&mut self, id: &JobId) -> bool {
        match self.queue.iter().position(|q| q == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Zero-based queue position (0 dispatches next).
    pub fn position(&self, id: &JobId) -> Option<usize> {
        self.queue.iter().position(|q| q == id)
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn insert_running(&mut self, id: JobId, handle: RunHandle, stop: Option<StopReason>) {
        self.running.insert(id, Running { handle, stop, exit: None });
    }

    pub fn running(&self, id: &JobId) -> Option<&Running> {
        self.running.get(id)
    }

    pub fn running_mut(&mut self, id: &JobId) -> Option<&mut Running> {
        self.running.get_mut(id)
    }

    /// Exited jobs whose terminal state is not yet committed.
    pub fn unsettled(&self) -> Vec<JobId> {
        self.running.iter().filter(|(_, r)| r.exit.is_some()).map(|(id, _)| id.clone()).collect()
    }

    pub fn running_entries_mut(&mut self) -> impl Iterator<Item = &mut Running> {
        self.running.values_mut()
    }

    /// Drop a job from the running set once its terminal state is committed.
    pub fn finish(&mut self, id: &JobId) -> Option<Running> {
        self.running.remove(id)
    }

    pub fn running_len(&self) -> usize {
        self.running.len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
