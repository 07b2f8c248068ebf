// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Debounced rebuild scheduling.
//!
//! [`Scheduler`] is the pure state machine; it never reads the clock, so
//! callers pass `now` in. [`DocumentWorker`] drives one scheduler per
//! document on its own thread and runs builds on a separate builder thread,
//! so at most one build per document is ever in flight.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::core::error::{AnalysisError, Result};
use crate::core::label_graph::GraphStatus;
use crate::core::options::SchedulerConfig;
use crate::core::snapshot::{AnalysisSnapshot, SnapshotSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting { deadline: Instant, resets: u32 },
    Busy { scheduled_again: bool },
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Waiting { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn on_edit(&mut self, now: Instant) {
        self.state = match self.state {
            SchedulerState::Idle => SchedulerState::Waiting {
                deadline: now + self.config.delay,
                resets: 0,
            },
            SchedulerState::Waiting { resets, .. } if resets < self.config.max_resets => {
                SchedulerState::Waiting {
                    deadline: now + self.config.delay,
                    resets: resets + 1,
                }
            }
            waiting @ SchedulerState::Waiting { .. } => {
                trace!("debounce reset limit reached; keeping deadline");
                waiting
            }
            SchedulerState::Busy { .. } => SchedulerState::Busy {
                scheduled_again: true,
            },
        };
        trace!(state = ?self.state, "edit");
    }

    /// True when the debounce timer has fired; the caller must start a build.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Waiting { deadline, .. } if now >= deadline => {
                self.state = SchedulerState::Busy {
                    scheduled_again: false,
                };
                debug!("debounce elapsed; starting build");
                true
            }
            _ => false,
        }
    }

    pub fn on_build_complete(&mut self, now: Instant) {
        self.state = match self.state {
            SchedulerState::Busy {
                scheduled_again: true,
            } => SchedulerState::Waiting {
                deadline: now + self.config.delay,
                resets: 0,
            },
            SchedulerState::Busy {
                scheduled_again: false,
            } => SchedulerState::Idle,
            other => {
                warn!(state = ?other, "build completion outside of a build");
                other
            }
        };
        trace!(state = ?self.state, "build complete");
    }
}

/// A finished build, posted for the session to publish.
#[derive(Debug, Clone)]
pub struct SnapshotReady {
    pub uri: String,
    pub version: i64,
    pub snapshot: Arc<AnalysisSnapshot>,
}

enum WorkerCommand {
    Edit {
        version: i64,
        lines: Arc<Vec<String>>,
    },
    BuildFinished(Arc<AnalysisSnapshot>),
    Shutdown,
}

type BuildFn = dyn Fn(i64, Arc<Vec<String>>) -> AnalysisSnapshot + Send + Sync;

pub struct DocumentWorker {
    uri: String,
    commands: Sender<WorkerCommand>,
    slot: Arc<SnapshotSlot>,
    handle: Option<JoinHandle<()>>,
}

impl DocumentWorker {
    /// Starts the worker thread. `build` turns a version and its text into a
    /// snapshot; completed snapshots land in the slot and on `ready`.
    pub fn spawn<F>(
        uri: impl Into<String>,
        config: SchedulerConfig,
        initial: AnalysisSnapshot,
        build: F,
        ready: Sender<SnapshotReady>,
    ) -> Self
    where
        F: Fn(i64, Arc<Vec<String>>) -> AnalysisSnapshot + Send + Sync + 'static,
    {
        let uri = uri.into();
        let slot = Arc::new(SnapshotSlot::new(initial));
        let (commands, inbox) = mpsc::channel();
        let worker = WorkerLoop {
            uri: uri.clone(),
            scheduler: Scheduler::new(config),
            pending: None,
            inbox,
            commands: commands.clone(),
            slot: Arc::clone(&slot),
            build: Arc::new(build),
            ready,
        };
        let handle = thread::Builder::new()
            .name(format!("asmscope-worker {uri}"))
            .spawn(move || worker.run())
            .map_err(|err| warn!(%err, "cannot spawn document worker"))
            .ok();
        Self {
            uri,
            commands,
            slot,
            handle,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn edit(&self, version: i64, lines: Arc<Vec<String>>) -> Result<()> {
        self.commands
            .send(WorkerCommand::Edit { version, lines })
            .map_err(|_| AnalysisError::WorkerGone(self.uri.clone()))
    }

    /// Last completed snapshot. Never waits for a build in flight.
    pub fn snapshot(&self) -> Arc<AnalysisSnapshot> {
        self.slot.load()
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DocumentWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WorkerLoop {
    uri: String,
    scheduler: Scheduler,
    /// Newest text not yet handed to a build.
    pending: Option<(i64, Arc<Vec<String>>)>,
    inbox: Receiver<WorkerCommand>,
    commands: Sender<WorkerCommand>,
    slot: Arc<SnapshotSlot>,
    build: Arc<BuildFn>,
    ready: Sender<SnapshotReady>,
}

impl WorkerLoop {
    fn run(mut self) {
        debug!(uri = %self.uri, "document worker started");
        loop {
            let received = match self.scheduler.deadline() {
                Some(deadline) => self
                    .inbox
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => self
                    .inbox
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(WorkerCommand::Edit { version, lines }) => {
                    self.pending = Some((version, lines));
                    self.scheduler.on_edit(Instant::now());
                }
                Ok(WorkerCommand::BuildFinished(snapshot)) => {
                    self.publish(snapshot);
                    self.scheduler.on_build_complete(Instant::now());
                }
                Ok(WorkerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if self.scheduler.poll(Instant::now()) {
                self.start_build();
            }
        }
        debug!(uri = %self.uri, "document worker stopped");
    }

    fn start_build(&mut self) {
        let Some((version, lines)) = self.pending.take() else {
            self.scheduler.on_build_complete(Instant::now());
            return;
        };
        let build = Arc::clone(&self.build);
        let done = self.commands.clone();
        let spawned = thread::Builder::new()
            .name(format!("asmscope-build {}", self.uri))
            .spawn(move || {
                let snapshot = build(version, lines);
                let _ = done.send(WorkerCommand::BuildFinished(Arc::new(snapshot)));
            });
        if let Err(err) = spawned {
            warn!(uri = %self.uri, %err, "cannot spawn build thread");
            self.scheduler.on_build_complete(Instant::now());
        }
    }

    fn publish(&self, snapshot: Arc<AnalysisSnapshot>) {
        let previous = self.slot.load();
        if !self.slot.store(Arc::clone(&snapshot)) {
            debug!(uri = %self.uri, version = snapshot.version, "dropping stale build");
            return;
        }
        if snapshot.newly_disabled(&previous) {
            if let GraphStatus::Disabled { lines, max_lines } = snapshot.graph.status() {
                warn!(uri = %self.uri, lines, max_lines, "label analysis disabled: document too large");
            }
        }
        let _ = self.ready.send(SnapshotReady {
            uri: self.uri.clone(),
            version: snapshot.version,
            snapshot,
        });
    }
}
