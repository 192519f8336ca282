//! SyncEngine: scheduler, coordinator and graph store for one session
//!
//! Sans-IO: every method takes the current time and returns what the caller
//! must do next (usually "submit this request"). Nothing here sleeps, spawns
//! or touches the network; see [`super::driver`] for the tokio loop.

use super::coordinator::{CompletionOutcome, Discard, ErrorOutcome, InFlightCoordinator};
use super::scheduler::RequestScheduler;
use super::timer::earliest;
use crate::config::EngineConfig;
use crate::graph::{ApplyReport, GraphObserver, GraphState, GraphStore, MilestoneObserver};
use crate::snapshot::{hydrate, serialize, Snapshot};
use crate::transport::{
    render_instructions, ErrorEvent, ExtractionRequest, ResponseEvent, Transcript, TranscriptTurn,
    TurnKind,
};
use std::sync::Arc;
use tokio::time::Instant;

const TIMEOUT_BREADCRUMB: &str = "Concept extraction timed out; guard reset";

/// What a completion event did to the engine
#[derive(Debug)]
pub enum ResponseOutcome {
    /// An extraction completion whose diff was applied
    Applied(ApplyReport),
    /// An extraction completion with an unusable payload
    Malformed { reason: String },
    /// An extraction completion that was not for the current request
    Discarded(Discard),
    /// An ordinary agent turn that (re)armed the debounce timer
    Scheduled,
    /// An ordinary agent turn with no effect
    Ignored,
}

pub struct SyncEngine {
    config: EngineConfig,
    store: GraphStore,
    milestones: Arc<MilestoneObserver>,
    scheduler: RequestScheduler,
    coordinator: InFlightCoordinator,
    transcript: Transcript,
    disposed: bool,
}

impl SyncEngine {
    pub fn new(config: EngineConfig) -> Self {
        let milestones = Arc::new(MilestoneObserver::new(config.diff_milestones.clone()));
        let mut store = GraphStore::new();
        store.subscribe(milestones.clone());

        Self {
            scheduler: RequestScheduler::from_config(&config),
            coordinator: InFlightCoordinator::new(&config),
            store,
            milestones,
            transcript: Transcript::new(),
            config,
            disposed: false,
        }
    }

    /// Begin scheduling extraction requests
    pub fn start(&mut self) {
        if !self.disposed {
            self.scheduler.start();
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        tracing::debug!(connected, "conversation session connectivity changed");
        self.scheduler.set_connected(connected);
    }

    /// Record a finalized transcript turn; message turns feed the scheduler.
    pub fn turn_finalized(&mut self, turn: TranscriptTurn, now: Instant) -> bool {
        let schedules = turn.kind == TurnKind::Message;
        let item_id = turn.item_id.clone();
        self.transcript.record(turn);
        schedules && self.scheduler.on_final_transcript(&item_id, now)
    }

    /// Handle a finished response from the transport, on any channel.
    pub fn response_done(&mut self, event: &ResponseEvent, now: Instant) -> ResponseOutcome {
        if event.channel() != Some(self.config.channel.as_str()) {
            return if self
                .scheduler
                .on_agent_turn_done(event.id.as_deref(), event.channel(), now)
            {
                ResponseOutcome::Scheduled
            } else {
                ResponseOutcome::Ignored
            };
        }

        match self.coordinator.on_completion(event) {
            CompletionOutcome::Accepted {
                correlation_id,
                response_id,
                diff,
            } => {
                let report = self.store.apply_diff(&diff);
                tracing::info!(
                    correlation_id = ?correlation_id,
                    response_id = ?response_id,
                    ops = diff.len(),
                    applied = report.applied(),
                    skipped = report.skipped.len(),
                    "applied concept diff"
                );
                ResponseOutcome::Applied(report)
            }
            CompletionOutcome::Malformed { reason, .. } => ResponseOutcome::Malformed { reason },
            CompletionOutcome::Discarded(discard) => ResponseOutcome::Discarded(discard),
        }
    }

    pub fn response_failed(&mut self, event: &ErrorEvent) -> ErrorOutcome {
        self.coordinator.on_error(event)
    }

    /// Issue a request for the current window, superseding any outstanding one.
    ///
    /// Also drops a pending debounce timer, since the window it would have
    /// captured is already in this request.
    pub fn analyze_now(&mut self, now: Instant) -> Option<ExtractionRequest> {
        if self.disposed {
            return None;
        }
        self.scheduler.cancel_pending();
        let window = self.transcript.window(self.config.max_context_turns);
        Some(self.coordinator.issue(render_instructions(&window), now))
    }

    /// Fire whichever timers are due. Returns a request to submit if the
    /// debounce timer fired.
    pub fn poll(&mut self, now: Instant) -> Option<ExtractionRequest> {
        if let Some(correlation_id) = self.coordinator.fire_timeout(now) {
            self.transcript.record(TranscriptTurn::breadcrumb(
                format!("timeout-{}", correlation_id),
                TIMEOUT_BREADCRUMB,
            ));
        }
        match self.scheduler.fire(now) {
            Some(trigger) => {
                tracing::debug!(?trigger, "debounce elapsed");
                self.analyze_now(now)
            }
            None => None,
        }
    }

    /// When [`poll`](Self::poll) next has something to do
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.scheduler.next_deadline(), self.coordinator.next_deadline()])
    }

    /// Switch to `workspace`, replacing the graph with `snapshot` (or an
    /// empty graph). Pending timers and the current request are forgotten.
    pub fn activate_workspace(&mut self, workspace: Option<String>, snapshot: Option<&Snapshot>) {
        tracing::info!(
            workspace = ?workspace,
            hydrated = snapshot.is_some(),
            "activating workspace"
        );
        if self.coordinator.workspace() != workspace.as_deref() {
            self.transcript.clear();
        }
        self.scheduler.cancel_pending();
        self.coordinator.set_workspace(workspace);
        self.store.replace(snapshot.map(hydrate).unwrap_or_default());
    }

    pub fn workspace(&self) -> Option<&str> {
        self.coordinator.workspace()
    }

    /// The live graph as a snapshot of the active workspace
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.workspace()
            .map(|workspace| serialize(self.store.state(), workspace))
    }

    /// Stop scheduling, cancel every timer and ignore further events
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.scheduler.dispose();
        self.coordinator.dispose();
    }

    pub fn subscribe(&mut self, observer: Arc<dyn GraphObserver>) {
        self.store.subscribe(observer);
    }

    pub fn state(&self) -> &GraphState {
        self.store.state()
    }

    pub fn diff_count(&self) -> u64 {
        self.store.diff_count()
    }

    pub fn milestones_reached(&self) -> Vec<u64> {
        self.milestones.reached()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn coordinator(&self) -> &InFlightCoordinator {
        &self.coordinator
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
