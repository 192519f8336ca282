//! EngineDriver: runs a [`SyncEngine`] on a tokio task
//!
//! All engine state lives on the driver task. Other tasks talk to it through a
//! cloneable [`EngineHandle`]; the loop sleeps until the engine's next timer
//! deadline or the next input, whichever comes first.

use super::engine::{ResponseOutcome, SyncEngine};
use crate::config::EngineConfig;
use crate::graph::GraphState;
use crate::snapshot::{SaveOutcome, SnapshotBridge};
use crate::transport::{
    ConversationTransport, ErrorEvent, ExtractionRequest, ResponseEvent, TranscriptTurn,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Inputs accepted by the driver loop
#[derive(Debug)]
pub enum EngineInput {
    Connected(bool),
    TurnFinalized(TranscriptTurn),
    ResponseDone(ResponseEvent),
    ResponseFailed(ErrorEvent),
    AnalyzeNow,
    /// Switch workspace, loading its snapshot
    Activate(Option<String>),
    /// Persist the active workspace; the outcome is sent back if asked for
    Save(Option<oneshot::Sender<SaveOutcome>>),
    Inspect(oneshot::Sender<GraphState>),
    Shutdown,
}

/// Cloneable sender side of the driver's inbox.
///
/// Sends never block. Once the driver has stopped they are silently dropped.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineInput>,
}

impl EngineHandle {
    fn send(&self, input: EngineInput) {
        if self.tx.send(input).is_err() {
            tracing::debug!("engine driver stopped; input dropped");
        }
    }

    pub fn connected(&self, connected: bool) {
        self.send(EngineInput::Connected(connected));
    }

    pub fn turn_finalized(&self, turn: TranscriptTurn) {
        self.send(EngineInput::TurnFinalized(turn));
    }

    pub fn response_done(&self, event: ResponseEvent) {
        self.send(EngineInput::ResponseDone(event));
    }

    pub fn response_failed(&self, event: ErrorEvent) {
        self.send(EngineInput::ResponseFailed(event));
    }

    pub fn analyze_now(&self) {
        self.send(EngineInput::AnalyzeNow);
    }

    pub fn activate(&self, workspace: Option<String>) {
        self.send(EngineInput::Activate(workspace));
    }

    pub fn save(&self) {
        self.send(EngineInput::Save(None));
    }

    /// Persist and wait for the outcome. `None` if there was nothing to save
    /// (no active workspace) or the driver has stopped.
    pub async fn save_and_wait(&self) -> Option<SaveOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineInput::Save(Some(tx)));
        rx.await.ok()
    }

    /// A copy of the live graph
    pub async fn inspect(&self) -> Option<GraphState> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineInput::Inspect(tx));
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.send(EngineInput::Shutdown);
    }
}

/// Receiver side of the driver's inbox
#[derive(Debug)]
pub struct EngineInbox {
    rx: mpsc::UnboundedReceiver<EngineInput>,
}

impl EngineInbox {
    pub async fn recv(&mut self) -> Option<EngineInput> {
        self.rx.recv().await
    }
}

/// Create the handle/inbox pair before the driver itself, so a transport
/// that reports back through the handle can be built first.
pub fn engine_channel() -> (EngineHandle, EngineInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineHandle { tx }, EngineInbox { rx })
}

pub struct EngineDriver {
    engine: SyncEngine,
    transport: Arc<dyn ConversationTransport>,
    bridge: Arc<SnapshotBridge>,
    inbox: EngineInbox,
}

impl EngineDriver {
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn ConversationTransport>,
        bridge: Arc<SnapshotBridge>,
        inbox: EngineInbox,
    ) -> Self {
        let mut engine = SyncEngine::new(config);
        engine.start();
        Self {
            engine,
            transport,
            bridge,
            inbox,
        }
    }

    /// Run until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!(channel = %self.engine.config().channel, "engine driver started");
        loop {
            let deadline = self.engine.next_deadline();
            tokio::select! {
                input = self.inbox.recv() => {
                    let Some(input) = input else { break };
                    if !self.handle(input).await {
                        break;
                    }
                }
                _ = sleep_until(deadline) => {
                    if let Some(request) = self.engine.poll(Instant::now()) {
                        self.dispatch(request).await;
                    }
                }
            }
        }
        self.engine.dispose();
        tracing::debug!("engine driver stopped");
    }

    /// Returns false on shutdown
    async fn handle(&mut self, input: EngineInput) -> bool {
        let now = Instant::now();
        match input {
            EngineInput::Connected(connected) => self.engine.set_connected(connected),
            EngineInput::TurnFinalized(turn) => {
                self.engine.turn_finalized(turn, now);
            }
            EngineInput::ResponseDone(event) => {
                let outcome = self.engine.response_done(&event, now);
                if matches!(outcome, ResponseOutcome::Applied(_)) && self.engine.config().autosave {
                    self.spawn_save(None);
                }
            }
            EngineInput::ResponseFailed(event) => {
                self.engine.response_failed(&event);
            }
            EngineInput::AnalyzeNow => {
                if let Some(request) = self.engine.analyze_now(now) {
                    self.dispatch(request).await;
                }
            }
            EngineInput::Activate(workspace) => {
                let snapshot = match &workspace {
                    Some(key) => self.bridge.load(key).await,
                    None => None,
                };
                self.engine.activate_workspace(workspace, snapshot.as_ref());
            }
            EngineInput::Save(reply) => self.spawn_save(reply),
            EngineInput::Inspect(reply) => {
                let _ = reply.send(self.engine.state().clone());
            }
            EngineInput::Shutdown => return false,
        }
        true
    }

    async fn dispatch(&mut self, request: ExtractionRequest) {
        if let Err(e) = self.transport.submit(request.clone()).await {
            tracing::warn!(
                correlation_id = %request.correlation_id(),
                error = %e,
                "failed to submit extraction request"
            );
            self.engine
                .response_failed(&ErrorEvent::for_request(&request, e.to_string()));
        }
    }

    /// Save off the driver task so a slow store never stalls the loop
    fn spawn_save(&self, reply: Option<oneshot::Sender<SaveOutcome>>) {
        let Some(snapshot) = self.engine.snapshot() else {
            tracing::debug!("no active workspace; nothing to save");
            return;
        };
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            let outcome = bridge.save(&snapshot).await;
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
