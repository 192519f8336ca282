//! An engine driver wired to a scripted extractor and an in-memory store
//!
//! Use from `#[tokio::test(start_paused = true)]` tests so debounce and
//! timeout waits complete instantly.

use mindweave::snapshot::SnapshotStore;
use mindweave::transport::{MockExtractor, ResponseMetadata};
use mindweave::{
    engine_channel, EngineConfig, EngineDriver, EngineHandle, ExtractorTransport, GraphState,
    MemorySnapshotStore, ResponseEvent, Role, SnapshotBridge, TranscriptTurn,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Harness {
    pub handle: EngineHandle,
    pub extractor: Arc<MockExtractor>,
    pub store: Arc<MemorySnapshotStore>,
    task: JoinHandle<()>,
    turns: usize,
}

impl Harness {
    /// Spawn a driver and mark the session connected
    pub fn start(config: EngineConfig, extractor: MockExtractor) -> Self {
        let (handle, inbox) = engine_channel();
        let extractor = Arc::new(extractor);
        let store = Arc::new(MemorySnapshotStore::new());
        let transport = ExtractorTransport::new(extractor.clone(), handle.clone());
        let bridge = SnapshotBridge::new(store.clone() as Arc<dyn SnapshotStore>);
        let driver = EngineDriver::new(config, Arc::new(transport), Arc::new(bridge), inbox);
        let task = tokio::spawn(driver.run());

        handle.connected(true);
        Self {
            handle,
            extractor,
            store,
            task,
            turns: 0,
        }
    }

    /// Finalize a user turn
    pub fn user_says(&mut self, text: &str) {
        self.turns += 1;
        self.handle.turn_finalized(TranscriptTurn::message(
            format!("item-{}", self.turns),
            Role::User,
            text,
        ));
    }

    /// The conversational agent finished an ordinary (non-extraction) turn
    pub fn agent_replies(&self, response_id: &str) {
        self.handle.response_done(ResponseEvent::text(
            response_id,
            ResponseMetadata {
                channel: Some("conversation".to_string()),
                ..Default::default()
            },
            "Sounds great.",
        ));
    }

    pub async fn advance(&self, millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    pub async fn state(&self) -> GraphState {
        self.handle.inspect().await.expect("driver should be running")
    }

    pub async fn stop(self) {
        self.handle.shutdown();
        self.task.await.expect("driver task panicked");
    }
}
