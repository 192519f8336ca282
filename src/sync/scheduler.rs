//! RequestScheduler: debounced decision of *when* to ask for a new diff
//!
//! Two trigger sources feed one debounce timer:
//! - a finalized transcript turn
//! - a completed agent turn that was not itself an extraction turn
//!
//! Each source is deduplicated by event id. Every qualifying trigger re-arms
//! the timer, so a burst of turns coalesces into one firing after the burst
//! settles. Firing says "analyze now" and nothing else: whether a request is
//! already outstanding is the coordinator's concern.

use super::recent::RecentIds;
use super::timer::OneShot;
use crate::config::EngineConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Ids remembered per trigger source
const SEEN_CAPACITY: usize = 64;

/// What armed the debounce timer most recently
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    FinalTranscript { item_id: String },
    AgentTurnDone { response_id: String },
}

#[derive(Debug)]
pub struct RequestScheduler {
    delay: Duration,
    extraction_channel: String,
    running: bool,
    connected: bool,
    seen_items: RecentIds,
    seen_responses: RecentIds,
    timer: OneShot<Trigger>,
}

impl RequestScheduler {
    /// A stopped scheduler; call [`start`](Self::start) to begin scheduling.
    pub fn new(delay: Duration, extraction_channel: impl Into<String>) -> Self {
        Self {
            delay,
            extraction_channel: extraction_channel.into(),
            running: false,
            connected: false,
            seen_items: RecentIds::new(SEEN_CAPACITY),
            seen_responses: RecentIds::new(SEEN_CAPACITY),
            timer: OneShot::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.debounce(), config.channel.clone())
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop scheduling and cancel the pending timer
    pub fn dispose(&mut self) {
        self.running = false;
        self.timer.cancel();
    }

    /// Track the conversational session. Disconnecting cancels a pending
    /// timer; triggers seen while disconnected are not remembered.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        if !connected {
            self.timer.cancel();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// A transcript turn was finalized. Returns true if the timer was (re)armed.
    pub fn on_final_transcript(&mut self, item_id: &str, now: Instant) -> bool {
        if !self.accepting() || !self.seen_items.insert(item_id) {
            return false;
        }
        tracing::debug!(item_id, "scheduling extraction after final transcript");
        self.arm(
            Trigger::FinalTranscript {
                item_id: item_id.to_string(),
            },
            now,
        );
        true
    }

    /// An agent turn completed. Extraction-channel turns and turns without
    /// an id never schedule. Returns true if the timer was (re)armed.
    pub fn on_agent_turn_done(
        &mut self,
        response_id: Option<&str>,
        channel: Option<&str>,
        now: Instant,
    ) -> bool {
        if channel == Some(self.extraction_channel.as_str()) {
            return false;
        }
        let Some(response_id) = response_id else {
            return false;
        };
        if !self.accepting() || !self.seen_responses.insert(response_id) {
            return false;
        }
        tracing::debug!(response_id, "scheduling extraction after agent turn");
        self.arm(
            Trigger::AgentTurnDone {
                response_id: response_id.to_string(),
            },
            now,
        );
        true
    }

    /// Fire the debounce timer if it is due
    pub fn fire(&mut self, now: Instant) -> Option<Trigger> {
        self.timer.fire(now)
    }

    /// Drop a pending timer without stopping the scheduler
    pub fn cancel_pending(&mut self) -> Option<Trigger> {
        self.timer.cancel()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }

    fn accepting(&self) -> bool {
        self.running && self.connected
    }

    fn arm(&mut self, trigger: Trigger, now: Instant) {
        self.timer.arm(now + self.delay, trigger);
    }
}
