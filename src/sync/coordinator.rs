//! InFlightCoordinator: at most one effective outstanding extraction request
//!
//! Supersede, don't queue: every `issue` mints a new correlation id that
//! becomes current at once. Older requests are never aborted, their results
//! are simply disregarded when (if) they arrive.
//!
//! ```text
//! Idle -> RequestIssued -> Applied | Superseded | TimedOut | Errored -> Idle
//! ```

use super::recent::RecentIds;
use super::timer::OneShot;
use crate::config::EngineConfig;
use crate::diff::{parse_diff, Diff};
use crate::transport::{ErrorEvent, ExtractionRequest, RequestMetadata, ResponseEvent};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// The current request's correlation id and when it was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationRecord {
    pub correlation_id: String,
    pub issued_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    RequestIssued,
}

/// How the most recent request left the `RequestIssued` phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// Completed, but the payload was not a usable diff
    Malformed,
    Superseded,
    TimedOut,
    Errored,
}

/// Why an inbound event had no effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    OtherChannel,
    OtherWorkspace { active: String, received: String },
    Superseded { received: String, current: Option<String> },
    Duplicate { response_id: String },
    /// Error without a correlation id under strict correlation
    Uncorrelated,
    Disposed,
}

/// Result of handling a completion event
#[derive(Debug)]
pub enum CompletionOutcome {
    /// The payload validated; the caller applies `diff`
    Accepted {
        correlation_id: Option<String>,
        response_id: Option<String>,
        diff: Diff,
    },
    /// The request is finished but its payload is unusable
    Malformed {
        response_id: Option<String>,
        reason: String,
    },
    Discarded(Discard),
}

/// Result of handling an error event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorOutcome {
    Released { correlation_id: Option<String> },
    Discarded(Discard),
}

#[derive(Debug)]
pub struct InFlightCoordinator {
    channel: String,
    timeout: Duration,
    strict_errors: bool,
    workspace: Option<String>,
    current: Option<CorrelationRecord>,
    in_flight: bool,
    timeout_timer: OneShot<String>,
    processed: RecentIds,
    last_resolution: Option<Resolution>,
    disposed: bool,
}

impl InFlightCoordinator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            timeout: config.inflight_timeout(),
            strict_errors: config.strict_error_correlation,
            workspace: None,
            current: None,
            in_flight: false,
            timeout_timer: OneShot::new(),
            processed: RecentIds::new(config.recent_response_capacity),
            last_resolution: None,
            disposed: false,
        }
    }

    /// Scope to a workspace, forgetting any outstanding request
    pub fn set_workspace(&mut self, workspace: Option<String>) {
        self.workspace = workspace;
        self.current = None;
        self.in_flight = false;
        self.timeout_timer.cancel();
    }

    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    /// Mint a correlation id, make it current and build the request.
    ///
    /// Never blocks on an outstanding request; that one is superseded.
    pub fn issue(&mut self, instructions: String, now: Instant) -> ExtractionRequest {
        let correlation_id = Uuid::new_v4().to_string();

        if self.in_flight {
            tracing::info!(
                previous = ?self.current_correlation_id(),
                correlation_id = %correlation_id,
                "superseding in-flight extraction request"
            );
            self.last_resolution = Some(Resolution::Superseded);
        } else {
            tracing::info!(
                correlation_id = %correlation_id,
                context_chars = instructions.len(),
                "issuing extraction request"
            );
        }

        self.in_flight = true;
        self.current = Some(CorrelationRecord {
            correlation_id: correlation_id.clone(),
            issued_at: now,
        });
        self.timeout_timer.arm(now + self.timeout, correlation_id.clone());

        ExtractionRequest::new(
            instructions,
            RequestMetadata {
                channel: self.channel.clone(),
                workspace_key: self.workspace.clone(),
                correlation_id,
            },
        )
    }

    /// Decide whether a completion belongs to the current request.
    pub fn on_completion(&mut self, event: &ResponseEvent) -> CompletionOutcome {
        if let Err(discard) = self.admit(event) {
            tracing::debug!(?discard, response_id = ?event.id, "discarding completion");
            return CompletionOutcome::Discarded(discard);
        }

        if let Some(id) = &event.id {
            self.processed.insert(id);
        }
        self.release();

        let parsed = event
            .json_payload()
            .ok_or_else(|| "no JSON payload in response".to_string())
            .and_then(|payload| parse_diff(&payload).map_err(|e| e.to_string()));

        match parsed {
            Ok(diff) => {
                self.last_resolution = Some(Resolution::Applied);
                CompletionOutcome::Accepted {
                    correlation_id: event.correlation_id().map(str::to_string),
                    response_id: event.id.clone(),
                    diff,
                }
            }
            Err(reason) => {
                tracing::warn!(response_id = ?event.id, reason = %reason, "discarding malformed diff");
                self.last_resolution = Some(Resolution::Malformed);
                CompletionOutcome::Malformed {
                    response_id: event.id.clone(),
                    reason,
                }
            }
        }
    }

    fn admit(&self, event: &ResponseEvent) -> Result<(), Discard> {
        if self.disposed {
            return Err(Discard::Disposed);
        }
        if event.channel() != Some(self.channel.as_str()) {
            return Err(Discard::OtherChannel);
        }
        if let (Some(active), Some(received)) = (self.workspace.as_deref(), event.workspace_key()) {
            if active != received {
                return Err(Discard::OtherWorkspace {
                    active: active.to_string(),
                    received: received.to_string(),
                });
            }
        }
        if let Some(received) = event.correlation_id() {
            let current = self.current_correlation_id();
            if current != Some(received) {
                return Err(Discard::Superseded {
                    received: received.to_string(),
                    current: current.map(str::to_string),
                });
            }
        }
        if let Some(id) = &event.id {
            if self.processed.contains(id) {
                return Err(Discard::Duplicate {
                    response_id: id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Release the in-flight guard if the error belongs to the current request.
    pub fn on_error(&mut self, event: &ErrorEvent) -> ErrorOutcome {
        if self.disposed {
            return ErrorOutcome::Discarded(Discard::Disposed);
        }
        if event.channel() != Some(self.channel.as_str()) {
            return ErrorOutcome::Discarded(Discard::OtherChannel);
        }

        let matches = match event.correlation_id() {
            Some(received) => {
                let current = self.current_correlation_id();
                if current != Some(received) {
                    tracing::debug!(received, ?current, "ignoring error for superseded request");
                    return ErrorOutcome::Discarded(Discard::Superseded {
                        received: received.to_string(),
                        current: current.map(str::to_string),
                    });
                }
                true
            }
            None => !self.strict_errors,
        };

        if !matches {
            tracing::info!(message = ?event.message, "extraction error without correlation id");
            return ErrorOutcome::Discarded(Discard::Uncorrelated);
        }

        tracing::warn!(
            correlation_id = ?event.correlation_id(),
            message = ?event.message,
            "extraction request failed"
        );
        self.release();
        self.last_resolution = Some(Resolution::Errored);
        ErrorOutcome::Released {
            correlation_id: event.correlation_id().map(str::to_string),
        }
    }

    /// Fire the in-flight timeout if due.
    ///
    /// Returns the abandoned correlation id. The id stays current, so a late
    /// completion for it is still honored.
    pub fn fire_timeout(&mut self, now: Instant) -> Option<String> {
        let armed_for = self.timeout_timer.fire(now)?;
        if self.current_correlation_id() != Some(armed_for.as_str()) {
            return None;
        }
        tracing::warn!(correlation_id = %armed_for, "extraction request timed out; guard reset");
        self.in_flight = false;
        self.last_resolution = Some(Resolution::TimedOut);
        Some(armed_for)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timeout_timer.deadline()
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight {
            Phase::RequestIssued
        } else {
            Phase::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn current(&self) -> Option<&CorrelationRecord> {
        self.current.as_ref()
    }

    pub fn current_correlation_id(&self) -> Option<&str> {
        self.current.as_ref().map(|r| r.correlation_id.as_str())
    }

    pub fn last_resolution(&self) -> Option<Resolution> {
        self.last_resolution
    }

    /// Cancel the timeout and refuse further events
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.in_flight = false;
        self.timeout_timer.cancel();
    }

    fn release(&mut self) {
        self.in_flight = false;
        self.timeout_timer.cancel();
    }
}
