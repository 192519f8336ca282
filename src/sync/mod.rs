//! Deciding when to extract, and which extraction results to trust
//!
//! - [`RequestScheduler`]: debounces conversational triggers into "analyze now"
//! - [`InFlightCoordinator`]: correlation ids, supersession and the in-flight timeout
//! - [`SyncEngine`]: both of the above plus the graph store, driven by explicit time
//! - [`EngineDriver`]: the tokio event loop around a `SyncEngine`

mod coordinator;
mod driver;
mod engine;
mod recent;
mod scheduler;
mod timer;

pub use coordinator::{
    CompletionOutcome, CorrelationRecord, Discard, ErrorOutcome, InFlightCoordinator, Phase,
    Resolution,
};
pub use driver::{engine_channel, EngineDriver, EngineHandle, EngineInbox, EngineInput};
pub use engine::{ResponseOutcome, SyncEngine};
pub use recent::RecentIds;
pub use scheduler::{RequestScheduler, Trigger};
pub use timer::{earliest, OneShot};
