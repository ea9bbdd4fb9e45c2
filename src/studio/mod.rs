//! Session state and the actions that drive it.

mod orchestrator;
mod preview;
mod session;

pub use orchestrator::{ActionOutcome, Studio};
pub use preview::PreviewStore;
pub use session::{BusyFlags, Operation, Session, SessionView, SourceImage};
