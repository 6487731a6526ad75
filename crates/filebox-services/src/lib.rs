//! FileBox Services Library
//!
//! The intake pipeline assembled from the core pieces:
//! - [`ScanOrchestrator`]: bounded-concurrency screening over many records
//! - [`IntakeSession`]: the per-session record list and state machine
//! - [`IntakeController`]: the facade a presentation layer drives
//! - [`HttpScanService`]: the optional remote scanning client

pub mod controller;
pub mod events;
pub mod orchestrator;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use controller::{AddOutcome, IntakeController};
pub use events::{IntakeEvent, RejectedFile};
pub use orchestrator::ScanOrchestrator;
pub use session::{Admission, IntakeSession, SessionSnapshot};

#[cfg(feature = "remote-scan")]
pub use services::HttpScanService;
