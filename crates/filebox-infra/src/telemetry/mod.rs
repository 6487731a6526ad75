//! Tracing initialization
//!
//! Installs the global `tracing` subscriber used by the `filebox` binary.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
