//! Recording session control
//!
//! This module provides the `Controller` that runs in the control context:
//! - Lifecycle state machine (initialize, start, flush, stop)
//! - Command/response exchange with the capture engine
//! - Session statistics

mod config;
mod controller;
mod state;
mod stats;

pub use config::ControllerConfig;
pub use controller::Controller;
pub use state::RecorderState;
pub use stats::SessionStats;
