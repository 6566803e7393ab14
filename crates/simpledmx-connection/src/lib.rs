//! Connection to a USB DMX widget with cancellable channel fades.
//!
//! This is the "just works" layer. Open a widget, set channel levels, render
//! them, or ramp channels to new levels in the background while keeping at
//! most one fade alive per connection.

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod fault;
pub mod plan;

#[cfg(feature = "async")]
pub mod async_engine;

mod output;

#[cfg(test)]
mod testing;

pub use config::ConnectionConfig;
pub use connection::DmxConnection;
pub use engine::{RunPhase, TransitionEngine};
pub use error::{DmxError, Result};
pub use fault::{Decision, FaultHandler, PropagateFaults, SuppressFaults};
pub use plan::{TransitionPlan, TransitionStep, STEP_COUNT};

#[cfg(feature = "async")]
pub use async_engine::{AsyncDmxConnection, AsyncTransitionEngine};
