mod common;
mod features;

pub mod alerts;
pub mod config;
pub mod data_model;
pub mod liveview;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod probe;
pub mod probe_engine;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod storage;

pub use common::net::TargetParseError;
pub use common::time::{Clock, ManualClock, SystemClock};
