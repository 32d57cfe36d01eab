pub use crate::features::metrics::{RoundSummary, RunningMean, down_threshold};
