mod stats;
mod store;

pub use stats::mean_duration;
pub use store::RunningMean;
