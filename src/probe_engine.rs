pub use crate::features::probe::engine::{ProbeClient, ProbeEngine, Prober, SimulatedOutage};
