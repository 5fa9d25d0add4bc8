pub mod logger;

pub use logger::{CycleId, init_logging, warn_if_slow};
