pub mod engine;
pub mod scheduler;

pub use engine::{SyncEngine, SyncOutcome, LOCK_WINDOW_MINUTES};
