mod provider;

pub use provider::{AutoTraderConfig, AutoTraderProvider};
