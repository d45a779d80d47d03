mod provider;

pub use provider::{UkvdConfig, UkvdProvider};
