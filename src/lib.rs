//! Dealership stock cache and sync service.
//!
//! Pulls the advertiser's full stock from the AutoTrader feed on a fixed
//! daily schedule, caches active listings in Postgres and serves them over
//! an authenticated HTTP API, with a UK Vehicle Data registry fallback for
//! registrations that are not on the forecourt.

pub mod api;
pub mod error;
pub mod logging;
pub mod providers;
pub mod stock;
pub mod store;
pub mod sync;

pub mod util {
    pub mod env;
}
