// HTTP surface over the stock cache.
// Serves the dealership front-end and back-office tools.

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
