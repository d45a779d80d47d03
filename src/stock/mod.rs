pub mod registration;
pub mod service;
