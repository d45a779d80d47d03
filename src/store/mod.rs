pub mod db;
pub mod metadata;
pub mod stock;
