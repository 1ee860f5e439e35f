pub mod config;
pub mod db;
pub mod error;
pub mod requests;
pub mod retry;
pub mod shutdown;
pub mod types;
