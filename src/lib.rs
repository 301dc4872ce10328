pub mod checks;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod report;
pub mod runner;
pub mod supervisor;
