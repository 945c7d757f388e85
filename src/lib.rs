pub mod candidates;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod oracle;
pub mod planner;
pub mod sanitize;
pub mod search;
pub mod service;
pub mod targets;

pub use error::{PlannerError, Result};
