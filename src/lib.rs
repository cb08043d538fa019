pub use crate::errors::{ErrorType, HarnessError};

pub mod assertions;
pub mod cli;
pub mod config;
pub mod errors;
pub mod heap;
pub mod realm;
pub mod report;
pub mod runner;
pub mod suites;
pub mod value;
pub mod weak;
