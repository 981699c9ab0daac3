#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod config;
pub mod conversation;
pub mod error;
pub mod providers;
pub mod run;
pub mod sessions;

pub use config::Config;
pub use error::{Error, Result};
