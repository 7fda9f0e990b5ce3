// lib.rs
#![warn(clippy::large_futures)]

pub use std::{pin::Pin, sync::Arc};

pub use anyhow::bail;
pub use log::*;
pub use tokio::time::{sleep, Duration};

mod config;
pub use config::*;

mod reading;
pub use reading::*;

mod state;
pub use state::*;

mod measure;
pub use measure::*;

mod bus;
pub use bus::*;

mod sampler;
pub use sampler::*;

mod command;
pub use command::*;

mod font;
pub use font::*;

mod display;
pub use display::*;

#[cfg(target_os = "espidf")]
mod mqtt;
#[cfg(target_os = "espidf")]
pub use mqtt::*;

#[cfg(target_os = "espidf")]
mod wifi;
#[cfg(target_os = "espidf")]
pub use wifi::*;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

// EOF
