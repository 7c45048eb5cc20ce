//! voicecast-rs library crate
//!
//! This module exposes internal types for integration testing.
//! The main binary is in main.rs.

#[macro_use]
extern crate log;

pub mod audio;
pub mod config;
pub mod console;
pub mod constants;
pub mod error;
pub mod event;
pub mod modules;
pub mod net;

#[cfg(test)]
mod event_tests;
#[cfg(test)]
mod transcode_tests;
