//! # wible-server
//!
//! HTTP server library for the wible wireless environment monitor.
//!
//! This library provides the API handlers and state management for wible.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
