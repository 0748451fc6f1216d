//! Integration test utilities for the chat client
//!
//! This crate provides an in-process WebSocket relay and helpers for running
//! end-to-end tests of the connection manager against a real socket.

pub mod helpers;

pub use helpers::*;
