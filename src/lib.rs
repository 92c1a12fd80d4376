//! Skycam library - HTTP control of a ZWO ASI camera.
//!
//! This library exposes the core of the `skycam` service for use in tests
//! and by the binary.
//!
//! # Modules
//!
//! - `device`: SDK abstraction, the real camera backend and a scripted mock
//! - `session`: Idle/Streaming/Capturing state machine and the pull loop
//! - `web`: axum router, MJPEG streaming and JSON responses
//! - `config`: TOML configuration and command-line overrides
//! - `error`: Error types with vendor status codes and hints
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod image_ops;
pub mod logging;
pub mod session;
pub mod settings;
pub mod state;
pub mod web;
