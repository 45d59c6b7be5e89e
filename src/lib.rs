//! # Spectral Bench Core Library
//!
//! Core library for the `spectral-bench` application: a device-agnostic
//! control surface for spectral measurement instruments. The binary in
//! `main.rs` wires a device driver, configuration and logging into the
//! native GUI; everything else lives here so the same logic can back other
//! frontends or integration tests.
//!
//! ## Crate Structure
//!
//! - **`auto_repeat`**: Periodic unattended measurement cycles with a
//!   skip-on-overlap policy.
//! - **`config`**: TOML + environment configuration via Figment. See
//!   `config::Settings`.
//! - **`device`**: The `SpectralDevice` capability trait, device status and
//!   session state machine, capability descriptions, and the mock
//!   spectrometer used for development and tests.
//! - **`error`**: The central `SpectralError` enum.
//! - **`gui`**: The eframe/egui control surface.
//! - **`log_capture`**: A `log::Log` implementation feeding the GUI log
//!   panel.
//! - **`measurement`**: Measurement results, derived quantities, CSV export
//!   and the in-memory history.
//! - **`render`**: The cached-backdrop spectrum rendering pipeline and the
//!   wavelength-to-color mapping.
//! - **`scheduler`**: Single-outstanding measurement scheduling over a
//!   worker thread.

pub mod auto_repeat;
pub mod config;
pub mod device;
pub mod error;
pub mod gui;
pub mod log_capture;
pub mod measurement;
pub mod render;
pub mod scheduler;
