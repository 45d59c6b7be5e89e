//! Custom error types for the application.
//!
//! This module defines the primary error type, `SpectralError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures a measurement
//! session can produce, from connection problems to rejected measurement
//! requests.
//!
//! ## Error Taxonomy
//!
//! - **`Connection`**: The device could not be reached or dropped the link.
//! - **`Configuration`**: Settings were rejected by the device, or the
//!   application configuration failed semantic validation.
//! - **`Measurement`**: An acquisition started but did not produce a usable
//!   result.
//! - **`Aborted`**: An acquisition was cancelled cooperatively before the
//!   device call started.
//! - **`Busy`**: A measurement request was rejected because one is already
//!   outstanding. This is a normal flow-control signal, not a fault.
//! - **`Unsupported`**: An optional device operation (abort, calibration,
//!   self-test) is not implemented by the driver.
//! - **`InvalidData`**: A device produced a result that violates the data
//!   model invariants (mismatched array lengths, non-increasing wavelengths).
//! - **`Config`**/**`Io`**: wrapped errors from `figment` and `std::io`.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, SpectralError>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum SpectralError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Measurement error: {0}")]
    Measurement(String),

    #[error("Measurement aborted")]
    Aborted,

    #[error("A measurement is already in progress")]
    Busy,

    #[error("Operation '{0}' is not supported by this device")]
    Unsupported(String),

    #[error("Invalid measurement data: {0}")]
    InvalidData(String),

    #[error("Config file error: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "storage_csv")]
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}
