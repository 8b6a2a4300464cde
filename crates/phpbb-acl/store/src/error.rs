// phpbb-acl
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Error handling for the ACL storage layer

use phpbb_acl_core::DecodeError;
use thiserror::Error;

/// Storage layer error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Permission decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Serde JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend { message: message.into() }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::UnsupportedDriver(_) => "unsupported_driver",
            StoreError::Backend { .. } => "backend_error",
            StoreError::MissingConfig(_) => "missing_config",
            StoreError::Decode(_) => "decode_error",
            StoreError::Json(_) => "json_error",
            StoreError::Config(_) => "config_error",
            StoreError::Io(_) => "io_error",
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
