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

//! Configuration for the ACL storage layer

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Catalog cache lifetime; the option schema only changes through the admin panel
pub const ACL_OPTIONS_CACHE_TTL_SECS: u64 = 3600;

/// Cache lifetime of the anonymous user record
pub const ANONYMOUS_CACHE_TTL_SECS: u64 = 3600 * 24;

/// phpBB3 reserves user id 1 for the anonymous guest
pub const ANONYMOUS_USER_ID: u32 = 1;

/// Storage driver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Records held in process memory
    Memory,
    /// Records loaded from a JSON data file
    Json,
}

impl std::str::FromStr for Driver {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Driver::Memory),
            "json" => Ok(Driver::Json),
            other => Err(StoreError::UnsupportedDriver(other.to_string())),
        }
    }
}

/// Configuration for the storage layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage driver
    pub driver: Driver,

    /// Data file for the `json` driver
    pub data_file: Option<PathBuf>,

    /// Option catalog cache lifetime in seconds
    pub acl_options_cache_ttl_secs: u64,

    /// Anonymous user cache lifetime in seconds
    pub anonymous_cache_ttl_secs: u64,

    /// User id treated as the anonymous guest
    pub anonymous_user_id: u32,

    /// Rows per page when fetching the option catalog
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Memory,
            data_file: None,
            acl_options_cache_ttl_secs: ACL_OPTIONS_CACHE_TTL_SECS,
            anonymous_cache_ttl_secs: ANONYMOUS_CACHE_TTL_SECS,
            anonymous_user_id: ANONYMOUS_USER_ID,
            page_size: 100,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// An unknown `PHPBB3_DRIVER` is an error; unparsable numeric values
    /// fall back to their defaults.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            driver: match var("PHPBB3_DRIVER") {
                Some(driver) => driver.parse()?,
                None => defaults.driver,
            },

            data_file: var("PHPBB3_DATA_FILE").map(PathBuf::from),

            acl_options_cache_ttl_secs: var("PHPBB3_ACL_OPTIONS_CACHE_TTL")
                .map(|v| v.parse().unwrap_or(defaults.acl_options_cache_ttl_secs))
                .unwrap_or(defaults.acl_options_cache_ttl_secs),

            anonymous_cache_ttl_secs: var("PHPBB3_ANONYMOUS_CACHE_TTL")
                .map(|v| v.parse().unwrap_or(defaults.anonymous_cache_ttl_secs))
                .unwrap_or(defaults.anonymous_cache_ttl_secs),

            anonymous_user_id: var("PHPBB3_ANONYMOUS_USER_ID")
                .map(|v| v.parse().unwrap_or(defaults.anonymous_user_id))
                .unwrap_or(defaults.anonymous_user_id),

            page_size: var("PHPBB3_PAGE_SIZE").map(|v| v.parse().unwrap_or(defaults.page_size)).unwrap_or(defaults.page_size),
        })
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn with_driver(mut self, driver: Driver) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    pub fn acl_options_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.acl_options_cache_ttl_secs)
    }

    pub fn anonymous_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.anonymous_cache_ttl_secs)
    }
}
