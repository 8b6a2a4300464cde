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

//! Storage seam around the phpBB3 ACL decoder
//!
//! The decoder only needs two raw inputs: the option catalog and a user's
//! permission blob. This crate supplies them:
//! - `backend`: the storage driver trait and its drivers
//! - `cache`: TTL cache for the option catalog
//! - `service`: builds a `UserAcl` from storage
//! - `session`: per-request user attribute bag with a lazily built ACL
//! - `config`: driver and cache settings

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod service;
pub mod session;

pub use backend::*;
pub use cache::*;
pub use config::*;
pub use error::*;
pub use service::*;
pub use session::*;
