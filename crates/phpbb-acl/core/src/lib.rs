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

//! phpBB3 ACL decoding and privilege queries
//!
//! phpBB3 stores each user's effective permissions as a packed, newline separated
//! blob: one line per forum, each line a run of 6-character base-36 chunks that
//! expand to 31-bit groups. This crate provides:
//! - `options`: the permission option catalog and its global/local index tables
//! - `permissions`: the blob decoder with per-chunk memoization
//! - `acl`: the privilege query engine (`has_privilege` / `has_privileges`)

pub mod acl;
pub mod error;
pub mod options;
pub mod permissions;

pub use acl::*;
pub use error::*;
pub use options::*;
pub use permissions::*;
