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

//! Error types for ACL decoding

use thiserror::Error;

/// Errors raised while decoding a raw permission blob
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid base-36 chunk {chunk:?} for forum {forum_id}")]
    InvalidChunk { forum_id: u32, chunk: String },
}

impl DecodeError {
    /// Forum row the offending chunk belongs to
    pub fn forum_id(&self) -> u32 {
        match self {
            DecodeError::InvalidChunk { forum_id, .. } => *forum_id,
        }
    }

    /// The literal chunk text that failed to decode
    pub fn chunk(&self) -> &str {
        match self {
            DecodeError::InvalidChunk { chunk, .. } => chunk,
        }
    }
}

/// Result alias for ACL decoding
pub type AclResult<T> = Result<T, DecodeError>;
