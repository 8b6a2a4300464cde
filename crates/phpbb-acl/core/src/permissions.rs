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

//! Packed permission blob decoding
//!
//! Line `n` of the blob holds the bits for forum `n`; line 0 is the global
//! row. Every line is cut into 6-character base-36 chunks and each chunk
//! expands to a 31-bit group, left padded with zeros.

use crate::error::{AclResult, DecodeError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, trace};

/// Characters per packed chunk
pub const CHUNK_LEN: usize = 6;

/// Bits produced by one chunk
pub const CHUNK_BITS: usize = 31;

/// Radix of the packed representation
const RADIX: u32 = 36;

/// Decoded bit row of a single forum
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumBits {
    bits: Vec<bool>,
}

impl ForumBits {
    /// Row with `len` unset bits
    pub fn zeroed(len: usize) -> Self {
        Self { bits: vec![false; len] }
    }

    /// Bit at `index`, `None` past the end of the row
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

impl From<Vec<bool>> for ForumBits {
    fn from(bits: Vec<bool>) -> Self {
        Self { bits }
    }
}

impl fmt::Display for ForumBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Decoded rows of one user, keyed by forum id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumPermissions {
    rows: BTreeMap<u32, ForumBits>,
}

impl ForumPermissions {
    /// Row for `forum_id`, absent for blank or missing lines
    pub fn get(&self, forum_id: u32) -> Option<&ForumBits> {
        self.rows.get(&forum_id)
    }

    pub fn contains(&self, forum_id: u32) -> bool {
        self.rows.contains_key(&forum_id)
    }

    /// Forum ids that have a row, ascending
    pub fn forum_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &ForumBits)> {
        self.rows.iter().map(|(forum_id, bits)| (*forum_id, bits))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Blob decoder with a chunk memo shared across all rows it decodes
#[derive(Debug, Default)]
pub struct PermissionDecoder {
    chunk_cache: HashMap<String, Vec<bool>>,
}

impl PermissionDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct chunks decoded so far
    pub fn cached_chunks(&self) -> usize {
        self.chunk_cache.len()
    }

    /// Decode a whole permission blob.
    ///
    /// Trailing whitespace of the blob is ignored. Blank lines produce no row,
    /// so the forum ids of the remaining rows still match their line numbers.
    pub fn decode(&mut self, raw: &str) -> AclResult<ForumPermissions> {
        let mut permissions = ForumPermissions::default();

        for (line_no, line) in split_rows(raw.trim_end()).into_iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let forum_id = line_no as u32;

            let mut bits = Vec::with_capacity(line.len().div_ceil(CHUNK_LEN) * CHUNK_BITS);
            for chunk in line.as_bytes().chunks(CHUNK_LEN) {
                bits.extend_from_slice(self.expand_chunk(forum_id, chunk)?);
            }
            permissions.rows.insert(forum_id, ForumBits::from(bits));
        }

        debug!("Decoded permission blob: {} forum rows, {} distinct chunks", permissions.len(), self.chunk_cache.len());
        Ok(permissions)
    }

    fn expand_chunk(&mut self, forum_id: u32, chunk: &[u8]) -> AclResult<&[bool]> {
        let text = String::from_utf8_lossy(chunk);

        if !self.chunk_cache.contains_key(text.as_ref()) {
            let bits = decode_chunk(&text).ok_or_else(|| DecodeError::InvalidChunk {
                forum_id,
                chunk: text.to_string(),
            })?;
            self.chunk_cache.insert(text.to_string(), bits);
        } else {
            trace!("Chunk cache hit for {:?}", text);
        }

        Ok(self.chunk_cache[text.as_ref()].as_slice())
    }
}

/// Split on every line boundary, treating `\r\n` as one break.
///
/// A lone `\r` ends a row too, as do the other Unicode line separators.
fn split_rows(text: &str) -> Vec<&str> {
    let mut rows = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if !matches!(c, '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}'..='\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}') {
            continue;
        }
        rows.push(&text[start..pos]);
        start = pos + c.len_utf8();
        if c == '\r' && chars.next_if(|(_, next)| *next == '\n').is_some() {
            start += 1;
        }
    }
    if start < text.len() {
        rows.push(&text[start..]);
    }
    rows
}

/// Decode a blob with a fresh decoder
pub fn decode_permissions(raw: &str) -> AclResult<ForumPermissions> {
    PermissionDecoder::new().decode(raw)
}

/// Expand one base-36 chunk into its bit group.
///
/// The group is left padded to `CHUNK_BITS`; values that need more bits keep
/// their natural width. Returns `None` for an empty chunk or any character
/// outside `[0-9A-Za-z]`.
pub fn decode_chunk(chunk: &str) -> Option<Vec<bool>> {
    if chunk.is_empty() {
        return None;
    }

    let mut value: u64 = 0;
    for c in chunk.chars() {
        let digit = c.to_digit(RADIX)?;
        value = value.checked_mul(RADIX as u64)?.checked_add(digit as u64)?;
    }

    let width = (u64::BITS - value.leading_zeros()) as usize;
    let len = width.max(CHUNK_BITS);
    Some((0..len).rev().map(|shift| (value >> shift) & 1 == 1).collect())
}
