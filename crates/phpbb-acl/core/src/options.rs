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

//! Permission option catalog
//!
//! The catalog is the ordered list of `acl_options` rows. A user's packed
//! permission bits carry no names, so the position of each option inside the
//! catalog, counted separately for the global and the local scope, is what
//! maps a bit index back to an option name.

use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One row of the permission option catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AclOptionRecord {
    /// Storage identifier, not used for decoding; unreadable ids become 0
    #[serde(default, deserialize_with = "deserialize_option_id")]
    pub auth_option_id: u32,

    /// Option name, e.g. `m_edit` or `f_read`
    pub auth_option: String,

    /// Option has a bit in the global (forum 0) row
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_global: bool,

    /// Option has a bit in every per-forum row
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_local: bool,

    /// Restricted to board founders, not used for decoding
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub founder_only: bool,
}

impl AclOptionRecord {
    /// Create a record with the given scope flags
    pub fn new(auth_option: impl Into<String>, is_global: bool, is_local: bool) -> Self {
        Self {
            auth_option_id: 0,
            auth_option: auth_option.into(),
            is_global,
            is_local,
            founder_only: false,
        }
    }

    /// Global-only option
    pub fn global(auth_option: impl Into<String>) -> Self {
        Self::new(auth_option, true, false)
    }

    /// Local-only option
    pub fn local(auth_option: impl Into<String>) -> Self {
        Self::new(auth_option, false, true)
    }

    /// Set the storage identifier
    pub fn with_id(mut self, auth_option_id: u32) -> Self {
        self.auth_option_id = auth_option_id;
        self
    }
}

/// Storage rows carry flags as `0`/`1` numbers; booleans are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
    Float(f64),
    Other(#[allow(dead_code)] IgnoredAny),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = Option::<RawFlag>::deserialize(deserializer)?;
    Ok(match flag {
        Some(RawFlag::Bool(flag)) => flag,
        Some(RawFlag::Int(value)) => value == 1,
        Some(RawFlag::Float(value)) => value == 1.0,
        Some(RawFlag::Other(_)) | None => false,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOptionId {
    Id(u32),
    Other(#[allow(dead_code)] IgnoredAny),
}

fn deserialize_option_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawOptionId>::deserialize(deserializer)? {
        Some(RawOptionId::Id(id)) => id,
        _ => 0,
    })
}

/// Option name to bit index tables, one per scope
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct OptionIndexTable {
    global: HashMap<String, usize>,
    local: HashMap<String, usize>,
}

impl OptionIndexTable {
    /// Build the index tables from catalog rows in storage order.
    ///
    /// Each scope keeps its own running counter that advances for every row
    /// flagged for that scope. A name seen twice in the same scope keeps the
    /// index of its last occurrence.
    pub fn from_records(records: &[AclOptionRecord]) -> Self {
        let mut table = Self::default();
        let mut global_index = 0;
        let mut local_index = 0;

        for record in records {
            if record.is_local {
                table.local.insert(record.auth_option.clone(), local_index);
                local_index += 1;
            }
            if record.is_global {
                table.global.insert(record.auth_option.clone(), global_index);
                global_index += 1;
            }
        }

        debug!(
            "Parsed ACL option catalog: {} rows, {} global slots, {} local slots",
            records.len(),
            global_index,
            local_index
        );
        table
    }

    /// Bit index of `option` in the global row
    pub fn global_index(&self, option: &str) -> Option<usize> {
        self.global.get(option).copied()
    }

    /// Bit index of `option` in a per-forum row
    pub fn local_index(&self, option: &str) -> Option<usize> {
        self.local.get(option).copied()
    }

    /// Number of distinct global option names
    pub fn global_len(&self) -> usize {
        self.global.len()
    }

    /// Number of distinct local option names
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.local.is_empty()
    }
}

/// Parse a catalog into its index tables
pub fn parse_catalog(records: &[AclOptionRecord]) -> OptionIndexTable {
    OptionIndexTable::from_records(records)
}
