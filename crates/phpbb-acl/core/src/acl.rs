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

//! Privilege queries over a decoded user ACL

use crate::error::AclResult;
use crate::options::{AclOptionRecord, OptionIndexTable};
use crate::permissions::{CHUNK_BITS, ForumBits, ForumPermissions, PermissionDecoder};
use std::collections::HashMap;
use tracing::trace;

/// Forum id of the global permission row
pub const GLOBAL_FORUM_ID: u32 = 0;

/// Prefix that inverts the answer of a privilege query
pub const NEGATION_PREFIX: char = '!';

/// Decoded ACL of one user plus its lookup memo.
///
/// Build one per session or request and drop it afterwards; queries take
/// `&mut self` because they fill the memo.
#[derive(Debug)]
pub struct UserAcl {
    options: OptionIndexTable,
    permissions: ForumPermissions,
    decoder: PermissionDecoder,
    lookup_cache: HashMap<(u32, String), bool>,
}

impl UserAcl {
    /// Parse the option catalog and decode the raw permission blob
    pub fn new(records: &[AclOptionRecord], raw_permissions: &str) -> AclResult<Self> {
        Self::from_parts(OptionIndexTable::from_records(records), raw_permissions)
    }

    /// Decode the raw permission blob against an already parsed catalog
    pub fn from_parts(options: OptionIndexTable, raw_permissions: &str) -> AclResult<Self> {
        let mut decoder = PermissionDecoder::new();
        let permissions = decoder.decode(raw_permissions)?;

        Ok(Self {
            options,
            permissions,
            decoder,
            lookup_cache: HashMap::new(),
        })
    }

    /// ACL without any permission rows
    pub fn anonymous(options: OptionIndexTable) -> Self {
        Self {
            options,
            permissions: ForumPermissions::default(),
            decoder: PermissionDecoder::new(),
            lookup_cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &OptionIndexTable {
        &self.options
    }

    pub fn permissions(&self) -> &ForumPermissions {
        &self.permissions
    }

    /// Distinct chunks expanded while decoding
    pub fn decoded_chunks(&self) -> usize {
        self.decoder.cached_chunks()
    }

    /// Number of memoized `(forum, option)` answers
    pub fn cached_lookups(&self) -> usize {
        self.lookup_cache.len()
    }

    /// Whether the user holds `privilege` globally or in `forum_id`.
    ///
    /// A leading `!` inverts the answer. The global bit is consulted first;
    /// for a non-zero forum the local bit is OR-ed in, so a local row can add
    /// a privilege but never take away a global grant. Unknown options and
    /// bit indices past the end of a row read as unset.
    pub fn has_privilege(&mut self, privilege: &str, forum_id: u32) -> bool {
        let (negated, option) = match privilege.strip_prefix(NEGATION_PREFIX) {
            Some(option) => (true, option),
            None => (false, privilege),
        };

        let key = (forum_id, option.to_string());
        let granted = match self.lookup_cache.get(&key) {
            Some(granted) => {
                trace!("ACL lookup cache hit for {} in forum {}", option, forum_id);
                *granted
            }
            None => {
                let granted = self.resolve(option, forum_id);
                self.lookup_cache.insert(key, granted);
                granted
            }
        };

        negated ^ granted
    }

    /// Whether at least one of `privileges` holds in `forum_id`
    pub fn has_privileges<I, S>(&mut self, privileges: I, forum_id: u32) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        privileges
            .into_iter()
            .fold(false, |granted, privilege| self.has_privilege(privilege.as_ref(), forum_id) | granted)
    }

    fn resolve(&self, option: &str, forum_id: u32) -> bool {
        let mut granted = false;

        if let (Some(index), Some(global_row)) = (self.options.global_index(option), self.permissions.get(GLOBAL_FORUM_ID)) {
            if let Some(bit) = global_row.get(index) {
                granted = bit;
            }
        }

        if forum_id != GLOBAL_FORUM_ID {
            if let Some(index) = self.options.local_index(option) {
                let bit = match self.permissions.get(forum_id) {
                    Some(row) => row.get(index),
                    None => ForumBits::zeroed(CHUNK_BITS).get(index),
                };
                if let Some(bit) = bit {
                    granted |= bit;
                }
            }
        }

        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pack bits (index 0 first) into one base-36 chunk
    fn chunk(set_bits: &[usize]) -> String {
        let value = set_bits.iter().fold(0u64, |acc, bit| acc | 1 << (CHUNK_BITS - 1 - bit));
        let mut digits = Vec::new();
        let mut rest = value;
        while rest > 0 {
            digits.push(std::char::from_digit((rest % 36) as u32, 36).unwrap());
            rest /= 36;
        }
        let encoded: String = digits.iter().rev().collect();
        format!("{encoded:0>6}")
    }

    fn catalog() -> Vec<AclOptionRecord> {
        vec![
            AclOptionRecord::global("m_edit"),
            AclOptionRecord::global("m_delete"),
            AclOptionRecord::new("m_lock", true, true),
            AclOptionRecord::local("f_read"),
            AclOptionRecord::local("f_post"),
        ]
    }

    #[test]
    fn test_global_scenario() {
        let mut acl = UserAcl::new(&catalog()[..2], &chunk(&[0])).unwrap();
        assert!(acl.has_privilege("m_edit", 0));
        assert!(!acl.has_privilege("m_delete", 0));
        assert!(!acl.has_privilege("!m_edit", 0));
        assert!(acl.has_privilege("!m_delete", 0));
    }

    #[test]
    fn test_local_bits_only_apply_to_their_forum() {
        // local indices: m_lock 0, f_read 1, f_post 2
        let raw = format!("{}\n{}\n{}", chunk(&[]), chunk(&[1]), chunk(&[1, 2]));
        let mut acl = UserAcl::new(&catalog(), &raw).unwrap();

        assert!(acl.has_privilege("f_read", 1));
        assert!(!acl.has_privilege("f_post", 1));
        assert!(acl.has_privilege("f_post", 2));
        assert!(!acl.has_privilege("f_read", 0));
        assert!(!acl.has_privilege("f_read", 3));
    }

    #[test]
    fn test_local_never_revokes_global() {
        // global indices: m_edit 0, m_delete 1, m_lock 2
        let raw = format!("{}\n{}", chunk(&[2]), chunk(&[]));
        let mut acl = UserAcl::new(&catalog(), &raw).unwrap();

        assert!(acl.has_privilege("m_lock", 0));
        assert!(acl.has_privilege("m_lock", 1));
        assert!(acl.has_privilege("m_lock", 42));
    }

    #[test]
    fn test_local_grant_without_global() {
        let raw = format!("{}\n{}", chunk(&[]), chunk(&[0]));
        let mut acl = UserAcl::new(&catalog(), &raw).unwrap();

        assert!(!acl.has_privilege("m_lock", 0));
        assert!(acl.has_privilege("m_lock", 1));
    }

    #[test]
    fn test_unknown_option_is_false() {
        let mut acl = UserAcl::new(&catalog(), &chunk(&[0, 1, 2])).unwrap();
        assert!(!acl.has_privilege("a_unknown", 0));
        assert!(acl.has_privilege("!a_unknown", 0));
        assert!(!acl.has_privilege("a_unknown", 5));
    }

    #[test]
    fn test_missing_global_row() {
        let raw = format!("\n{}", chunk(&[0]));
        let mut acl = UserAcl::new(&catalog(), &raw).unwrap();
        assert!(!acl.has_privilege("m_edit", 0));
        assert!(acl.has_privilege("m_lock", 1));
    }

    #[test]
    fn test_index_past_row_end_reads_unset() {
        let records: Vec<_> = (0..40).map(|i| AclOptionRecord::global(format!("opt_{i}"))).collect();
        let mut acl = UserAcl::new(&records, &chunk(&[0, 30])).unwrap();

        assert!(acl.has_privilege("opt_0", 0));
        assert!(acl.has_privilege("opt_30", 0));
        assert!(!acl.has_privilege("opt_31", 0));
        assert!(acl.has_privilege("!opt_39", 0));
    }

    #[test]
    fn test_negation_reuses_cached_base_value() {
        let mut acl = UserAcl::new(&catalog(), &chunk(&[0])).unwrap();

        assert!(acl.has_privilege("m_edit", 0));
        assert_eq!(acl.cached_lookups(), 1);
        assert!(!acl.has_privilege("!m_edit", 0));
        assert_eq!(acl.cached_lookups(), 1);
        assert!(acl.has_privilege("m_edit", 0));
    }

    #[test]
    fn test_cache_is_per_forum() {
        let raw = format!("{}\n{}", chunk(&[]), chunk(&[1]));
        let mut acl = UserAcl::new(&catalog(), &raw).unwrap();

        assert!(!acl.has_privilege("f_read", 0));
        assert!(acl.has_privilege("f_read", 1));
        assert_eq!(acl.cached_lookups(), 2);
    }

    #[test]
    fn test_has_privileges_is_any() {
        let mut acl = UserAcl::new(&catalog(), &chunk(&[1])).unwrap();

        assert!(acl.has_privileges(["m_edit", "m_delete"], 0));
        assert!(!acl.has_privileges(["m_edit", "m_lock"], 0));
        assert!(acl.has_privileges(["m_delete", "!m_delete"], 0));
        assert!(!acl.has_privileges(Vec::<String>::new(), 0));
        // every option is evaluated and memoized
        assert_eq!(acl.cached_lookups(), 3);
    }

    #[test]
    fn test_anonymous_acl() {
        let mut acl = UserAcl::anonymous(OptionIndexTable::from_records(&catalog()));
        assert!(!acl.has_privilege("m_edit", 0));
        assert!(!acl.has_privilege("f_read", 3));
        assert!(acl.has_privilege("!f_read", 3));
    }

    #[test]
    fn test_decode_error_surfaces() {
        assert!(UserAcl::new(&catalog(), "00 001").is_err());
    }
}
