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

//! Per-request user session with a lazily decoded ACL

use crate::backend::UserRecord;
use crate::config::ANONYMOUS_USER_ID;
use crate::error::StoreResult;
use crate::service::AclService;
use phpbb_acl_core::UserAcl;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Group reference accepted by `UserSession::is_member`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRef<'a> {
    Id(u32),
    Name(&'a str),
}

impl From<u32> for GroupRef<'_> {
    fn from(group_id: u32) -> Self {
        GroupRef::Id(group_id)
    }
}

impl<'a> From<&'a str> for GroupRef<'a> {
    fn from(group_name: &'a str) -> Self {
        GroupRef::Name(group_name)
    }
}

/// Attribute bag of the current user.
///
/// Keys copied from the user row are read-only: overwriting them never marks
/// the session as modified, so they are never written back. Values added on
/// top of the row are persistable. The ACL is decoded on the first privilege
/// query and kept for the rest of the session.
#[derive(Debug)]
pub struct UserSession {
    values: Map<String, Value>,
    read_only: HashSet<String>,
    modified: bool,
    anonymous_user_id: u32,
    acl: Option<UserAcl>,
}

impl Default for UserSession {
    fn default() -> Self {
        Self {
            values: Map::new(),
            read_only: HashSet::new(),
            modified: false,
            anonymous_user_id: ANONYMOUS_USER_ID,
            acl: None,
        }
    }
}

impl UserSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guest id of the board, when it differs from the stock one
    pub fn with_anonymous_user_id(mut self, anonymous_user_id: u32) -> Self {
        self.anonymous_user_id = anonymous_user_id;
        self
    }

    /// Session seeded from a user row, every column read-only
    pub fn from_user(user: &UserRecord) -> StoreResult<Self> {
        let values = match serde_json::to_value(user)? {
            Value::Object(values) => values,
            _ => Map::new(),
        };

        Ok(Self {
            read_only: values.keys().cloned().collect(),
            values,
            ..Self::default()
        })
    }

    /// Merge previously stored writable values without marking the session modified
    pub fn restore(&mut self, stored: Map<String, Value>) {
        self.values.extend(stored);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let changed = self.values.get(&key) != Some(&value);

        if !self.read_only.contains(&key) {
            self.modified |= changed;
        }
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.modified = true;
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.modified = true;
        self.values.clear();
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_read_only(&self, key: &str) -> bool {
        self.read_only.contains(key)
    }

    /// Values that may be written back to the session store
    pub fn writable_values(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(key, _)| !self.read_only.contains(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn user_id(&self) -> u32 {
        self.values
            .get("user_id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .unwrap_or(self.anonymous_user_id)
    }

    /// Guests and bots share the guest id; ids 0 and 1 are never registered users
    pub fn is_authenticated(&self) -> bool {
        let user_id = self.user_id();
        user_id != self.anonymous_user_id && user_id > ANONYMOUS_USER_ID
    }

    /// Whether the user belongs to `group`, by id or by name.
    ///
    /// The default group stored on the row answers without touching storage.
    pub fn is_member<'a>(&self, service: &AclService, group: impl Into<GroupRef<'a>>) -> StoreResult<bool> {
        let user_id = self.user_id();
        match group.into() {
            GroupRef::Id(group_id) => {
                if self.default_group_id() == Some(group_id) {
                    return Ok(true);
                }
                service.has_membership(user_id, group_id)
            }
            GroupRef::Name(group_name) => service.has_membership_resolve(user_id, group_name),
        }
    }

    fn default_group_id(&self) -> Option<u32> {
        self.values
            .get("group_id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
    }

    /// See `UserAcl::has_privilege`
    pub fn has_privilege(&mut self, service: &AclService, option: &str, forum_id: u32) -> StoreResult<bool> {
        Ok(self.acl(service)?.has_privilege(option, forum_id))
    }

    /// See `UserAcl::has_privileges`
    pub fn has_privileges<I, S>(&mut self, service: &AclService, options: I, forum_id: u32) -> StoreResult<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.acl(service)?.has_privileges(options, forum_id))
    }

    fn acl(&mut self, service: &AclService) -> StoreResult<&mut UserAcl> {
        let acl = match self.acl.take() {
            Some(acl) => acl,
            None => {
                let raw = self.values.get("user_permissions").and_then(Value::as_str).unwrap_or_default();
                service.get_user_acl(raw)?
            }
        };
        Ok(self.acl.insert(acl))
    }
}
