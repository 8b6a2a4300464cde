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

//! Storage drivers supplying the raw ACL inputs

use crate::config::{Driver, StoreConfig};
use crate::error::{StoreError, StoreResult};
use phpbb_acl_core::AclOptionRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// User row as stored by the board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: u32,

    #[serde(default)]
    pub username: String,

    /// Default group of the user
    #[serde(default)]
    pub group_id: u32,

    /// Packed permission blob, see `phpbb_acl_core::permissions`
    #[serde(default)]
    pub user_permissions: String,

    /// Any further columns of the row
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl UserRecord {
    pub fn new(user_id: u32, username: impl Into<String>, user_permissions: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            user_permissions: user_permissions.into(),
            ..Self::default()
        }
    }
}

/// Board group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group_id: u32,
    pub group_name: String,
}

/// One `user_group` row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: u32,
    pub group_id: u32,
}

/// Source of the option catalog, user rows and group memberships
#[cfg_attr(test, mockall::automock)]
pub trait AclBackend: Send + Sync {
    /// Catalog rows in storage order, starting at `skip`; `None` means no limit
    fn fetch_acl_options(&self, skip: usize, limit: Option<usize>) -> StoreResult<Vec<AclOptionRecord>>;

    /// User row by id
    fn get_user(&self, user_id: u32) -> StoreResult<Option<UserRecord>>;

    /// Whether `user_id` belongs to group `group_id`
    fn has_membership(&self, user_id: u32, group_id: u32) -> StoreResult<bool>;

    /// Whether `user_id` belongs to the group named `group_name`
    fn has_membership_resolve(&self, user_id: u32, group_name: &str) -> StoreResult<bool>;
}

/// Fetch the whole catalog page by page, preserving storage order
pub fn fetch_all_acl_options(backend: &dyn AclBackend, page_size: usize) -> StoreResult<Vec<AclOptionRecord>> {
    if page_size == 0 {
        return backend.fetch_acl_options(0, None);
    }

    let mut records = Vec::new();
    loop {
        let page = backend.fetch_acl_options(records.len(), Some(page_size))?;
        let page_len = page.len();
        records.extend(page);
        debug!("Fetched ACL option page: {} rows, {} total", page_len, records.len());

        if page_len < page_size {
            break;
        }
    }
    Ok(records)
}

/// Records held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    acl_options: Vec<AclOptionRecord>,
    users: HashMap<u32, UserRecord>,
    groups: HashMap<String, u32>,
    memberships: HashSet<Membership>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, record: AclOptionRecord) -> Self {
        self.acl_options.push(record);
        self
    }

    pub fn with_options(mut self, records: impl IntoIterator<Item = AclOptionRecord>) -> Self {
        self.acl_options.extend(records);
        self
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.insert(user.user_id, user);
        self
    }

    pub fn with_group(mut self, group: GroupRecord) -> Self {
        self.groups.insert(group.group_name, group.group_id);
        self
    }

    pub fn with_membership(mut self, user_id: u32, group_id: u32) -> Self {
        self.memberships.insert(Membership { user_id, group_id });
        self
    }
}

impl AclBackend for InMemoryBackend {
    fn fetch_acl_options(&self, skip: usize, limit: Option<usize>) -> StoreResult<Vec<AclOptionRecord>> {
        let rows = self.acl_options.iter().skip(skip);
        Ok(match limit {
            Some(limit) => rows.take(limit).cloned().collect(),
            None => rows.cloned().collect(),
        })
    }

    fn get_user(&self, user_id: u32) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.get(&user_id).cloned())
    }

    fn has_membership(&self, user_id: u32, group_id: u32) -> StoreResult<bool> {
        Ok(self.memberships.contains(&Membership { user_id, group_id }))
    }

    fn has_membership_resolve(&self, user_id: u32, group_name: &str) -> StoreResult<bool> {
        match self.groups.get(group_name) {
            Some(group_id) => self.has_membership(user_id, *group_id),
            None => Ok(false),
        }
    }
}

/// On-disk layout read by `JsonFileBackend`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardData {
    #[serde(default)]
    pub acl_options: Vec<AclOptionRecord>,

    #[serde(default)]
    pub users: Vec<UserRecord>,

    #[serde(default)]
    pub groups: Vec<GroupRecord>,

    #[serde(default)]
    pub memberships: Vec<Membership>,
}

/// Records loaded once from a JSON data file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    inner: InMemoryBackend,
}

impl JsonFileBackend {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let data: BoardData = serde_json::from_str(&content)?;
        info!(
            "Loaded board data from {}: {} ACL options, {} users, {} groups",
            path.display(),
            data.acl_options.len(),
            data.users.len(),
            data.groups.len()
        );
        Ok(Self::from(data))
    }
}

impl From<BoardData> for JsonFileBackend {
    fn from(data: BoardData) -> Self {
        let inner = data.users.into_iter().fold(InMemoryBackend::new().with_options(data.acl_options), InMemoryBackend::with_user);
        let inner = data.groups.into_iter().fold(inner, InMemoryBackend::with_group);
        let inner = data
            .memberships
            .into_iter()
            .fold(inner, |backend, membership| backend.with_membership(membership.user_id, membership.group_id));
        Self { inner }
    }
}

impl AclBackend for JsonFileBackend {
    fn fetch_acl_options(&self, skip: usize, limit: Option<usize>) -> StoreResult<Vec<AclOptionRecord>> {
        self.inner.fetch_acl_options(skip, limit)
    }

    fn get_user(&self, user_id: u32) -> StoreResult<Option<UserRecord>> {
        self.inner.get_user(user_id)
    }

    fn has_membership(&self, user_id: u32, group_id: u32) -> StoreResult<bool> {
        self.inner.has_membership(user_id, group_id)
    }

    fn has_membership_resolve(&self, user_id: u32, group_name: &str) -> StoreResult<bool> {
        self.inner.has_membership_resolve(user_id, group_name)
    }
}

/// Instantiate the driver selected by `config`
pub fn create_backend(config: &StoreConfig) -> StoreResult<Box<dyn AclBackend>> {
    match config.driver {
        Driver::Memory => Ok(Box::new(InMemoryBackend::new())),
        Driver::Json => {
            let path = config.data_file.as_ref().ok_or(StoreError::MissingConfig("data_file"))?;
            Ok(Box::new(JsonFileBackend::open(path)?))
        }
    }
}
