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

//! ACL service: glue between storage and the decoder

use crate::backend::{AclBackend, UserRecord, create_backend, fetch_all_acl_options};
use crate::cache::{CacheStats, TtlCache};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::session::UserSession;
use phpbb_acl_core::{AclOptionRecord, OptionIndexTable, UserAcl};
use std::sync::Arc;
use tracing::{debug, warn};

/// Username given to the synthesized guest record
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// Builds user ACLs from a storage backend.
///
/// One service is shared by the whole application; the `UserAcl` values it
/// hands out belong to a single session each.
pub struct AclService {
    backend: Box<dyn AclBackend>,
    config: StoreConfig,
    acl_options: TtlCache<Arc<Vec<AclOptionRecord>>>,
    anonymous_user: TtlCache<UserRecord>,
}

impl AclService {
    pub fn new(backend: Box<dyn AclBackend>, config: StoreConfig) -> Self {
        Self {
            acl_options: TtlCache::new("ACL options", config.acl_options_cache_ttl()),
            anonymous_user: TtlCache::new("Anonymous user", config.anonymous_cache_ttl()),
            backend,
            config,
        }
    }

    /// Create the service with the driver selected by `config`
    pub fn from_config(config: StoreConfig) -> StoreResult<Self> {
        let backend = create_backend(&config)?;
        Ok(Self::new(backend, config))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The full option catalog, served from cache while fresh
    pub fn acl_options(&self) -> StoreResult<Arc<Vec<AclOptionRecord>>> {
        self.acl_options
            .get_or_try_insert_with(|| fetch_all_acl_options(self.backend.as_ref(), self.config.page_size).map(Arc::new))
    }

    /// Index tables of the current catalog
    pub fn option_index(&self) -> StoreResult<OptionIndexTable> {
        Ok(OptionIndexTable::from_records(&self.acl_options()?))
    }

    /// Drop the cached catalog after the option schema changed
    pub fn invalidate_acl_options(&self) {
        self.acl_options.invalidate();
    }

    pub fn acl_options_cache_stats(&self) -> CacheStats {
        self.acl_options.stats()
    }

    /// Decode a raw permission blob against the current catalog
    pub fn get_user_acl(&self, raw_user_permissions: &str) -> StoreResult<UserAcl> {
        let options = self.acl_options()?;
        let acl = UserAcl::new(&options, raw_user_permissions)?;
        debug!("Built user ACL: {} forum rows, {} distinct chunks", acl.permissions().len(), acl.decoded_chunks());
        Ok(acl)
    }

    /// ACL of `user`, falling back to an empty ACL when its blob is corrupt
    pub fn get_user_acl_or_anonymous(&self, user: &UserRecord) -> StoreResult<UserAcl> {
        match self.get_user_acl(&user.user_permissions) {
            Err(StoreError::Decode(err)) => {
                warn!("Corrupt permission blob for user {}: {}", user.user_id, err);
                Ok(UserAcl::anonymous(self.option_index()?))
            }
            result => result,
        }
    }

    pub fn get_user(&self, user_id: u32) -> StoreResult<Option<UserRecord>> {
        if user_id == self.config.anonymous_user_id {
            return self.anonymous_user().map(Some);
        }
        self.backend.get_user(user_id)
    }

    pub fn has_membership(&self, user_id: u32, group_id: u32) -> StoreResult<bool> {
        self.backend.has_membership(user_id, group_id)
    }

    pub fn has_membership_resolve(&self, user_id: u32, group_name: &str) -> StoreResult<bool> {
        self.backend.has_membership_resolve(user_id, group_name)
    }

    /// Session for `user` that knows this board's guest id
    pub fn open_session(&self, user: &UserRecord) -> StoreResult<UserSession> {
        Ok(UserSession::from_user(user)?.with_anonymous_user_id(self.config.anonymous_user_id))
    }

    /// The guest user record, cached; synthesized when storage has none
    pub fn anonymous_user(&self) -> StoreResult<UserRecord> {
        let anonymous_user_id = self.config.anonymous_user_id;
        self.anonymous_user.get_or_try_insert_with(|| {
            Ok(self
                .backend
                .get_user(anonymous_user_id)?
                .unwrap_or_else(|| UserRecord::new(anonymous_user_id, ANONYMOUS_USERNAME, "")))
        })
    }
}

impl std::fmt::Debug for AclService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclService")
            .field("config", &self.config)
            .field("acl_options", &self.acl_options)
            .finish_non_exhaustive()
    }
}
