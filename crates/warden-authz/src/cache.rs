//! Decision cache for user authorization.
//!
//! Memoizes the final boolean of `is_user_authorized` per
//! (tenant, user, resource, action). Only user results are cached.
//!
//! Invalidation is coarse (whole tenant), per user, or per entry. A single
//! monotonic clock orders lookups against invalidations: a lookup that
//! misses hands out a [`CacheTicket`], and [`AuthorizationCache::store`]
//! refuses the result if an invalidation covering the key happened after
//! the ticket was issued. A computation that raced with a write therefore
//! never resurrects a stale decision, and no lock is held across it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use warden_core::TenantId;

/// Cache sizing and switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// When false, lookups always miss and writes are ignored.
    pub enabled: bool,
    /// Maximum number of cached decisions.
    pub max_entries: usize,
    /// Lifetime of a decision; `None` keeps it until invalidated or evicted.
    pub ttl: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: None,
        }
    }
}

impl CacheSettings {
    /// A cache that never holds anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Proof of when a lookup missed; passed back to [`AuthorizationCache::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheTicket(u64);

/// Result of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// A cached decision.
    Hit(bool),
    /// No usable decision.
    Miss(CacheTicket),
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub size: usize,
    /// Number of entries dropped for capacity or age.
    pub evictions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    tenant: TenantId,
    user: String,
    resource: String,
    action: String,
}

impl CacheKey {
    fn new(tenant: TenantId, user: &str, resource: &str, action: &str) -> Self {
        Self {
            tenant,
            user: user.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    allowed: bool,
    created_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.created_at.elapsed() > ttl)
    }
}

/// Tenant-scoped memo of user authorization results.
///
/// Constructed explicitly and shared by handle; several managers may share
/// one cache as long as they serve different tenants.
///
/// # Example
///
/// ```
/// use warden_authz::{AuthorizationCache, CacheLookup, CacheSettings};
/// use warden_core::TenantId;
///
/// let cache = AuthorizationCache::new("default", CacheSettings::default());
/// let tenant = TenantId::SUPER;
///
/// let CacheLookup::Miss(ticket) = cache.lookup(tenant, "alice", "/a", "read") else {
///     unreachable!();
/// };
/// assert!(cache.store(tenant, "alice", "/a", "read", true, ticket));
/// assert_eq!(cache.lookup(tenant, "alice", "/a", "read"), CacheLookup::Hit(true));
///
/// cache.invalidate_tenant(tenant);
/// assert!(matches!(cache.lookup(tenant, "alice", "/a", "read"), CacheLookup::Miss(_)));
/// ```
#[derive(Debug)]
pub struct AuthorizationCache {
    identifier: String,
    settings: CacheSettings,
    entries: DashMap<CacheKey, CacheEntry>,
    /// Last tenant-wide invalidation, per tenant.
    tenant_marks: DashMap<TenantId, u64>,
    /// Last invalidation of all of a user's entries.
    user_marks: DashMap<(TenantId, String), u64>,
    /// Last invalidation of a single entry.
    tombstones: DashMap<CacheKey, u64>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl AuthorizationCache {
    /// Creates a cache registered under `identifier`.
    pub fn new(identifier: impl Into<String>, settings: CacheSettings) -> Self {
        Self {
            identifier: identifier.into(),
            settings,
            entries: DashMap::new(),
            tenant_marks: DashMap::new(),
            user_marks: DashMap::new(),
            tombstones: DashMap::new(),
            clock: AtomicU64::new(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Identifier the cache was created with.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns true unless the cache was created disabled.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Issues a ticket for a computation that starts now.
    ///
    /// Any invalidation after this call makes a store with the ticket fail.
    pub fn ticket(&self) -> CacheTicket {
        CacheTicket(self.clock.load(Ordering::SeqCst))
    }

    /// Looks up a cached decision.
    pub fn lookup(
        &self,
        tenant: TenantId,
        user: &str,
        resource: &str,
        action: &str,
    ) -> CacheLookup {
        let ticket = CacheTicket(self.clock.load(Ordering::SeqCst));
        if !self.settings.enabled {
            return CacheLookup::Miss(ticket);
        }

        let key = CacheKey::new(tenant, user, resource, action);
        let cached = self.entries.get(&key).map(|entry| *entry);
        match cached {
            Some(entry) if !entry.is_expired(self.settings.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Hit(entry.allowed)
            }
            Some(_) => {
                if self
                    .entries
                    .remove_if(&key, |_, entry| entry.is_expired(self.settings.ttl))
                    .is_some()
                {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss(ticket)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss(ticket)
            }
        }
    }

    /// Caches a decision computed after a miss.
    ///
    /// Returns false, storing nothing, if the cache is disabled or an
    /// invalidation covering the key happened after `ticket` was issued.
    pub fn store(
        &self,
        tenant: TenantId,
        user: &str,
        resource: &str,
        action: &str,
        allowed: bool,
        ticket: CacheTicket,
    ) -> bool {
        if !self.settings.enabled || self.settings.max_entries == 0 {
            return false;
        }

        let key = CacheKey::new(tenant, user, resource, action);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.settings.max_entries {
            self.make_room();
        }

        // The staleness check runs under the entry's shard lock. An
        // invalidation publishes its mark before sweeping the shards, so
        // either this insert sees the mark or the sweep removes the entry.
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if self.is_stale(occupied.key(), ticket) {
                    return false;
                }
                occupied.insert(CacheEntry {
                    allowed,
                    created_at: Instant::now(),
                });
            }
            Entry::Vacant(vacant) => {
                if self.is_stale(vacant.key(), ticket) {
                    return false;
                }
                vacant.insert(CacheEntry {
                    allowed,
                    created_at: Instant::now(),
                });
            }
        }
        true
    }

    fn is_stale(&self, key: &CacheKey, ticket: CacheTicket) -> bool {
        let newer = |mark: Option<u64>| mark.is_some_and(|mark| mark > ticket.0);
        newer(self.tenant_marks.get(&key.tenant).map(|m| *m))
            || newer(
                self.user_marks
                    .get(&(key.tenant, key.user.clone()))
                    .map(|m| *m),
            )
            || newer(self.tombstones.get(key).map(|m| *m))
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Drops every entry of `tenant`.
    pub fn invalidate_tenant(&self, tenant: TenantId) {
        if !self.settings.enabled {
            return;
        }
        let epoch = self.tick();
        self.tenant_marks.insert(tenant, epoch);
        // Finer marks of the tenant are covered by the new tenant mark.
        self.user_marks.retain(|(t, _), _| *t != tenant);
        self.tombstones.retain(|key, _| key.tenant != tenant);
        self.entries.retain(|key, _| key.tenant != tenant);
        debug!(cache = %self.identifier, tenant = %tenant, "invalidated tenant");
    }

    /// Drops every entry of one user.
    pub fn invalidate_user(&self, tenant: TenantId, user: &str) {
        if !self.settings.enabled {
            return;
        }
        let epoch = self.tick();
        self.user_marks.insert((tenant, user.to_string()), epoch);
        self.entries
            .retain(|key, _| !(key.tenant == tenant && key.user == user));
        self.compact_marks();
        debug!(cache = %self.identifier, tenant = %tenant, user, "invalidated user");
    }

    /// Drops a single entry.
    pub fn invalidate_entry(&self, tenant: TenantId, user: &str, resource: &str, action: &str) {
        if !self.settings.enabled {
            return;
        }
        let key = CacheKey::new(tenant, user, resource, action);
        let epoch = self.tick();
        self.tombstones.insert(key.clone(), epoch);
        self.entries.remove(&key);
        self.compact_marks();
    }

    /// Drops everything.
    pub fn clear(&self) {
        let epoch = self.tick();
        let tenants: Vec<TenantId> = self.entries.iter().map(|e| e.key().tenant).collect();
        for tenant in tenants {
            self.tenant_marks.insert(tenant, epoch);
        }
        let marked: Vec<TenantId> = self.tenant_marks.iter().map(|m| *m.key()).collect();
        for tenant in marked {
            self.tenant_marks.insert(tenant, epoch);
        }
        self.user_marks.clear();
        self.tombstones.clear();
        self.entries.clear();
    }

    /// Returns a statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Number of cached decisions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&self) {
        let before = self.entries.len();
        let ttl = self.settings.ttl;
        if ttl.is_some() {
            self.entries.retain(|_, entry| !entry.is_expired(ttl));
        }
        let mut evicted = before.saturating_sub(self.entries.len());

        while self.entries.len() >= self.settings.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().created_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    if self.entries.remove(&key).is_some() {
                        evicted += 1;
                    }
                }
                None => break,
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    // Fine-grained marks are folded into tenant marks once they outnumber
    // the entry budget. A tenant mark only ever rejects more stores.
    fn compact_marks(&self) {
        let limit = self.settings.max_entries.max(1);
        if self.user_marks.len() + self.tombstones.len() <= limit {
            return;
        }
        let epoch = self.tick();
        let mut tenants: Vec<TenantId> = self.user_marks.iter().map(|m| m.key().0).collect();
        tenants.extend(self.tombstones.iter().map(|m| m.key().tenant));
        tenants.sort_unstable();
        tenants.dedup();
        for tenant in tenants {
            self.tenant_marks.insert(tenant, epoch);
        }
        self.user_marks.clear();
        self.tombstones.clear();
    }
}
