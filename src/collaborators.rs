//! External collaborator interfaces consumed by the Query Pipeline.
//!
//! These three traits model systems explicitly out of scope for this crate
//! (the resolver's backing database, the gray-release rule store, the
//! release-topic graph); only their call contract is specified here. Each
//! ships with an in-memory implementation suitable for tests and small
//! deployments, bounded by its trait contract rather than by any concrete
//! backing store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};

/// A resolved configuration, as produced by the external config resolver.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub namespace_name: String,
    pub configurations: BTreeMap<String, String>,
    pub release_key: String,
}

/// Produces the effective key/value map for a (app, cluster, namespace,
/// data-center) tuple, optionally personalized for one client.
///
/// `Ok(None)` means the resolver completed and found nothing (surfaced to
/// the client as [`crate::error::AppError::NotFound`]); `Err` means the
/// resolver itself failed (database down, timeout, ...), surfaced as
/// [`crate::error::AppError::ResolverError`] — the two are distinguished so
/// a production resolver backed by a real database can tell its callers
/// apart, per the error-handling design.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn query_config(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        data_center: &str,
        client_ip: &str,
        client_label: &str,
    ) -> Result<Option<ResolvedConfig>, String>;
}

/// Answers whether a client currently has a gray-release override for a
/// namespace.
#[async_trait]
pub trait GrayRuleHolder: Send + Sync {
    async fn has_gray_release_rule(
        &self,
        app_id: &str,
        client_ip: &str,
        client_label: &str,
        namespace: &str,
    ) -> bool;
}

/// Enumerates the watch keys (release topics) that must invalidate any
/// payload derived from a given (app, cluster, namespace, data-center)
/// tuple.
#[async_trait]
pub trait WatchKeyDeriver: Send + Sync {
    async fn assemble_all_watch_keys(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        data_center: &str,
    ) -> HashSet<String>;
}

/// Default watch-key deriver: one watch key per (app, cluster, namespace),
/// matching the cache-key delimiter convention so invalidation messages can
/// name a watch key directly.
pub struct DefaultWatchKeyDeriver;

#[async_trait]
impl WatchKeyDeriver for DefaultWatchKeyDeriver {
    async fn assemble_all_watch_keys(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        _data_center: &str,
    ) -> HashSet<String> {
        let mut keys = HashSet::new();
        keys.insert(format!("{app_id}+{cluster_name}+{namespace}"));
        keys
    }
}

/// In-memory config resolver, keyed by (app, cluster, namespace,
/// data-center); intended for tests and standalone deployments with no
/// external database.
#[derive(Default)]
pub struct InMemoryResolver {
    entries: DashMap<String, BTreeMap<String, String>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(app_id: &str, cluster_name: &str, namespace: &str, data_center: &str) -> String {
        format!("{app_id}|{cluster_name}|{namespace}|{data_center}")
    }

    /// Seeds (or replaces) the configuration served for a tuple.
    pub fn seed(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        data_center: &str,
        configurations: BTreeMap<String, String>,
    ) {
        self.entries.insert(
            Self::key(app_id, cluster_name, namespace, data_center),
            configurations,
        );
    }
}

#[async_trait]
impl ConfigResolver for InMemoryResolver {
    async fn query_config(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        data_center: &str,
        _client_ip: &str,
        _client_label: &str,
    ) -> Result<Option<ResolvedConfig>, String> {
        Ok(self
            .entries
            .get(&Self::key(app_id, cluster_name, namespace, data_center))
            .map(|configurations| ResolvedConfig {
                namespace_name: namespace.to_string(),
                configurations: configurations.clone(),
                release_key: "-1".to_string(),
            }))
    }
}

/// In-memory gray-rule holder. Rules are keyed by (app, namespace, client
/// IP); a rule with an empty IP matches any client carrying the given
/// label instead.
#[derive(Default)]
pub struct InMemoryGrayRules {
    rules: DashMap<String, HashSet<String>>,
}

impl InMemoryGrayRules {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(app_id: &str, namespace: &str) -> String {
        format!("{app_id}|{namespace}")
    }

    /// Registers a gray rule matching `client_ip` for (app, namespace).
    pub fn add_rule(&self, app_id: &str, namespace: &str, client_ip: &str) {
        self.rules
            .entry(Self::key(app_id, namespace))
            .or_default()
            .insert(client_ip.to_string());
    }

    /// Removes a previously added rule, if any.
    pub fn remove_rule(&self, app_id: &str, namespace: &str, client_ip: &str) {
        if let Some(mut set) = self.rules.get_mut(&Self::key(app_id, namespace)) {
            set.remove(client_ip);
        }
    }
}

#[async_trait]
impl GrayRuleHolder for InMemoryGrayRules {
    async fn has_gray_release_rule(
        &self,
        app_id: &str,
        client_ip: &str,
        _client_label: &str,
        namespace: &str,
    ) -> bool {
        self.rules
            .get(&Self::key(app_id, namespace))
            .map(|set| set.contains(client_ip))
            .unwrap_or(false)
    }
}
