//! Query Pipeline: the per-request state machine tying together the gray
//! release check, cache lookup, the external resolver, and Watch Index
//! registration.

use crate::cache::CacheEngine;
use crate::codec::{render_json, render_properties, render_raw, raw_content_type};
use crate::collaborators::{ConfigResolver, GrayRuleHolder, WatchKeyDeriver};
use crate::error::AppError;
use crate::key::{build_cache_key, normalize_namespace, Format};
use crate::watch_index::WatchIndex;
use dashmap::DashMap;
use std::sync::Arc;

/// Which of the three HTTP routes issued this request; determines both the
/// cache-key format component and how the resolved map is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// `/configfiles/{appId}/{clusterName}/{namespace}` — forces properties.
    Plain,
    /// `/configfiles/json/...` — forces JSON regardless of namespace suffix.
    Json,
    /// `/configfiles/raw/...` — renders in the namespace's native format.
    Raw,
}

/// A fully rendered response, ready to hand back to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPayload {
    pub body: String,
    pub content_type: &'static str,
}

/// Inbound request, already stripped of HTTP-specific concerns.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub mode: RequestMode,
    pub app_id: String,
    pub cluster_name: String,
    pub namespace: String,
    pub data_center: String,
    pub client_ip: String,
    pub client_label: String,
}

/// Owns the Cache Engine, Watch Index, and external collaborators, and
/// drives the request state machine described in the module's invariants:
/// Normalize -> GrayCheck-1 -> cache lookup -> (miss) resolve -> render ->
/// GrayCheck-2 -> put + register.
pub struct QueryPipeline {
    cache: CacheEngine,
    watch_index: Arc<WatchIndex>,
    resolver: Arc<dyn ConfigResolver>,
    gray_rules: Arc<dyn GrayRuleHolder>,
    deriver: Arc<dyn WatchKeyDeriver>,
    known_namespaces: DashMap<String, Vec<String>>,
}

impl QueryPipeline {
    pub fn new(
        cache: CacheEngine,
        watch_index: Arc<WatchIndex>,
        resolver: Arc<dyn ConfigResolver>,
        gray_rules: Arc<dyn GrayRuleHolder>,
        deriver: Arc<dyn WatchKeyDeriver>,
    ) -> Self {
        Self {
            cache,
            watch_index,
            resolver,
            gray_rules,
            deriver,
            known_namespaces: DashMap::new(),
        }
    }

    /// Registers the canonical namespace spellings known for `app_id`, used
    /// by namespace normalization. Namespaces not registered here fall back
    /// to their input spelling unchanged.
    pub fn register_known_namespaces(&self, app_id: &str, namespaces: Vec<String>) {
        self.known_namespaces.insert(app_id.to_string(), namespaces);
    }

    fn cache_format(&self, mode: RequestMode, namespace: &str) -> Format {
        match mode {
            RequestMode::Plain => Format::Properties,
            RequestMode::Json => Format::Json,
            RequestMode::Raw => Format::determine(namespace),
        }
    }

    fn render(
        &self,
        mode: RequestMode,
        cache_format: Format,
        configurations: &std::collections::BTreeMap<String, String>,
    ) -> Result<RenderedPayload, AppError> {
        let body = match mode {
            RequestMode::Plain => render_properties(configurations),
            RequestMode::Json => render_json(configurations).map_err(|e| {
                tracing::warn!(error = %e, "failed to render configuration as JSON");
                AppError::RenderError(e.to_string())
            })?,
            RequestMode::Raw => render_raw(cache_format, configurations).map_err(|e| {
                tracing::warn!(error = %e, "failed to render raw configuration");
                AppError::RenderError(e.to_string())
            })?,
        };
        let content_type = match mode {
            RequestMode::Plain => "text/plain;charset=UTF-8",
            RequestMode::Json => "application/json;charset=UTF-8",
            RequestMode::Raw => raw_content_type(cache_format),
        };
        Ok(RenderedPayload { body, content_type })
    }

    /// Calls the resolver for this request's current state and renders the
    /// result; used for both the personalized (GrayCheck-1) path and the
    /// anti-pollution (GrayCheck-2) path, which must each reflect whatever
    /// the resolver returns *now*, not a payload resolved before the gray
    /// rule existed.
    async fn resolve_and_render(
        &self,
        req: &PipelineRequest,
        namespace: &str,
        cache_format: Format,
        cache_key: &str,
    ) -> Result<RenderedPayload, AppError> {
        let resolved = self
            .resolver
            .query_config(
                &req.app_id,
                &req.cluster_name,
                namespace,
                &req.data_center,
                &req.client_ip,
                &req.client_label,
            )
            .await
            .map_err(AppError::ResolverError)?
            .ok_or_else(|| AppError::NotFound(cache_key.to_string()))?;
        self.render(req.mode, cache_format, &resolved.configurations)
    }

    /// Executes the full request state machine.
    pub async fn handle(&self, req: PipelineRequest) -> Result<RenderedPayload, AppError> {
        let known = self
            .known_namespaces
            .get(&req.app_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        let mut lookup = std::collections::HashMap::new();
        lookup.insert(req.app_id.clone(), known);
        let namespace = normalize_namespace(&req.app_id, &req.namespace, &lookup);

        let cache_format = self.cache_format(req.mode, &namespace);
        let cache_key = build_cache_key(
            cache_format,
            &req.app_id,
            &req.cluster_name,
            &namespace,
            &req.data_center,
        );

        let gray_before = self
            .gray_rules
            .has_gray_release_rule(&req.app_id, &req.client_ip, &req.client_label, &namespace)
            .await;

        if gray_before {
            return self
                .resolve_and_render(&req, &namespace, cache_format, &cache_key)
                .await;
        }

        if let Some(cached) = self.cache.get_if_present(&cache_key).await {
            let content_type = match req.mode {
                RequestMode::Plain => "text/plain;charset=UTF-8",
                RequestMode::Json => "application/json;charset=UTF-8",
                RequestMode::Raw => raw_content_type(cache_format),
            };
            return Ok(RenderedPayload {
                body: cached,
                content_type,
            });
        }

        let rendered = self
            .resolve_and_render(&req, &namespace, cache_format, &cache_key)
            .await?;

        let gray_after = self
            .gray_rules
            .has_gray_release_rule(&req.app_id, &req.client_ip, &req.client_label, &namespace)
            .await;

        if gray_after {
            // A rule appeared between the two checks; the payload we just
            // rendered was resolved before the rule existed, so it cannot be
            // trusted as this client's answer. Re-resolve now that the rule
            // is active and serve the freshly personalized result — still
            // without caching it.
            return self
                .resolve_and_render(&req, &namespace, cache_format, &cache_key)
                .await;
        }

        self.cache.put(cache_key.clone(), rendered.body.clone()).await;
        let watch_keys = self
            .deriver
            .assemble_all_watch_keys(&req.app_id, &req.cluster_name, &namespace, &req.data_center)
            .await;
        self.watch_index.register(&cache_key, &watch_keys);

        Ok(rendered)
    }
}
