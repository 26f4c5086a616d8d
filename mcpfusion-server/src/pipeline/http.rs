//! Request Pipeline: binds invocation arguments, assembles the
//! upstream HTTP request, injects credentials, dispatches through retry and
//! a per-host circuit breaker, walks pagination, shapes the response and
//! writes through the endpoint's response cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value as JsonValue};

use mcpfusion_auth::AuthManager;
use mcpfusion_caching::{CachedResponse, ResponseCache, ResponseCacheKey};
use mcpfusion_config::binding::{bind, BoundParameter};
use mcpfusion_config::domains::service::{EndpointConfig, ParameterLocation, ResponseDefaults, ServiceConfig};
use mcpfusion_config::PaginationConfig;
use mcpfusion_core::{CoreError, HttpMethod};
use mcpfusion_http::client::HttpTransport;
use mcpfusion_resilience::retry::{RetryError, RetryExecutor, RetryPolicy};

use crate::circuit::{host_of, HostCircuitRegistry};

/// The shared resources a request-pipeline dispatch needs, composed once at
/// startup and handed to every tool call.
pub struct HttpPipeline {
    pub transport: Arc<HttpTransport>,
    pub circuits: Arc<HostCircuitRegistry>,
    pub auth: Arc<AuthManager>,
    pub cache: Arc<ResponseCache>,
    pub retry: RetryExecutor,
}

impl HttpPipeline {
    pub fn new(
        transport: Arc<HttpTransport>,
        circuits: Arc<HostCircuitRegistry>,
        auth: Arc<AuthManager>,
        cache: Arc<ResponseCache>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            circuits,
            auth,
            cache,
            retry: RetryExecutor::new(retry_policy),
        }
    }

    pub async fn dispatch(
        &self,
        service_key: &str,
        service: &ServiceConfig,
        endpoint: &EndpointConfig,
        tenant: &str,
        invocation: &JsonValue,
    ) -> Result<JsonValue, CoreError> {
        let cache_key = endpoint
            .caching
            .as_ref()
            .map(|_| ResponseCacheKey::new(tenant, endpoint.id.clone(), invocation));

        if let Some(key) = &cache_key {
            if let Ok(Some(hit)) = self.cache.get(key).await {
                return Ok(cached_to_json(&hit, endpoint.response.as_ref().or(service.response_defaults.as_ref())));
            }
        }

        let args = invocation_map(invocation);
        let bound = bind(&endpoint.parameters, &args, Utc::now())?;

        let base_url = endpoint.base_url.as_deref().unwrap_or(&service.base_url);
        let mut headers = service.default_headers.clone();
        let mut query = HashMap::new();
        let mut path_params = HashMap::new();
        let mut body_fields = Vec::new();

        for param in &bound {
            match param.location {
                ParameterLocation::Path => {
                    path_params.insert(param.upstream_name.clone(), value_to_string(&param.value));
                }
                ParameterLocation::Query => {
                    query.insert(param.upstream_name.clone(), value_to_string(&param.value));
                }
                ParameterLocation::Header => {
                    headers.insert(param.upstream_name.clone(), value_to_string(&param.value));
                }
                ParameterLocation::Body => body_fields.push(param),
                _ => {}
            }
        }

        let url_path = build_url(base_url, &endpoint.path, &path_params);
        let body = build_body(endpoint, &body_fields)?;

        let auth_config = endpoint.auth.as_ref().or(service.auth.as_ref());
        if let Some(auth_config) = auth_config {
            let request_auth = self.auth.authenticate_with_refresh(tenant, service_key, auth_config).await?;
            headers.extend(request_auth.headers);
            query.extend(request_auth.query);
        }

        let url = with_query(&url_path, &query)?;
        let overrides = endpoint.connection.clone();
        let method = endpoint.method;

        let response = self
            .execute_with_resilience(method, &url, &headers, body.as_ref(), &overrides)
            .await?;

        let response = self.paginate(endpoint, method, &url, &headers, &overrides, response).await?;

        if let Some(key) = cache_key {
            let ttl = endpoint.caching.as_ref().map(|c| std::time::Duration::from_secs(c.ttl_seconds));
            let cached = CachedResponse::new(response.status, response.headers.clone().into_iter().collect(), response.body.clone());
            let _ = self.cache.put(key, cached, ttl).await;
        }

        Ok(shape(response.body, endpoint.response.as_ref().or(service.response_defaults.as_ref())))
    }

    async fn execute_with_resilience(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&JsonValue>,
        overrides: &mcpfusion_config::ConnectionOverrides,
    ) -> Result<mcpfusion_http::HttpResponse, CoreError> {
        let host = host_of(url);
        let breaker = self.circuits.breaker_for(&host);
        if breaker.is_open() {
            return Err(CoreError::CircuitOpen { host });
        }

        let transport = &self.transport;
        let result = self
            .retry
            .execute(|| async { transport.execute(method, url, headers, body, overrides).await.map_err(CoreError::from) })
            .await;

        match result {
            Ok(response) => {
                breaker.record_success();
                Ok(response)
            }
            Err(RetryError::MaxAttemptsExceeded { last_error, .. }) => {
                breaker.record_failure();
                Err(last_error)
            }
            Err(RetryError::NonRetryableError(error)) => {
                breaker.record_failure();
                Err(error)
            }
            Err(RetryError::CircuitBreakerOpen) => Err(CoreError::CircuitOpen { host }),
        }
    }

    async fn paginate(
        &self,
        endpoint: &EndpointConfig,
        method: HttpMethod,
        first_url: &str,
        headers: &HashMap<String, String>,
        overrides: &mcpfusion_config::ConnectionOverrides,
        first: mcpfusion_http::HttpResponse,
    ) -> Result<mcpfusion_http::HttpResponse, CoreError> {
        let Some(pagination) = &endpoint.pagination else {
            return Ok(first);
        };

        let mut pages = vec![first.body.clone()];
        let mut current = first;
        let mut next_url = current_next_url(pagination, first_url, &current.body);
        let mut page = 1;

        while page < pagination.max_pages() {
            let Some(url) = next_url else { break };
            current = self.execute_with_resilience(method, &url, headers, None, overrides).await?;
            pages.push(current.body.clone());
            page += 1;
            next_url = current_next_url(pagination, &url, &current.body);
        }

        Ok(mcpfusion_http::HttpResponse {
            status: current.status,
            headers: current.headers,
            body: merge_pages(pages),
        })
    }
}

fn merge_pages(pages: Vec<JsonValue>) -> JsonValue {
    if pages.len() == 1 {
        return pages.into_iter().next().unwrap();
    }
    if pages.iter().all(|p| p.is_array()) {
        let flattened: Vec<JsonValue> = pages
            .into_iter()
            .flat_map(|p| p.as_array().cloned().unwrap_or_default())
            .collect();
        return JsonValue::Array(flattened);
    }
    JsonValue::Array(pages)
}

fn current_next_url(pagination: &PaginationConfig, previous_url: &str, body: &JsonValue) -> Option<String> {
    match pagination {
        PaginationConfig::NextLink { field, .. } => body.get(field).and_then(JsonValue::as_str).map(str::to_string),
        PaginationConfig::Offset {
            param,
            size_param,
            page_size,
            ..
        } => {
            let mut url = url::Url::parse(previous_url).ok()?;
            let current_offset: u32 = url
                .query_pairs()
                .find(|(k, _)| k == param.as_str())
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0);
            let next_offset = current_offset + page_size;
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != param.as_str() && k != size_param.as_str())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            pairs.push((param.clone(), next_offset.to_string()));
            pairs.push((size_param.clone(), page_size.to_string()));
            url.query_pairs_mut().clear().extend_pairs(&pairs);
            Some(url.to_string())
        }
        PaginationConfig::Cursor {
            cursor_param,
            cursor_field,
            ..
        } => {
            let cursor = body.get(cursor_field).and_then(JsonValue::as_str)?;
            if cursor.is_empty() {
                return None;
            }
            let mut url = url::Url::parse(previous_url).ok()?;
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != cursor_param.as_str())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            pairs.push((cursor_param.clone(), cursor.to_string()));
            url.query_pairs_mut().clear().extend_pairs(&pairs);
            Some(url.to_string())
        }
    }
}

fn shape(body: JsonValue, defaults: Option<&ResponseDefaults>) -> JsonValue {
    let Some(defaults) = defaults else { return body };

    let selected = match &defaults.select {
        Some(path) => select_path(&body, path).unwrap_or(JsonValue::Null),
        None => body,
    };

    if defaults.rename.is_empty() {
        return selected;
    }

    rename_keys(selected, &defaults.rename)
}

fn select_path(value: &JsonValue, path: &str) -> Option<JsonValue> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current.clone())
}

fn rename_keys(value: JsonValue, rename: &HashMap<String, String>) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut renamed = Map::new();
            for (key, v) in map {
                let key = rename.get(&key).cloned().unwrap_or(key);
                renamed.insert(key, v);
            }
            JsonValue::Object(renamed)
        }
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(|item| rename_keys(item, rename)).collect()),
        other => other,
    }
}

fn cached_to_json(cached: &CachedResponse, defaults: Option<&ResponseDefaults>) -> JsonValue {
    shape(cached.body.clone(), defaults)
}

fn invocation_map(invocation: &JsonValue) -> HashMap<String, JsonValue> {
    invocation
        .as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn percent_encode_path_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(*byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn build_url(base_url: &str, path_template: &str, path_params: &HashMap<String, String>) -> String {
    let mut path = path_template.to_string();
    for (name, value) in path_params {
        path = path.replace(&format!("{{{name}}}"), &percent_encode_path_segment(value));
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn with_query(url_str: &str, query: &HashMap<String, String>) -> Result<String, CoreError> {
    let mut url = url::Url::parse(url_str).map_err(|e| CoreError::Configuration(format!("invalid endpoint url: {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

fn build_body(endpoint: &EndpointConfig, body_params: &[&BoundParameter]) -> Result<Option<JsonValue>, CoreError> {
    if body_params.is_empty() {
        return Ok(endpoint.body_template.clone());
    }

    let mut object = match endpoint.body_template.clone() {
        Some(JsonValue::Object(map)) => map,
        Some(_) => {
            return Err(CoreError::Configuration(format!(
                "endpoint '{}' declares body parameters but its body_template is not an object",
                endpoint.id
            )))
        }
        None => Map::new(),
    };
    for param in body_params {
        object.insert(param.upstream_name.clone(), param.value.clone());
    }
    Ok(Some(JsonValue::Object(object)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_params_are_substituted_and_percent_encoded() {
        let mut params = HashMap::new();
        params.insert("owner".to_string(), "acme corp".to_string());
        let url = build_url("https://api.example.com", "/repos/{owner}/issues", &params);
        assert_eq!(url, "https://api.example.com/repos/acme%20corp/issues");
    }

    #[test]
    fn query_params_are_appended() {
        let mut query = HashMap::new();
        query.insert("page".to_string(), "2".to_string());
        let url = with_query("https://api.example.com/issues", &query).unwrap();
        assert_eq!(url, "https://api.example.com/issues?page=2");
    }

    #[test]
    fn select_narrows_to_a_nested_field() {
        let body = serde_json::json!({"data": {"items": [1, 2, 3]}});
        let defaults = ResponseDefaults {
            select: Some("data.items".to_string()),
            rename: HashMap::new(),
        };
        assert_eq!(shape(body, Some(&defaults)), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn rename_maps_object_keys() {
        let body = serde_json::json!({"old_name": "value"});
        let mut rename = HashMap::new();
        rename.insert("old_name".to_string(), "new_name".to_string());
        let defaults = ResponseDefaults { select: None, rename };
        assert_eq!(shape(body, Some(&defaults)), serde_json::json!({"new_name": "value"}));
    }

    #[test]
    fn single_page_is_returned_unmerged() {
        let pages = vec![serde_json::json!({"id": 1})];
        assert_eq!(merge_pages(pages), serde_json::json!({"id": 1}));
    }

    #[test]
    fn array_pages_are_flattened() {
        let pages = vec![serde_json::json!([1, 2]), serde_json::json!([3])];
        assert_eq!(merge_pages(pages), serde_json::json!([1, 2, 3]));
    }
}
