//! Request engine module
//!
//! One engine serves both entry points: the development middleware (where
//! non-API requests are handed back to the host server) and the standalone
//! production runtime (where they fall through to static serving). The mode
//! flag selects the handler-loading strategy and route-table refresh policy.
//!
//! Per request, in fixed order: CORS/preflight, timeout arming, resolution,
//! path guard, body decoding, handler invocation, finalization. Every failure
//! is converted to a JSON error body at this boundary; nothing propagates to
//! the process level.

pub mod body;
pub mod context;
pub mod error;
pub mod finalize;

use crate::config::{Config, CorsPolicy};
use crate::http;
use crate::logger;
use crate::routing::Resolver;
use crate::script::loader::{CachedLoader, FreshLoader, HandlerLoader};
use crate::script::{ScriptEngine, ScriptRequest, ScriptResponse};
use context::RequestContext;
use error::RouteError;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use rhai::Dynamic;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Engine operating mode.
///
/// Development re-reads handler scripts on every request and rebuilds the
/// route table on a miss; production loads each handler once and keeps the
/// first route table for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

/// Outcome of dispatching a request to the engine.
pub enum Dispatch<B> {
    /// The request was under the API prefix; here is the response.
    Handled(Response<Full<Bytes>>),
    /// Not an API request. Handed back untouched for the next handler in
    /// chain (dev middleware) or the static fallback (production).
    Forward(Request<B>),
}

/// The unified request-routing and lifecycle engine.
pub struct Engine {
    prefix: String,
    body_limit: u64,
    timeout: Duration,
    cors: CorsPolicy,
    access_log: bool,
    resolver: Resolver,
    loader: Arc<dyn HandlerLoader>,
    script: Arc<ScriptEngine>,
}

impl Engine {
    pub fn new(config: &Config, mode: Mode) -> std::io::Result<Self> {
        let api_root: PathBuf = std::path::absolute(&config.api.dir)?;
        let script = Arc::new(ScriptEngine::new());
        let loader: Arc<dyn HandlerLoader> = match mode {
            Mode::Development => Arc::new(FreshLoader::new(Arc::clone(&script))),
            Mode::Production => Arc::new(CachedLoader::new(Arc::clone(&script))),
        };

        Ok(Self {
            prefix: config.api_prefix(),
            body_limit: config.api.body_limit,
            timeout: Duration::from_millis(config.api.timeout_millis),
            cors: config.api.cors.clone(),
            access_log: config.logging.access_log,
            resolver: Resolver::new(api_root, mode == Mode::Development),
            loader,
            script,
        })
    }

    /// Route a request through the engine, or hand it back if it is not an
    /// API request. This is the attach-point for a host dev server.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Dispatch<B>
    where
        B: hyper::body::Body + Unpin,
        B::Error: std::fmt::Display,
    {
        let pathname = context::decode_pathname(req.uri().path());
        let Some(relative) = self.strip_prefix(&pathname) else {
            return Dispatch::Forward(req);
        };
        Dispatch::Handled(self.handle_api(req, &pathname, &relative).await)
    }

    /// Strip the API prefix, segment-aware; `None` means not an API path.
    fn strip_prefix(&self, pathname: &str) -> Option<String> {
        let rest = pathname.strip_prefix(&self.prefix)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(rest.trim_matches('/').to_string())
    }

    async fn handle_api<B>(
        &self,
        req: Request<B>,
        pathname: &str,
        relative: &str,
    ) -> Response<Full<Bytes>>
    where
        B: hyper::body::Body + Unpin,
        B::Error: std::fmt::Display,
    {
        let method = req.method().clone();

        // With CORS enabled, preflight probes end here before any routing
        // work. With CORS disabled, OPTIONS flows through the pipeline and a
        // handler may serve it.
        if method == Method::OPTIONS && self.cors.is_enabled() {
            return http::build_preflight_response(&self.cors);
        }

        let script_response = ScriptResponse::new();
        let pipeline = self.run(req, pathname, relative, script_response.clone());

        // The timer only preempts the response: a handler still running on
        // its blocking thread finishes harmlessly, and the ended flag keeps
        // its late writes out of the already-sent timeout response.
        let mut response = match tokio::time::timeout(self.timeout, pipeline).await {
            Ok(outcome) => finalize::finalize(&script_response, outcome),
            Err(_elapsed) => {
                logger::log_warning(&format!("request timed out: {method} {pathname}"));
                finalize::timeout_response(&script_response)
            }
        };

        http::apply_cors(&mut response, &self.cors);
        if self.access_log {
            logger::log_access(method.as_str(), pathname, response.status().as_u16());
        }
        response
    }

    async fn run<B>(
        &self,
        req: Request<B>,
        pathname: &str,
        relative: &str,
        script_response: ScriptResponse,
    ) -> Result<Dynamic, RouteError>
    where
        B: hyper::body::Body + Unpin,
        B::Error: std::fmt::Display,
    {
        let resolution = self.resolver.resolve(relative)?;
        let (parts, raw_body) = req.into_parts();

        let body_value = if carries_payload(&parts.method) {
            check_declared_length(&parts.headers, self.body_limit)?;
            Some(body::decode(raw_body, self.body_limit).await?)
        } else {
            None
        };

        let ctx = RequestContext {
            method: parts.method.to_string(),
            raw_url: parts.uri.to_string(),
            pathname: pathname.to_string(),
            query: context::parse_query(parts.uri.query()),
            params: resolution.params,
            headers: context::header_map(&parts.headers),
            body: body_value,
        };
        let script_request = ScriptRequest::new(ctx)?;

        let loader = Arc::clone(&self.loader);
        let script = Arc::clone(&self.script);
        let path = resolution.file_path;

        let joined = tokio::task::spawn_blocking(move || {
            let ast = loader.load(&path)?;
            if !ScriptEngine::has_handler(&ast) {
                return Err(RouteError::NoHandlerExport);
            }
            script.invoke(&ast, script_request, script_response)
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            // A panicking handler task must surface as a 500, never crash
            // the server.
            Err(join_err) => Err(RouteError::Handler(format!(
                "handler task failed: {join_err}"
            ))),
        }
    }
}

/// Mutating methods that conventionally carry a JSON payload.
fn carries_payload(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Reject obviously oversized requests from the declared length before
/// streaming a single byte. The streaming count remains authoritative.
fn check_declared_length(headers: &hyper::HeaderMap, limit: u64) -> Result<(), RouteError> {
    let Some(declared) = headers
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    else {
        return Ok(());
    };
    if declared > limit {
        return Err(RouteError::BodyTooLarge);
    }
    Ok(())
}
