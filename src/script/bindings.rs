//! Script-facing request and response bindings
//!
//! Handler scripts receive two values: a read-only request surface and a
//! response object they may drive directly. The response state is shared
//! with the finalizer, which uses the `ended` flag to decide whether the
//! handler's own output is authoritative.

use crate::engine::context::RequestContext;
use crate::engine::error::RouteError;
use rhai::{Dynamic, Map};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Read-only request surface handed to handler scripts.
#[derive(Clone)]
pub struct ScriptRequest {
    ctx: Arc<RequestContext>,
    body: Dynamic,
    params: Map,
    query: Map,
}

impl ScriptRequest {
    pub fn new(ctx: RequestContext) -> Result<Self, RouteError> {
        let body = match &ctx.body {
            Some(value) => rhai::serde::to_dynamic(value)
                .map_err(|e| RouteError::Handler(format!("body conversion failed: {e}")))?,
            None => Dynamic::UNIT,
        };
        let params = string_map(&ctx.params);
        let query = string_map(&ctx.query);
        Ok(Self {
            ctx: Arc::new(ctx),
            body,
            params,
            query,
        })
    }
}

/// Accumulated outbound response, mutated by the script and finalized by the
/// engine. `ended` is checked at every write; once set, the body is final.
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub ended: bool,
}

/// Response object passed to handler scripts. Cloning shares the state.
#[derive(Clone, Default)]
pub struct ScriptResponse(Arc<Mutex<ResponseState>>);

impl ScriptResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, ResponseState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ResponseState {
        self.lock().clone()
    }

    pub fn has_ended(&self) -> bool {
        self.lock().ended
    }

    fn set_status(&self, code: i64) {
        let mut state = self.lock();
        if !state.ended {
            state.status = Some(u16::try_from(code).unwrap_or(500));
        }
    }

    fn set_header(&self, name: &str, value: &str) {
        let mut state = self.lock();
        if !state.ended {
            state.headers.push((name.to_string(), value.to_string()));
        }
    }

    /// End the response with a JSON-encoded value. No-op if already ended.
    fn send(&self, value: &Dynamic) {
        let json = rhai::serde::from_dynamic::<serde_json::Value>(value)
            .unwrap_or(serde_json::Value::Null);
        let mut state = self.lock();
        if state.ended {
            return;
        }
        ensure_content_type(&mut state, "application/json");
        state.body = json.to_string().into_bytes();
        state.ended = true;
    }

    /// End the response with a plain-text body. No-op if already ended.
    fn send_text(&self, text: &str) {
        let mut state = self.lock();
        if state.ended {
            return;
        }
        ensure_content_type(&mut state, "text/plain; charset=utf-8");
        state.body = text.as_bytes().to_vec();
        state.ended = true;
    }
}

fn ensure_content_type(state: &mut ResponseState, value: &str) {
    let present = state
        .headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
    if !present {
        state
            .headers
            .push(("content-type".to_string(), value.to_string()));
    }
}

fn string_map(source: &HashMap<String, String>) -> Map {
    source
        .iter()
        .map(|(k, v)| (k.as_str().into(), Dynamic::from(v.clone())))
        .collect()
}

fn lookup(map: &HashMap<String, String>, name: &str) -> Dynamic {
    map.get(name)
        .map_or(Dynamic::UNIT, |v| Dynamic::from(v.clone()))
}

/// Register the request/response types and a small utility surface on a
/// script engine.
pub fn register(engine: &mut rhai::Engine) {
    engine
        .register_type_with_name::<ScriptRequest>("Request")
        .register_fn("method", |r: &mut ScriptRequest| r.ctx.method.clone())
        .register_fn("path", |r: &mut ScriptRequest| r.ctx.pathname.clone())
        .register_fn("url", |r: &mut ScriptRequest| r.ctx.raw_url.clone())
        .register_fn("body", |r: &mut ScriptRequest| r.body.clone())
        .register_fn("params", |r: &mut ScriptRequest| r.params.clone())
        .register_fn("queries", |r: &mut ScriptRequest| r.query.clone())
        .register_fn("param", |r: &mut ScriptRequest, name: &str| {
            lookup(&r.ctx.params, name)
        })
        .register_fn("query", |r: &mut ScriptRequest, name: &str| {
            lookup(&r.ctx.query, name)
        })
        .register_fn("header", |r: &mut ScriptRequest, name: &str| {
            lookup(&r.ctx.headers, &name.to_ascii_lowercase())
        });

    engine
        .register_type_with_name::<ScriptResponse>("Response")
        .register_fn("status", |r: &mut ScriptResponse, code: i64| {
            r.set_status(code);
        })
        .register_fn("header", |r: &mut ScriptResponse, name: &str, value: &str| {
            r.set_header(name, value);
        })
        .register_fn("send", |r: &mut ScriptResponse, value: Dynamic| {
            r.send(&value);
        })
        .register_fn("text", |r: &mut ScriptResponse, text: &str| {
            r.send_text(text);
        })
        .register_fn("has_ended", |r: &mut ScriptResponse| r.has_ended());

    // Handlers may simulate slow upstream work; the engine's timeout only
    // preempts the response, never the running script.
    engine.register_fn("sleep", |millis: i64| {
        if millis > 0 {
            #[allow(clippy::cast_sign_loss)]
            std::thread::sleep(std::time::Duration::from_millis(millis as u64));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_marks_ended_and_sets_json_content_type() {
        let res = ScriptResponse::new();
        res.send(&Dynamic::from(42_i64));
        let state = res.snapshot();
        assert!(state.ended);
        assert_eq!(state.body, b"42");
        assert!(state
            .headers
            .iter()
            .any(|(n, v)| n == "content-type" && v == "application/json"));
    }

    #[test]
    fn test_writes_after_end_are_ignored() {
        let res = ScriptResponse::new();
        res.send_text("first");
        res.send_text("second");
        res.set_status(404);
        let state = res.snapshot();
        assert_eq!(state.body, b"first");
        assert_eq!(state.status, None);
    }

    #[test]
    fn test_status_preserved_when_set_before_end() {
        let res = ScriptResponse::new();
        res.set_status(201);
        res.send(&Dynamic::UNIT);
        assert_eq!(res.snapshot().status, Some(201));
    }
}
