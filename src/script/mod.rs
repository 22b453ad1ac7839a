//! Handler script execution
//!
//! Handler modules are Rhai scripts defining a `handler(req, res)` function.
//! The script engine is configured once with the request/response bindings
//! and shared across requests; each invocation gets a fresh scope.

pub mod bindings;
pub mod loader;

use crate::engine::error::RouteError;
use rhai::{Dynamic, Scope, AST};

pub use bindings::{ResponseState, ScriptRequest, ScriptResponse};

/// Name of the function a handler script must define.
pub const HANDLER_FN: &str = "handler";

/// Shared, pre-configured script engine.
pub struct ScriptEngine {
    engine: rhai::Engine,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    pub fn new() -> Self {
        let mut engine = rhai::Engine::new();
        bindings::register(&mut engine);
        Self { engine }
    }

    /// Compile a handler script source to an AST.
    pub fn compile(&self, source: &str) -> Result<AST, RouteError> {
        self.engine
            .compile(source)
            .map_err(|e| RouteError::Handler(format!("script compile error: {e}")))
    }

    /// Whether the compiled script defines a handler function.
    pub fn has_handler(ast: &AST) -> bool {
        ast.iter_functions().any(|f| f.name == HANDLER_FN)
    }

    /// Invoke the script's handler with the request/response pair.
    ///
    /// Runs synchronously; the caller decides the thread. Script failures
    /// surface as `RouteError::Handler` carrying the script's message.
    pub fn invoke(
        &self,
        ast: &AST,
        request: ScriptRequest,
        response: ScriptResponse,
    ) -> Result<Dynamic, RouteError> {
        let mut scope = Scope::new();
        self.engine
            .call_fn::<Dynamic>(&mut scope, ast, HANDLER_FN, (request, response))
            .map_err(|e| RouteError::Handler(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::RequestContext;
    use std::collections::HashMap;

    fn request() -> ScriptRequest {
        ScriptRequest::new(RequestContext {
            method: "GET".to_string(),
            raw_url: "/api/hello".to_string(),
            pathname: "/api/hello".to_string(),
            query: HashMap::from([("name".to_string(), "test".to_string())]),
            params: HashMap::from([("id".to_string(), "123".to_string())]),
            headers: HashMap::new(),
            body: Some(serde_json::json!({"a": 1})),
        })
        .expect("request")
    }

    #[test]
    fn test_invoke_returns_map() {
        let engine = ScriptEngine::new();
        let ast = engine
            .compile(r#"fn handler(req, res) { #{ message: "hi" } }"#)
            .expect("compile");
        assert!(ScriptEngine::has_handler(&ast));

        let value = engine
            .invoke(&ast, request(), ScriptResponse::new())
            .expect("invoke");
        let json = rhai::serde::from_dynamic::<serde_json::Value>(&value).expect("json");
        assert_eq!(json, serde_json::json!({"message": "hi"}));
    }

    #[test]
    fn test_script_sees_params_query_and_body() {
        let engine = ScriptEngine::new();
        let ast = engine
            .compile(
                r#"fn handler(req, res) {
                    #{ id: req.param("id"), name: req.query("name"), body: req.body() }
                }"#,
            )
            .expect("compile");

        let value = engine
            .invoke(&ast, request(), ScriptResponse::new())
            .expect("invoke");
        let json = rhai::serde::from_dynamic::<serde_json::Value>(&value).expect("json");
        assert_eq!(
            json,
            serde_json::json!({"id": "123", "name": "test", "body": {"a": 1}})
        );
    }

    #[test]
    fn test_missing_handler_detected() {
        let engine = ScriptEngine::new();
        let ast = engine
            .compile("fn other(req, res) { 1 }")
            .expect("compile");
        assert!(!ScriptEngine::has_handler(&ast));
    }

    #[test]
    fn test_throw_surfaces_as_handler_error() {
        let engine = ScriptEngine::new();
        let ast = engine
            .compile(r#"fn handler(req, res) { throw "boom" }"#)
            .expect("compile");
        let err = engine
            .invoke(&ast, request(), ScriptResponse::new())
            .expect_err("must fail");
        match err {
            RouteError::Handler(message) => assert!(message.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_script_drives_response_directly() {
        let engine = ScriptEngine::new();
        let ast = engine
            .compile(
                r#"fn handler(req, res) {
                    res.status(201);
                    res.send(#{ created: true });
                }"#,
            )
            .expect("compile");

        let response = ScriptResponse::new();
        engine
            .invoke(&ast, request(), response.clone())
            .expect("invoke");
        let state = response.snapshot();
        assert!(state.ended);
        assert_eq!(state.status, Some(201));
        assert_eq!(state.body, br#"{"created":true}"#);
    }
}
