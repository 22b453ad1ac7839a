//! Handler loading strategies
//!
//! Development recompiles a handler script on every request so edited files
//! take effect without a restart; production compiles once per resolved path
//! and memoizes the AST. The strategy is picked by an explicit mode flag,
//! never by ambient state.

use crate::engine::error::RouteError;
use crate::script::ScriptEngine;
use rhai::AST;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loads and compiles handler scripts. Implementations are chosen per mode.
pub trait HandlerLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<AST>, RouteError>;
}

/// Cache-busting loader: always re-reads and recompiles.
pub struct FreshLoader {
    engine: Arc<ScriptEngine>,
}

impl FreshLoader {
    pub const fn new(engine: Arc<ScriptEngine>) -> Self {
        Self { engine }
    }
}

impl HandlerLoader for FreshLoader {
    fn load(&self, path: &Path) -> Result<Arc<AST>, RouteError> {
        compile_file(&self.engine, path).map(Arc::new)
    }
}

/// Memoizing loader: compiles each script once, keyed by resolved path.
pub struct CachedLoader {
    engine: Arc<ScriptEngine>,
    cache: RwLock<HashMap<PathBuf, Arc<AST>>>,
}

impl CachedLoader {
    pub fn new(engine: Arc<ScriptEngine>) -> Self {
        Self {
            engine,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl HandlerLoader for CachedLoader {
    fn load(&self, path: &Path) -> Result<Arc<AST>, RouteError> {
        if let Ok(cache) = self.cache.read() {
            if let Some(ast) = cache.get(path) {
                return Ok(Arc::clone(ast));
            }
        }

        let ast = Arc::new(compile_file(&self.engine, path)?);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(path.to_path_buf(), Arc::clone(&ast));
        }
        Ok(ast)
    }
}

fn compile_file(engine: &ScriptEngine, path: &Path) -> Result<AST, RouteError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        RouteError::Handler(format!("failed to load handler '{}': {e}", path.display()))
    })?;
    engine.compile(&source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptRequest;
    use crate::engine::context::RequestContext;
    use std::collections::HashMap as StdMap;

    fn bare_request() -> ScriptRequest {
        ScriptRequest::new(RequestContext {
            method: "GET".to_string(),
            raw_url: "/".to_string(),
            pathname: "/".to_string(),
            query: StdMap::new(),
            params: StdMap::new(),
            headers: StdMap::new(),
            body: None,
        })
        .expect("request")
    }

    fn invoke_i64(engine: &ScriptEngine, ast: &AST) -> i64 {
        let value = engine
            .invoke(ast, bare_request(), crate::script::ScriptResponse::new())
            .expect("invoke");
        value.as_int().expect("int result")
    }

    #[test]
    fn test_fresh_loader_sees_edits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("h.rhai");
        std::fs::write(&path, "fn handler(req, res) { 1 }").expect("write");

        let engine = Arc::new(ScriptEngine::new());
        let loader = FreshLoader::new(Arc::clone(&engine));
        let ast = loader.load(&path).expect("load");
        assert_eq!(invoke_i64(&engine, &ast), 1);

        std::fs::write(&path, "fn handler(req, res) { 2 }").expect("rewrite");
        let ast = loader.load(&path).expect("reload");
        assert_eq!(invoke_i64(&engine, &ast), 2);
    }

    #[test]
    fn test_cached_loader_keeps_first_compilation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("h.rhai");
        std::fs::write(&path, "fn handler(req, res) { 1 }").expect("write");

        let engine = Arc::new(ScriptEngine::new());
        let loader = CachedLoader::new(Arc::clone(&engine));
        let ast = loader.load(&path).expect("load");
        assert_eq!(invoke_i64(&engine, &ast), 1);

        std::fs::write(&path, "fn handler(req, res) { 2 }").expect("rewrite");
        let ast = loader.load(&path).expect("reload");
        assert_eq!(invoke_i64(&engine, &ast), 1);
    }

    #[test]
    fn test_missing_file_is_handler_error() {
        let engine = Arc::new(ScriptEngine::new());
        let loader = FreshLoader::new(engine);
        let err = loader
            .load(Path::new("/nonexistent/h.rhai"))
            .expect_err("must fail");
        assert!(matches!(err, RouteError::Handler(_)));
    }
}
