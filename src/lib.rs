//! File-based HTTP API router.
//!
//! Maps URL paths to handler scripts on disk: a request for `/api/users/123`
//! resolves to `server/api/users/[id].rhai`, whose `handler(req, res)`
//! function produces (or writes) the response. One engine backs two entry
//! points: a middleware attach-point for a host development server, and the
//! standalone production runtime that also serves the bundled frontend.
//!
//! ```rust,ignore
//! use apiroute::{Config, Dispatch, Engine, Mode};
//!
//! let config = Config::load()?;
//! let engine = Engine::new(&config, Mode::Development)?;
//!
//! // Inside the host server's request handler:
//! match engine.dispatch(req).await {
//!     Dispatch::Handled(response) => response,
//!     Dispatch::Forward(req) => next(req).await,
//! }
//! ```

pub mod bundle;
pub mod config;
pub mod engine;
pub mod http;
pub mod logger;
pub mod routing;
pub mod script;
pub mod statics;

pub use config::Config;
pub use engine::{Dispatch, Engine, Mode};
