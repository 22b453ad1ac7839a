//! HTTP protocol layer module
//!
//! Protocol-level helpers shared by the API engine and the static fallback.

pub mod mime;
pub mod response;

pub use response::{
    apply_cors, build_403_response, build_404_response, build_405_response, build_asset_response,
    build_json_response, build_preflight_response,
};
