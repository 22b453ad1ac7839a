//! Response finalization
//!
//! Decides whether the handler's own output is authoritative (it ended the
//! response itself) or whether the engine auto-encodes the handler's return
//! value as JSON. Errors raised after a response has ended are discarded.

use crate::engine::error::RouteError;
use crate::script::{ResponseState, ScriptResponse};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use rhai::Dynamic;

/// Produce the final HTTP response for a completed invocation.
pub fn finalize(
    response: &ScriptResponse,
    outcome: Result<Dynamic, RouteError>,
) -> Response<Full<Bytes>> {
    let state = response.snapshot();

    match outcome {
        Ok(value) => {
            if state.ended {
                // The handler managed the response itself; its output stands.
                return state_response(state);
            }
            match to_json(&value) {
                Ok(json) => {
                    let mut state = state;
                    set_content_type(&mut state, "application/json");
                    state.body = json.to_string().into_bytes();
                    state_response(state)
                }
                Err(err) => error_response(&err),
            }
        }
        Err(err) => {
            if state.ended {
                // Thrown after the response ended: swallowed, never a second write.
                crate::logger::log_warning(&format!(
                    "handler error after response ended (discarded): {err}"
                ));
                return state_response(state);
            }
            error_response(&err)
        }
    }
}

/// Write the timeout response, but only if the handler has not already ended
/// the response. Checked at fire time under the state lock, so a handler
/// completing concurrently can never be overwritten.
pub fn timeout_response(response: &ScriptResponse) -> Response<Full<Bytes>> {
    let state = {
        let mut guard = response.lock();
        if !guard.ended {
            let err = RouteError::Timeout;
            guard.status = Some(err.status().as_u16());
            guard.headers = vec![("content-type".to_string(), "application/json".to_string())];
            guard.body = error_body(&err).to_string().into_bytes();
            guard.ended = true;
        }
        guard.clone()
    };
    state_response(state)
}

/// Map a pipeline failure to its JSON error response.
pub fn error_response(err: &RouteError) -> Response<Full<Bytes>> {
    let mut state = ResponseState {
        status: Some(err.status().as_u16()),
        ..ResponseState::default()
    };
    set_content_type(&mut state, "application/json");
    state.body = error_body(err).to_string().into_bytes();
    state_response(state)
}

/// Materialize accumulated response state as a hyper response.
pub fn state_response(state: ResponseState) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(state.body)));
    *response.status_mut() = state
        .status
        .map_or(StatusCode::OK, |code| {
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        });

    for (name, value) in &state.headers {
        let parsed = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        );
        if let (Ok(name), Ok(value)) = parsed {
            response.headers_mut().insert(name, value);
        } else {
            crate::logger::log_warning(&format!("dropping invalid response header '{name}'"));
        }
    }
    response
}

fn error_body(err: &RouteError) -> serde_json::Value {
    serde_json::json!({ "error": err.to_string() })
}

fn to_json(value: &Dynamic) -> Result<serde_json::Value, RouteError> {
    if value.is_unit() {
        // No return value means "use empty object".
        return Ok(serde_json::json!({}));
    }
    rhai::serde::from_dynamic::<serde_json::Value>(value)
        .map_err(|e| RouteError::Handler(format!("handler result is not JSON-serializable: {e}")))
}

fn set_content_type(state: &mut ResponseState, value: &str) {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(response: &Response<Full<Bytes>>) -> String {
        use http_body_util::BodyExt;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let collected = runtime
            .block_on(response.body().clone().collect())
            .expect("collect");
        String::from_utf8(collected.to_bytes().to_vec()).expect("utf8 body")
    }

    #[test]
    fn test_unit_return_becomes_empty_object() {
        let response = ScriptResponse::new();
        let final_response = finalize(&response, Ok(Dynamic::UNIT));
        assert_eq!(final_response.status(), StatusCode::OK);
        assert_eq!(body_of(&final_response), "{}");
        assert_eq!(
            final_response.headers().get("content-type").map(|v| v.as_bytes()),
            Some(b"application/json".as_slice())
        );
    }

    #[test]
    fn test_handler_set_status_preserved() {
        let response = ScriptResponse::new();
        {
            let mut state = response.lock();
            state.status = Some(202);
        }
        let final_response = finalize(&response, Ok(Dynamic::UNIT));
        assert_eq!(final_response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_ended_response_is_authoritative() {
        let response = ScriptResponse::new();
        {
            let mut state = response.lock();
            state.body = b"handler wrote this".to_vec();
            state.ended = true;
        }
        let final_response = finalize(&response, Ok(Dynamic::from(1_i64)));
        assert_eq!(body_of(&final_response), "handler wrote this");
    }

    #[test]
    fn test_error_after_end_discarded() {
        let response = ScriptResponse::new();
        {
            let mut state = response.lock();
            state.body = b"done".to_vec();
            state.ended = true;
        }
        let final_response = finalize(
            &response,
            Err(RouteError::Handler("late failure".to_string())),
        );
        assert_eq!(final_response.status(), StatusCode::OK);
        assert_eq!(body_of(&final_response), "done");
    }

    #[test]
    fn test_timeout_noop_when_already_ended() {
        let response = ScriptResponse::new();
        {
            let mut state = response.lock();
            state.body = b"finished first".to_vec();
            state.ended = true;
        }
        let final_response = timeout_response(&response);
        assert_eq!(final_response.status(), StatusCode::OK);
        assert_eq!(body_of(&final_response), "finished first");
    }

    #[test]
    fn test_timeout_writes_408_when_pending() {
        let response = ScriptResponse::new();
        let final_response = timeout_response(&response);
        assert_eq!(final_response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(body_of(&final_response).contains("timed out"));
        // Late handler writes are ignored once the timeout response is sent.
        assert!(response.has_ended());
    }

    #[test]
    fn test_error_response_body_carries_message() {
        let response = error_response(&RouteError::Handler("boom".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_of(&response).contains("boom"));
    }
}
