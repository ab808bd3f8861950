//! Request interceptors.
//!
//! An ordered list of [`Interceptor`] values wraps the gateway
//! handlers: `before` runs on the incoming request head and may
//! short-circuit with a response, `after` runs on the produced
//! response. Interceptors share a per-request [`Slot`] and see only
//! the public HTTP surface, never the store's locks or file handles.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;

use super::ServiceState;

/// Small per-request key/value scratch space shared along the chain.
#[derive(Debug, Default)]
pub struct Slot {
    values: Mutex<HashMap<String, String>>,
}

impl Slot {
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.lock().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.lock().remove(key)
    }
}

#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Runs before the handler. Returning a response short-circuits
    /// the request; later interceptors and the handler never run.
    async fn before(&self, _request: &Parts, _slot: &Slot) -> Option<Response> {
        None
    }

    /// Runs after the handler (or whichever interceptor produced the
    /// response).
    async fn after(&self, _response: &mut Response, _slot: &Slot) {}
}

/// Middleware driving the chain around the gateway handlers.
pub(crate) async fn run_chain(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let slot = Slot::default();
    let (parts, body) = request.into_parts();

    for interceptor in state.interceptors() {
        if let Some(mut response) = interceptor.before(&parts, &slot).await {
            for interceptor in state.interceptors() {
                interceptor.after(&mut response, &slot).await;
            }
            return response;
        }
    }

    let mut response = next.run(Request::from_parts(parts, body)).await;
    for interceptor in state.interceptors() {
        interceptor.after(&mut response, &slot).await;
    }
    response
}
