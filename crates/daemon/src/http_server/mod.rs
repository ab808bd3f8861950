//! HTTP surface: three verbs over a path-derived key.

pub mod gateway;
pub mod interceptor;
pub mod sniff;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{any, on, MethodFilter};
use axum::Router;
use tower_http::trace::TraceLayer;

use store::StoreHandle;

use interceptor::Interceptor;

/// Shared gateway state: the resolved store, cache policy and the
/// interceptor chain.
#[derive(Clone)]
pub struct ServiceState {
    handle: StoreHandle,
    max_age: Option<u32>,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl ServiceState {
    pub fn new(handle: StoreHandle) -> Self {
        Self {
            handle,
            max_age: None,
            interceptors: Arc::new(Vec::new()),
        }
    }

    pub fn with_max_age(mut self, max_age: Option<u32>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        self.interceptors = Arc::new(interceptors);
        self
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub fn max_age(&self) -> Option<u32> {
        self.max_age
    }

    pub(crate) fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }
}

/// Build the gateway router.
///
/// The root path carries no key and is a bad request for every verb.
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/", any(bad_request))
        .route(
            "/*path",
            on(MethodFilter::GET, gateway::handle_get)
                .on(MethodFilter::HEAD, gateway::handle_check)
                .on(MethodFilter::POST, gateway::handle_set),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            interceptor::run_chain,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn bad_request() -> StatusCode {
    StatusCode::BAD_REQUEST
}
