//! Per-route guard enforcement.

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};

use crate::auth::{GuardChain, Identity, ANONYMOUS};
use crate::error::ApiError;

/// Runs the route's guard chain against the identity set by
/// [`authenticate`](super::authenticate::authenticate).
pub async fn require_guards(
    State(chain): State<GuardChain>,
    request: Request,
    next: Next,
) -> Response {
    let verdict = {
        let identity = request.extensions().get::<Identity>().unwrap_or(&ANONYMOUS);
        chain.check(identity)
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::debug!(guards = ?chain, reason = %rejection, "Request rejected by guard");
            ApiError::from(rejection).into_response()
        }
    }
}

/// Protects every method already added to `route` with `chain`.
///
/// Methods added afterwards, and the 405 fallback, are not guarded.
pub fn guarded<S>(route: MethodRouter<S>, chain: GuardChain) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(chain, require_guards))
}
