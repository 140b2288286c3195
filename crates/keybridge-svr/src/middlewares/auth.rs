use axum::extract::Request;
use keybridge_auth::Authn;
use tower::{Layer, Service};

/// Hands every request a clone of the token verifier. Handlers that guard
/// the MCP surface call [`GeneralAuthn::authenticate`] themselves so that
/// a missing or bad token turns into a 401 challenge instead of an
/// extractor rejection.
///
/// [`GeneralAuthn::authenticate`]: keybridge_core::GeneralAuthn::authenticate
#[derive(Clone)]
pub struct AuthLayer {
    authn: Authn,
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    authn: Authn,
}

impl AuthLayer {
    pub fn new(authn: Authn) -> Self {
        Self { authn }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            authn: self.authn.clone(),
        }
    }
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn call(&mut self, mut req: Request) -> Self::Future {
        req.extensions_mut().insert(self.authn.clone());
        self.inner.call(req)
    }

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }
}
