use axum::extract::Request;
use tower::{Layer, Service};

/// One pooled HTTP client for the whole server. Token exchanges against
/// the IdP and forwarded MCP requests all ride the same connection pool.
#[derive(Clone)]
pub struct ReqwestLayer {
    client: reqwest::Client,
}

#[derive(Clone)]
pub struct ReqwestMiddleware<S> {
    inner: S,
    client: reqwest::Client,
}

impl ReqwestLayer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl<S> Layer<S> for ReqwestLayer {
    type Service = ReqwestMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ReqwestMiddleware {
            inner,
            client: self.client.clone(),
        }
    }
}

impl<S> Service<Request> for ReqwestMiddleware<S>
where
    S: Service<Request>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn call(&mut self, mut req: Request) -> Self::Future {
        req.extensions_mut().insert(self.client.clone());
        self.inner.call(req)
    }

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }
}
