use axum::extract::Request;
use keybridge_store::FlowStore;
use tower::{Layer, Service};

/// Shares the transaction and code store with the authorize, callback and
/// token handlers.
#[derive(Clone)]
pub struct FlowStoreLayer {
    store: FlowStore,
}

#[derive(Clone)]
pub struct FlowStoreMiddleware<S> {
    inner: S,
    store: FlowStore,
}

impl FlowStoreLayer {
    pub fn new(store: FlowStore) -> Self {
        Self { store }
    }
}

impl<S> Layer<S> for FlowStoreLayer {
    type Service = FlowStoreMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FlowStoreMiddleware {
            inner,
            store: self.store.clone(),
        }
    }
}

impl<S> Service<Request> for FlowStoreMiddleware<S>
where
    S: Service<Request>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn call(&mut self, mut req: Request) -> Self::Future {
        req.extensions_mut().insert(self.store.clone());
        self.inner.call(req)
    }

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }
}
