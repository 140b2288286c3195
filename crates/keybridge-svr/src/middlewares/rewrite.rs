use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, extract::Request, response::Response};
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use keybridge_core::Config;
use tower::{Layer, Service};
use url::Url;

use super::origin::{resolve_origin, RequestOrigin};

/// Resolves the public origin of each request, exposes it as a
/// [`RequestOrigin`] extension, and swaps every aliased origin for it in
/// outgoing `WWW-Authenticate` and `Location` headers and JSON bodies.
/// Handlers stay origin-free: they compose URLs against the configured
/// placeholder and this layer makes them true on the way out.
#[derive(Clone)]
pub struct OriginRewriteLayer {
    aliases: Arc<Vec<String>>,
    fallback: Url,
}

impl OriginRewriteLayer {
    pub fn new(config: &Config) -> Self {
        let mut aliases = vec![prefix_str(&config.server.placeholder)];
        for alias in &config.server.internal_aliases {
            let alias = prefix_str(alias);
            if !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }
        Self {
            aliases: Arc::new(aliases),
            fallback: config.server.placeholder.clone(),
        }
    }
}

impl<S> Layer<S> for OriginRewriteLayer {
    type Service = OriginRewriteMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OriginRewriteMiddleware {
            inner,
            aliases: self.aliases.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

#[derive(Clone)]
pub struct OriginRewriteMiddleware<S> {
    inner: S,
    aliases: Arc<Vec<String>>,
    fallback: Url,
}

impl<S> Service<Request> for OriginRewriteMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let origin = resolve_origin(req.headers(), &self.fallback);
        req.extensions_mut().insert(RequestOrigin(origin.clone()));
        let aliases = self.aliases.clone();
        let future = self.inner.call(req);
        Box::pin(async move {
            let response = future.await?;
            Ok(rewrite_response(response, &aliases, &origin).await)
        })
    }
}

fn prefix_str(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

/// Replaces every alias, in both its literal and form-urlencoded
/// spellings, with the resolved origin. `None` means nothing matched,
/// which also makes a second pass over already-rewritten output a no-op.
fn rewrite_str(value: &str, aliases: &[String], origin: &str) -> Option<String> {
    let mut rewritten = value.to_string();
    let mut changed = false;
    for alias in aliases {
        if alias == origin {
            continue;
        }
        if rewritten.contains(alias.as_str()) {
            rewritten = rewritten.replace(alias.as_str(), origin);
            changed = true;
        }
        let encoded_alias = urlencoded(alias);
        if rewritten.contains(&encoded_alias) {
            rewritten = rewritten.replace(&encoded_alias, &urlencoded(origin));
            changed = true;
        }
    }
    changed.then_some(rewritten)
}

fn urlencoded(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .map(|mime| mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
        .unwrap_or(false)
}

async fn rewrite_response(response: Response, aliases: &[String], origin: &Url) -> Response {
    let origin = prefix_str(origin);
    let (mut parts, body) = response.into_parts();

    for name in [header::WWW_AUTHENTICATE, header::LOCATION] {
        let Some(value) = parts.headers.get(&name) else {
            continue;
        };
        let Ok(value) = value.to_str() else {
            continue;
        };
        if let Some(rewritten) = rewrite_str(value, aliases, &origin) {
            match HeaderValue::from_str(&rewritten) {
                Ok(rewritten) => {
                    parts.headers.insert(name.clone(), rewritten);
                }
                Err(_) => {
                    tracing::warn!(header = %name, "Rewritten value is not a valid header");
                }
            }
        }
    }

    if !is_json(&parts.headers) {
        return Response::from_parts(parts, body);
    }
    let collected = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to buffer response body for rewrite");
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
                .unwrap();
        }
    };
    let rewritten = std::str::from_utf8(&collected)
        .ok()
        .and_then(|text| rewrite_str(text, aliases, &origin));
    match rewritten {
        Some(rewritten) => {
            // buffered length changed, let hyper restate it
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(rewritten))
        }
        None => Response::from_parts(parts, Body::from(collected)),
    }
}
