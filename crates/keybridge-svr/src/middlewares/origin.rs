use axum::{body::Body, extract::FromRequestParts, response::Response};
use http::{header, request::Parts, HeaderMap, StatusCode};
use url::Url;

/// Public origin the request arrived on, as reported by the outermost proxy.
/// Inserted by [`super::OriginRewriteLayer`].
#[derive(Debug, Clone)]
pub struct RequestOrigin(pub Url);

impl RequestOrigin {
    pub fn join(&self, path: &str) -> Result<Url, url::ParseError> {
        self.0.join(path)
    }

    /// Origin without the trailing slash `Url` keeps on bare authorities,
    /// the spelling issuer fields are compared under.
    pub fn origin_str(&self) -> &str {
        self.0.as_str().trim_end_matches('/')
    }
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Response<Body>;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestOrigin>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("origin rewrite middleware not found");
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::empty())
                    .unwrap()
            })
    }
}

fn forwarded_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    // proxies append, the first entry is the edge
    let first = value.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

fn fallback_host(fallback: &Url) -> Option<String> {
    let host = fallback.host_str()?;
    match fallback.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

/// Derives the public origin from `X-Forwarded-Proto`/`X-Forwarded-Host`,
/// then the `Host` header, then `fallback`. Total: unparseable input
/// resolves to the fallback origin instead of failing the request.
pub fn resolve_origin(headers: &HeaderMap, fallback: &Url) -> Url {
    let scheme = forwarded_value(headers, "x-forwarded-proto")
        .unwrap_or_else(|| fallback.scheme().to_string());
    let host = forwarded_value(headers, "x-forwarded-host")
        .or_else(|| forwarded_value(headers, header::HOST.as_str()))
        .or_else(|| fallback_host(fallback));
    let Some(host) = host else {
        return fallback.clone();
    };
    match Url::parse(&format!("{scheme}://{host}")) {
        Ok(url) => url,
        Err(_) => fallback.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn fallback() -> Url {
        Url::parse("http://localhost:9000").unwrap()
    }

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in entries {
            headers.append(
                http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn forwarded_headers_take_precedence() {
        let headers = headers(&[
            ("host", "internal:9000"),
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "tunnel.example.com"),
        ]);
        let origin = resolve_origin(&headers, &fallback());
        assert_eq!(origin.as_str(), "https://tunnel.example.com/");
    }

    #[test]
    fn host_header_is_the_fallback() {
        let headers = headers(&[("host", "direct.example.com:8443")]);
        let origin = resolve_origin(&headers, &fallback());
        assert_eq!(origin.as_str(), "http://direct.example.com:8443/");
    }

    #[test]
    fn first_entry_of_a_forward_chain_wins() {
        let headers = headers(&[
            ("x-forwarded-proto", "https, http"),
            ("x-forwarded-host", "edge.example.com, hop.internal"),
        ]);
        let origin = resolve_origin(&headers, &fallback());
        assert_eq!(origin.as_str(), "https://edge.example.com/");
    }

    #[test]
    fn bare_request_resolves_to_fallback() {
        let origin = resolve_origin(&HeaderMap::new(), &fallback());
        assert_eq!(origin, fallback());
    }

    #[test]
    fn forwarded_proto_alone_keeps_fallback_host() {
        let headers = headers(&[("x-forwarded-proto", "https")]);
        let origin = resolve_origin(&headers, &fallback());
        assert_eq!(origin.as_str(), "https://localhost:9000/");
    }

    #[test]
    fn garbage_host_resolves_to_fallback() {
        let headers = headers(&[("x-forwarded-host", "not a host")]);
        let origin = resolve_origin(&headers, &fallback());
        assert_eq!(origin, fallback());
    }
}
