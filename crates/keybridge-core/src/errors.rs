use axum::{body::Body, response::IntoResponse};
use http::{Response, StatusCode};
use oauth2::ConfigurationError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Normal Http Errors
    #[error("Bad Request: {0}")]
    BadRequest(#[from] Error400),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] Error401),

    // Special Errors, expected 500
    #[error("No Token Endpoint")]
    NoTokenEndpoint,

    #[error("Reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Url error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Http error: {0}")]
    HttpError(#[from] http::Error),

    #[error("Discovery error: {0}")]
    DiscoveryError(#[from] openidconnect::DiscoveryError<oauth2::HttpClientError<reqwest::Error>>),

    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),
}

#[derive(Debug, thiserror::Error)]
pub enum Error400 {
    #[error("Invalid request")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header string data {0}")]
    InvalidHeaderString(http::header::HeaderName),

    #[error("'Bearer' type expected, but got {0}")]
    BearerTokenExpected(String),

    #[error("Invalid token: {0}")]
    InvalidToken(&'static str),

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unsupported response_type: {0}")]
    UnsupportedResponseType(String),

    #[error("Unsupported code_challenge_method: {0}")]
    UnsupportedChallengeMethod(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error401 {
    #[error("Authentication failed")]
    AuthenticationFailed,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response<Body> {
        match self {
            Self::BadRequest(e) => Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Body::from(e.to_string()))
                .unwrap(),
            Self::Unauthorized(e) => Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body(Body::from(e.to_string()))
                .unwrap(),
            _ => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
                .unwrap(),
        }
    }
}
