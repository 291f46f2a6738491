use crate::models::chat::ErrorResponse;
use axum::{
    body::{ to_bytes, Bytes },
    extract::{ Request, State },
    http::{ header, request::Parts, HeaderMap, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::get,
    Json,
    Router,
};
use log::{ debug, error, info, warn };
use serde_json::json;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{ Any, CorsLayer };
use url::Url;

pub const CHAT_PREFIX: &str = "/chat";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const MAX_BODY_BYTES: usize = 1 * 1024 * 1024;

#[derive(Debug)]
pub enum RouterError {
    InvalidOrigin(String),
    InvalidAddr(String),
    Bind(std::io::Error),
    Serve(std::io::Error),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::InvalidOrigin(msg) => write!(f, "Invalid backend origin: {}", msg),
            RouterError::InvalidAddr(addr) => write!(f, "Invalid listen address '{}'", addr),
            RouterError::Bind(e) => write!(f, "Failed to bind router: {}", e),
            RouterError::Serve(e) => write!(f, "Router server error: {}", e),
        }
    }
}

impl Error for RouterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RouterError::Bind(e) | RouterError::Serve(e) => Some(e),
            _ => None,
        }
    }
}

pub fn parse_origin(origin: &str) -> Result<Url, RouterError> {
    let url = Url::parse(origin).map_err(|e| RouterError::InvalidOrigin(format!("'{}': {}", origin, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RouterError::InvalidOrigin(format!("'{}': unsupported scheme {}", origin, other))),
    }
}

/// Where a request for `path` should go, or `None` when it is not a chat request.
///
/// The path replaces whatever path the origin carries; the raw query string
/// is carried over as-is.
pub fn rewrite_target(origin: &Url, path: &str, query: Option<&str>) -> Option<Url> {
    if !path.starts_with(CHAT_PREFIX) {
        return None;
    }
    let mut target = origin.clone();
    target.set_path(path);
    target.set_query(query.filter(|q| !q.is_empty()));
    target.set_fragment(None);
    Some(target)
}

#[derive(Clone)]
pub struct RouterState {
    origin: Url,
    http: reqwest::Client,
}

impl RouterState {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            http: reqwest::Client::new(),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

pub fn build_router(state: RouterState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state, rewrite_chat))
        .layer(cors)
}

pub async fn serve(addr: &str, origin: &str) -> Result<(), RouterError> {
    let origin = parse_origin(origin)?;
    let addr = addr.parse::<SocketAddr>().map_err(|_| RouterError::InvalidAddr(addr.to_string()))?;
    let listener = TcpListener::bind(addr).await.map_err(RouterError::Bind)?;
    serve_listener(listener, RouterState::new(origin)).await
}

pub async fn serve_listener(listener: TcpListener, state: RouterState) -> Result<(), RouterError> {
    let local = listener.local_addr().map_err(RouterError::Bind)?;
    info!("Chat router listening on http://{}, forwarding {}* to {}", local, CHAT_PREFIX, state.origin);
    let app = build_router(state);
    axum::serve(listener, app.into_make_service()).await.map_err(RouterError::Serve)
}

async fn rewrite_chat(State(state): State<RouterState>, req: Request, next: Next) -> Response {
    let Some(target) = rewrite_target(&state.origin, req.uri().path(), req.uri().query()) else {
        return next.run(req).await;
    };

    debug!("{} {} -> {}", req.method(), req.uri(), target);
    let (parts, body) = req.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Rejected request body for {}: {}", parts.uri, e);
            let body = ErrorResponse {
                error: Some(format!("Request body exceeds {} bytes", MAX_BODY_BYTES)),
            };
            return (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response();
        }
    };

    match forward(&state.http, target, parts, body).await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Upstream request failed: {}", e);
            let body = ErrorResponse { error: Some(format!("Backend unavailable: {}", e)) };
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}

async fn forward(
    http: &reqwest::Client,
    target: Url,
    parts: Parts,
    body: Bytes
) -> Result<Response, reqwest::Error> {
    // The client sets these for the outgoing connection.
    let mut headers = parts.headers;
    strip_connection_headers(&mut headers);
    headers.remove(header::HOST);

    let upstream = http
        .request(parts.method, target)
        .headers(headers)
        .body(body)
        .send().await?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_connection_headers(&mut headers);
    let bytes = upstream.bytes().await?;

    let mut resp = (status, bytes).into_response();
    resp.headers_mut().extend(headers);
    Ok(resp)
}

fn strip_connection_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONNECTION);
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove(header::CONTENT_LENGTH);
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: Some("Not found".into()) }))
}
