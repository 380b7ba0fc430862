use crate::access::AccessGate;
use crate::errors::RelayError;
use crate::metrics_defs::{ACCESS_REJECTED, REQUEST_DURATION};
use crate::protocol::{
    CustomerId, ErrorResponse, WishlistReadResponse, WishlistWriteRequest, WishlistWriteResponse,
};
use crate::wishlist::Wishlists;
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use shared::http::{empty_body, full_body, make_json_response};
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

pub const HEALTH_PATH: &str = "/";
pub const WISHLIST_PATH: &str = "/apps/wishlist-sync";
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const READ_FAILED: &str = "Failed to read metafields";
const WRITE_FAILED: &str = "Failed to update metafield";

pub type RelayBody = BoxBody<Bytes, RelayError>;

struct RelayInner {
    gate: AccessGate,
    wishlists: Wishlists,
}

/// Serves the health probe and the wishlist route.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(gate: AccessGate, wishlists: Wishlists) -> Self {
        Self {
            inner: Arc::new(RelayInner { gate, wishlists }),
        }
    }

    /// Every failure is turned into a response here; nothing is returned as
    /// a service error.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<RelayBody>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();
        let path = req.uri().path().to_string();

        let (route, response) = match path.as_str() {
            HEALTH_PATH => ("health", self.health(&req)),
            WISHLIST_PATH => ("wishlist", self.wishlist(req).await),
            _ => {
                tracing::debug!(method = %req.method(), path = %path, "No route matched");
                (
                    "unknown",
                    error_response(StatusCode::NOT_FOUND, "Not found".to_string()),
                )
            }
        };

        histogram!(
            REQUEST_DURATION,
            "route" => route,
            "status" => response.status().as_str().to_string()
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    fn health<B>(&self, req: &Request<B>) -> Response<RelayBody> {
        if req.method() != Method::GET {
            return method_not_allowed("GET");
        }

        let mut response = Response::new(full_body("Wishlist Sync Running\n"));
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    async fn wishlist<B>(&self, req: Request<B>) -> Response<RelayBody>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let gate = &self.inner.gate;

        let origin = match gate.check_origin(req.headers()) {
            Ok(origin) => origin,
            Err(e) => return reject(e),
        };

        let method = req.method().clone();
        let preflight = method == Method::OPTIONS;
        let result = match method {
            Method::OPTIONS => Ok(preflight_response()),
            Method::GET => self.read(req).await.map_err(|e| (e, READ_FAILED)),
            Method::POST => self.write(req).await.map_err(|e| (e, WRITE_FAILED)),
            _ => Ok(method_not_allowed("GET, POST, OPTIONS")),
        };

        let mut response = result.unwrap_or_else(|(e, upstream_message)| match e {
            RelayError::InvalidSecret => reject(e),
            e => relay_error_response(e, upstream_message),
        });
        gate.apply_cors_headers(response.headers_mut(), origin.as_ref(), preflight);
        response
    }

    async fn read<B>(&self, req: Request<B>) -> Result<Response<RelayBody>, RelayError> {
        self.inner.gate.check_secret(req.headers())?;

        let query = req.uri().query().unwrap_or_default();
        let customer_id = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "customer_id")
            .map(|(_, value)| value.into_owned());
        let customer = CustomerId::parse(customer_id.as_deref())?;

        let product_ids = self.inner.wishlists.read(&customer).await?;
        Ok(make_json_response(
            StatusCode::OK,
            &WishlistReadResponse { product_ids },
        ))
    }

    async fn write<B>(&self, req: Request<B>) -> Result<Response<RelayBody>, RelayError>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.inner.gate.check_secret(req.headers())?;

        let bytes = Limited::new(req.into_body(), MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    RelayError::BodyTooLarge(MAX_BODY_BYTES)
                } else {
                    RelayError::InvalidBody(e.to_string())
                }
            })?
            .to_bytes();

        // An empty body reads like an empty object
        let value: Value = if bytes.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(&bytes).map_err(|e| RelayError::InvalidBody(e.to_string()))?
        };
        if !value.is_object() {
            return Err(RelayError::InvalidBody("expected a JSON object".to_string()));
        }
        let request: WishlistWriteRequest =
            serde_json::from_value(value).map_err(|e| RelayError::InvalidBody(e.to_string()))?;

        let customer = CustomerId::from_json(request.customer_id.as_ref())?;
        let product_ids = request.product_ids.unwrap_or_default();

        self.inner.wishlists.replace(&customer, &product_ids).await?;
        Ok(make_json_response(
            StatusCode::OK,
            &WishlistWriteResponse { success: true },
        ))
    }
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<RelayBody>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

fn preflight_response() -> Response<RelayBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

fn error_response(status: StatusCode, message: String) -> Response<RelayBody> {
    make_json_response(status, &ErrorResponse { error: message })
}

fn method_not_allowed(allow: &'static str) -> Response<RelayBody> {
    let mut response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method not allowed".to_string(),
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

fn reject(e: RelayError) -> Response<RelayBody> {
    let reason = match &e {
        RelayError::OriginNotAllowed(_) => "origin",
        _ => "secret",
    };
    tracing::warn!(error = %e, "Rejected wishlist request");
    counter!(ACCESS_REJECTED, "reason" => reason).increment(1);
    error_response(e.status_code(), e.public_message(""))
}

fn relay_error_response(e: RelayError, upstream_message: &'static str) -> Response<RelayBody> {
    if e.is_upstream() {
        tracing::error!(error = %e, "{upstream_message}");
    } else if e.status_code().is_server_error() {
        tracing::error!(error = %e, "Wishlist request failed");
    } else {
        tracing::debug!(error = %e, "Invalid wishlist request");
    }
    error_response(e.status_code(), e.public_message(upstream_message))
}
