//! tiny_http ⇄ middleware request/response conversion.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::middleware::{AssetRequest, AssetResponse, Method};

pub fn to_asset_request(request: &Request) -> AssetRequest {
    let method = Method::parse(request.method().as_str());
    request
        .headers()
        .iter()
        .fold(AssetRequest::new(method, request.url()), |req, h| {
            req.with_header(h.field.as_str().as_str(), h.value.as_str())
        })
}

/// Send `response`. For HEAD, tiny_http takes the length from the
/// `Content-Length` header and skips the body.
pub fn send(request: Request, response: AssetResponse) -> Result<()> {
    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .collect();
    let length = response.body.len();
    let body: Cursor<Arc<[u8]>> = Cursor::new(response.body);

    request.respond(Response::new(
        StatusCode(response.status),
        headers,
        body,
        Some(length),
        None,
    ))?;
    Ok(())
}
