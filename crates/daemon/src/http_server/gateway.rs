//! Gateway handlers: HEAD availability probe, sniff-then-stream GET,
//! streaming POST.

use std::io;

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use tokio::io::AsyncReadExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::warn;

use store::{BoxReader, StoreError};

use super::sniff;
use super::ServiceState;

/// Fixed multipart field carrying the uploaded content.
const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("bad request")]
    BadRequest,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::BadRequest => StatusCode::BAD_REQUEST,
            GatewayError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            GatewayError::Store(StoreError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            GatewayError::Multipart(_) => StatusCode::BAD_REQUEST,
            GatewayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("Error: {}", self)).into_response()
    }
}

/// The wildcard remainder is the key; an empty remainder carries none.
fn require_key(path: &str) -> Result<&[u8], GatewayError> {
    let key = path.trim_start_matches('/');
    if key.is_empty() {
        return Err(GatewayError::BadRequest);
    }
    Ok(key.as_bytes())
}

/// HEAD: availability probe.
///
/// Responds OK when the key is absent and NotFound when it is present.
/// The inversion is intentional and load-bearing: callers use it as an
/// "is this slot free to write" check.
pub async fn handle_check(
    State(state): State<ServiceState>,
    Path(path): Path<String>,
) -> Result<Response, GatewayError> {
    let key = require_key(&path)?;

    let status = if !state.handle().store().has(key).await {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };

    let mut response = status.into_response();
    if let Some(meta) = state.handle().meta() {
        if let Ok(info) = meta.stat(key).await {
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from(info.size()));
        }
    }
    Ok(response)
}

/// GET: sniff a fixed prefix, then stream the remainder.
pub async fn handle_get(
    State(state): State<ServiceState>,
    Path(path): Path<String>,
) -> Result<Response, GatewayError> {
    let key = require_key(&path)?;

    let mut headers = HeaderMap::new();
    if let Some(meta) = state.handle().meta() {
        match meta.stat(key).await {
            Ok(info) => {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(info.size()));
                if let Some(hash) = info.hash() {
                    let etag = format!("\"{}\"", hex::encode(hash));
                    if let Ok(value) = HeaderValue::from_str(&etag) {
                        headers.insert(header::ETAG, value);
                    }
                }
            }
            Err(StoreError::NotFound) => return Err(StoreError::NotFound.into()),
            // Blob without a record still serves; the gap is logged,
            // not fatal.
            Err(StoreError::MetadataMissing) => {
                warn!(key = %String::from_utf8_lossy(key), "metadata missing for stored blob");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let mut reader = state.handle().store().get(key).await?;
    let (prefix, complete) = read_prefix(&mut reader).await.map_err(StoreError::from)?;

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(sniff::detect(&prefix)),
    );
    if let Some(max_age) = state.max_age() {
        let cache = format!("max-age={max_age}");
        if let Ok(value) = HeaderValue::from_str(&cache) {
            headers.insert(header::CACHE_CONTROL, value);
        }
    }

    // The sniffed prefix goes out first; a short object was consumed
    // entirely by the sniff, anything longer streams from the reader
    // without further buffering.
    let body = if complete {
        Body::from(prefix)
    } else {
        Body::from_stream(ReaderStream::new(std::io::Cursor::new(prefix).chain(reader)))
    };

    Ok((StatusCode::OK, headers, body).into_response())
}

/// POST: multipart `file` field or raw body, streamed into the store.
pub async fn handle_set(
    State(state): State<ServiceState>,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, GatewayError> {
    let key = require_key(&path)?;

    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| GatewayError::BadRequest)?;
        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let reader = StreamReader::new(field.map_err(io::Error::other));
            state.handle().store().set(key, Box::pin(reader)).await?;
            return Ok(StatusCode::OK.into_response());
        }
        Err(GatewayError::BadRequest)
    } else {
        let stream = request.into_body().into_data_stream().map_err(io::Error::other);
        let reader = StreamReader::new(stream);
        state.handle().store().set(key, Box::pin(reader)).await?;
        Ok(StatusCode::OK.into_response())
    }
}

/// Read up to [`sniff::SNIFF_LEN`] bytes; the bool reports whether the
/// stream was exhausted within the prefix.
async fn read_prefix(reader: &mut BoxReader<'_>) -> io::Result<(Vec<u8>, bool)> {
    let mut prefix = vec![0u8; sniff::SNIFF_LEN];
    let mut filled = 0;
    while filled < sniff::SNIFF_LEN {
        let n = reader.read(&mut prefix[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let complete = filled < sniff::SNIFF_LEN;
    prefix.truncate(filled);
    Ok((prefix, complete))
}
