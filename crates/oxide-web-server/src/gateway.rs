//! Bridges hyper connections to the synchronous application.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Bytes, Frame, Incoming};
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use oxide_web::{App, Body, Environ, GatewayResponse};

/// Body of responses handed to hyper.
pub type ResponseBody = BoxBody<Bytes, io::Error>;

/// Chunks buffered between the file reader and the connection.
const STREAM_BUFFER: usize = 4;

/// Builds the gateway environment for a request whose body has been read.
pub fn environ(parts: &Parts, body: Vec<u8>, remote: SocketAddr) -> Environ {
    let mut environ = Environ::new(parts.method.as_str(), parts.uri.path())
        .query(parts.uri.query().unwrap_or(""))
        .remote_addr(remote.ip().to_string())
        .var("SERVER_PROTOCOL", format!("{:?}", parts.version));

    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => environ = environ.header(name.as_str(), value),
            Err(_) => debug!(header = %name, "Skipping non-ASCII header"),
        }
    }

    if body.is_empty() {
        environ
    } else {
        environ.body(body)
    }
}

/// Converts the application's answer into a hyper response.
///
/// Headers hyper rejects are dropped with a warning. Status lines with an
/// unparsable code become 500.
pub fn into_hyper(
    status: &str,
    headers: Vec<(String, String)>,
    body: ResponseBody,
) -> HyperResponse<ResponseBody> {
    let code = status
        .get(..3)
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = HyperResponse::new(body);
    *response.status_mut() = code;
    for (name, value) in &headers {
        let (Ok(header), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) else {
            warn!(header = %name, "Dropping invalid response header");
            continue;
        };
        response.headers_mut().append(header, value);
    }
    response
}

fn full(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

/// Converts an engine body into a hyper body.
///
/// Buffered bodies are sent as one frame. File bodies are read on the
/// blocking pool and forwarded one chunk per frame.
pub fn response_body(body: Body) -> ResponseBody {
    match body {
        Body::Bytes(bytes) => full(bytes),
        body @ Body::File(_) => {
            let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(STREAM_BUFFER);
            tokio::task::spawn_blocking(move || {
                for chunk in body.chunks() {
                    let failed = chunk.is_err();
                    if let Err(err) = &chunk {
                        warn!(error = %err, "Failed to read file body");
                    }
                    if tx.blocking_send(chunk.map(Bytes::from)).is_err() || failed {
                        break;
                    }
                }
            });
            let frames = ReceiverStream::new(rx).map(|chunk| chunk.map(Frame::data));
            BodyExt::boxed(StreamBody::new(frames))
        }
    }
}

fn failure(status: StatusCode) -> HyperResponse<ResponseBody> {
    let mut response = HyperResponse::new(full(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Serves one hyper request with `app`.
///
/// The application runs on the blocking pool. File bodies are streamed
/// from there after the headers are sent.
pub async fn handle_request(
    req: HyperRequest<Incoming>,
    app: Arc<App>,
    remote: SocketAddr,
) -> Result<HyperResponse<ResponseBody>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(error = %err, "Failed to read request body");
            return Ok(failure(StatusCode::BAD_REQUEST));
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let environ = environ(&parts, body.to_vec(), remote);

    let outcome = tokio::task::spawn_blocking(move || app.call(environ)).await;

    let response = match outcome {
        Ok(GatewayResponse {
            status,
            headers,
            body,
        }) => {
            info!(
                %method,
                %path,
                %status,
                elapsed_ms = started.elapsed().as_millis(),
                "Request served"
            );
            into_hyper(&status, headers, response_body(body))
        }
        Err(err) => {
            error!(%method, %path, error = %err, "Dispatch task failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    Ok(response)
}

/// Periodically drops idle sessions.
pub async fn sweep_sessions(app: Arc<App>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;
    loop {
        interval.tick().await;
        let removed = app.sessions().clear_expired();
        if removed > 0 {
            info!(removed, remaining = app.sessions().len(), "Expired sessions cleared");
        }
    }
}
