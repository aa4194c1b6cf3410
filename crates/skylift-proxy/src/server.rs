//! Edge proxy HTTP server.
//!
//! One hyper HTTP/1.1 server, a task per connection, a stateless
//! forward per request. Upstream responses — including 404s for
//! objects that were never published — pass through untouched; the
//! proxy synthesizes nothing beyond 400 (unroutable host) and 502
//! (storage unreachable).

use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::ProxyError;
use crate::resolve::{project_from_host, upstream_url};

/// Headers that describe the client↔proxy hop and must not be
/// forwarded (RFC 9110 §7.6.1).
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Subdomain-resolving reverse proxy in front of object storage.
pub struct EdgeProxy {
    bind_addr: SocketAddr,
    /// Storage origin plus base path, e.g.
    /// `https://sites.example.net/__outputs`.
    base: String,
    client: reqwest::Client,
}

impl EdgeProxy {
    pub fn new(bind_addr: SocketAddr, base: impl Into<String>) -> Self {
        Self {
            bind_addr,
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Serve until the shutdown signal flips.
    ///
    /// Spawns a tokio task per connection using HTTP/1.1, mirroring
    /// how requests are independent: no state is shared between them.
    pub async fn serve(self, shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already-bound listener (lets tests bind port 0).
    pub async fn serve_on(
        self,
        listener: TcpListener,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!(addr = %listener.local_addr()?, base = %self.base, "edge proxy listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer_addr) = accept_result?;
                    let client = self.client.clone();
                    let base = self.base.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req: Request<Incoming>| {
                            let client = client.clone();
                            let base = base.clone();
                            async move {
                                Ok::<_, hyper::Error>(forward(&client, &base, req).await)
                            }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                            error!(%peer_addr, error = %e, "connection error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("edge proxy shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Resolve and forward a single request, mapping errors to the two
/// statuses the proxy synthesizes itself.
///
/// Generic over the body type so tests can drive it with `Full<Bytes>`
/// instead of a live hyper connection.
pub async fn forward<B>(client: &reqwest::Client, base: &str, req: Request<B>) -> Response<Full<Bytes>>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    match try_forward(client, base, req).await {
        Ok(resp) => resp,
        Err(e @ ProxyError::BadHost { .. }) => {
            debug!(error = %e, "unroutable host");
            plain_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e @ ProxyError::Upstream(_)) => {
            warn!(error = %e, "upstream failure");
            plain_response(StatusCode::BAD_GATEWAY, "upstream unreachable")
        }
    }
}

async fn try_forward<B>(
    client: &reqwest::Client,
    base: &str,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, ProxyError>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    // http/1.1 carries the authority in the Host header.
    let host = match req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
    {
        Some(host) => host.to_string(),
        None => {
            return Err(ProxyError::BadHost {
                host: String::new(),
                reason: "missing Host header".to_string(),
            });
        }
    };

    let project = project_from_host(&host)?;

    let url = upstream_url(base, &project, req.uri().path(), req.uri().query());

    let method = req.method().clone();
    let mut headers = req.headers().clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    // Change-origin semantics: the upstream sees its own host, and
    // reqwest recomputes the content length for the collected body.
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return Ok(plain_response(
                StatusCode::BAD_REQUEST,
                "failed to read request body",
            ));
        }
    };

    debug!(project = %project, %url, "forwarding request");

    let upstream = client
        .request(method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    // Pass status, headers, and body through verbatim.
    let status = upstream.status();
    let mut builder = Response::builder().status(status);
    if let Some(resp_headers) = builder.headers_mut() {
        for (name, value) in upstream.headers() {
            if !HOP_BY_HOP.contains(name) {
                resp_headers.append(name.clone(), value.clone());
            }
        }
        resp_headers.remove(header::CONTENT_LENGTH);
    }

    let bytes = upstream.bytes().await?;

    Ok(builder
        .body(Full::new(bytes))
        .unwrap_or_else(|_| plain_response(StatusCode::BAD_GATEWAY, "invalid upstream response")))
}

fn plain_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(message.to_string())));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}
