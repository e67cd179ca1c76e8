//! Remote link fetcher.
//!
//! A zap link is an HTTP(S) URL whose host has advertised support for the
//! text ZapScript format via `GET /.well-known/zaparoo`. Host capability is
//! cached persistently; script bodies are cached for offline fallback.
//!
//! Status-code semantics of the well-known probe are load-bearing: a 404 is
//! a definitive "not supported" and is persisted as version 0, while 5xx
//! responses and offline-class network errors are never persisted, so a
//! temporary outage cannot poison the host table.

use std::time::Duration;

use futures::{stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use url::Url;

use crate::database_ops::{db::Db, zaplink as store};
use crate::error::{ZapError, ZapResult};

/// MIME type of the text ZapScript format, sent as `Accept` on every remote
/// request and required in the response `Content-Type`.
pub const MIME_ZAPSCRIPT: &str = "application/vnd.zaparoo.zapscript";
/// Host capability endpoint.
pub const WELL_KNOWN_PATH: &str = "/.well-known/zaparoo";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const PREWARM_TIMEOUT: Duration = Duration::from_secs(2);
const PREWARM_CONCURRENCY: usize = 5;

/// Error text fragments classified as offline, beyond reqwest's own timeout
/// and connect classifications.
const OFFLINE_MARKERS: &[&str] = &[
    "no such host",
    "network is unreachable",
    "connection refused",
    "host is down",
    "i/o timeout",
    "tls handshake timeout",
];

#[derive(Debug, Deserialize)]
struct WellKnownBody {
    zapscript: i64,
}

fn ident_headers(req: reqwest::RequestBuilder, platform_id: &str) -> reqwest::RequestBuilder {
    req.header("Zaparoo-OS", std::env::consts::OS)
        .header("Zaparoo-Arch", std::env::consts::ARCH)
        .header("Zaparoo-Platform", platform_id)
}

/// Is this failure an offline-class error (as opposed to a server actively
/// misbehaving)? Timeouts and connect failures qualify, as does any error in
/// the chain whose text matches a known offline marker.
pub fn is_offline_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    let mut text = err.to_string().to_ascii_lowercase();
    let mut source = std::error::Error::source(err);
    while let Some(src) = source {
        text.push_str(&src.to_string().to_ascii_lowercase());
        source = src.source();
    }
    OFFLINE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Normalized host key: `scheme://host`, lower-case, port kept only when
/// non-default. None for non-HTTP(S) or unparseable URLs.
pub fn host_key(raw_url: &str) -> Option<String> {
    let url = Url::parse(raw_url).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;
    Some(url.origin().ascii_serialization())
}

/// Is this URL on a host that supports zap links?
///
/// Consults the persistent host table first; on a miss, probes the
/// well-known endpoint and persists definitive answers only.
pub async fn is_zap_link(db: &Db, client: &Client, platform_id: &str, raw_url: &str) -> bool {
    let Some(key) = host_key(raw_url) else {
        return false;
    };

    match store::zaplink_host(db, &key).await {
        Ok(Some(version)) => return version > 0,
        Ok(None) => {}
        Err(err) => warn!(error = %err, host = %key, "zap-link host lookup failed; probing"),
    }

    probe_well_known(db, client, platform_id, &key).await
}

async fn probe_well_known(db: &Db, client: &Client, platform_id: &str, key: &str) -> bool {
    let probe_url = format!("{key}{WELL_KNOWN_PATH}");
    let result = ident_headers(
        client
            .get(&probe_url)
            .timeout(FETCH_TIMEOUT)
            .header(ACCEPT, MIME_ZAPSCRIPT),
        platform_id,
    )
    .send()
    .await;

    match result {
        Ok(resp) if resp.status() == StatusCode::OK => match resp.json::<WellKnownBody>().await {
            Ok(body) => {
                if let Err(err) = store::update_zaplink_host(db, key, body.zapscript).await {
                    warn!(error = %err, host = %key, "zap-link host write failed");
                }
                debug!(host = %key, version = body.zapscript, "zap-link host probed");
                body.zapscript > 0
            }
            Err(err) => {
                // A broken body is treated like a transient server fault:
                // answer "not supported this call", persist nothing.
                warn!(error = %err, host = %key, "malformed well-known body");
                false
            }
        },
        Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
            if let Err(err) = store::update_zaplink_host(db, key, 0).await {
                warn!(error = %err, host = %key, "zap-link host write failed");
            }
            false
        }
        Ok(resp) => {
            debug!(host = %key, status = %resp.status(), "well-known probe unexpected status; not persisting");
            false
        }
        Err(err) if is_offline_error(&err) => {
            debug!(host = %key, error = %err, "well-known probe offline; not persisting");
            false
        }
        Err(err) => {
            warn!(host = %key, error = %err, "well-known probe failed; recording host as unsupported");
            if let Err(err) = store::update_zaplink_host(db, key, 0).await {
                warn!(error = %err, host = %key, "zap-link host write failed");
            }
            false
        }
    }
}

/// Fetch failure classification consumed by the offline-fallback logic.
#[derive(Debug)]
pub enum FetchError {
    Net(reqwest::Error),
    Status(StatusCode),
    ContentType(String),
}

/// GET a remote script body. The response must carry the ZapScript MIME in
/// its `Content-Type`.
pub async fn fetch_remote_zapscript(
    client: &Client,
    platform_id: &str,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let resp = ident_headers(
        client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .header(ACCEPT, MIME_ZAPSCRIPT),
        platform_id,
    )
    .send()
    .await
    .map_err(FetchError::Net)?;

    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status()));
    }
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains(MIME_ZAPSCRIPT) {
        return Err(FetchError::ContentType(content_type));
    }

    resp.bytes().await.map(|b| b.to_vec()).map_err(FetchError::Net)
}

/// Resolve a command argument that may be a zap link.
///
/// Returns `Ok(None)` when the argument is not a zap link. On a fetch
/// failure classified as offline, the persistent body cache stands in;
/// successful fetches refresh it. JSON bodies are rejected — only the text
/// ZapScript format is evaluated at this tier.
pub async fn check_zap_link(
    db: &Db,
    client: &Client,
    platform_id: &str,
    arg: &str,
) -> ZapResult<Option<String>> {
    if !is_zap_link(db, client, platform_id, arg).await {
        return Ok(None);
    }

    let body = match fetch_remote_zapscript(client, platform_id, arg).await {
        Ok(body) => {
            if let Err(err) = store::update_zaplink_cache(db, arg, &body).await {
                warn!(error = %err, url = %arg, "zap-link cache write failed");
            }
            body
        }
        Err(FetchError::Net(err)) if is_offline_error(&err) => {
            match store::zaplink_cache(db, arg).await {
                Ok(Some(cached)) => {
                    info!(url = %arg, "offline; using cached zap-link script");
                    cached
                }
                _ => return Err(ZapError::RemoteFetchFailed(err.to_string())),
            }
        }
        Err(FetchError::Net(err)) => return Err(ZapError::RemoteFetchFailed(err.to_string())),
        Err(FetchError::Status(status)) => {
            return Err(ZapError::RemoteFetchFailed(format!("status {status}")))
        }
        Err(FetchError::ContentType(ct)) => return Err(ZapError::ContentTypeInvalid(ct)),
    };

    let text = String::from_utf8(body)
        .map_err(|_| ZapError::RemoteFetchFailed("body is not valid utf-8".into()))?;
    if matches!(text.trim_start().chars().next(), Some('{') | Some('[')) {
        return Err(ZapError::JsonNotSupported);
    }
    Ok(Some(text))
}

/// Pre-warm known zap-link hosts at startup.
///
/// Silent best-effort: a failed connectivity probe skips the whole pass,
/// individual host failures are ignored, successes refresh the probe
/// timestamp. The caller runs this at most once per startup.
pub async fn prewarm(db: &Db, client: &Client, platform_id: &str, probe_addr: &str) {
    match tokio::time::timeout(PREWARM_TIMEOUT, TcpStream::connect(probe_addr)).await {
        Ok(Ok(_)) => {}
        _ => {
            debug!(probe = %probe_addr, "connectivity probe failed; skipping zap-link pre-warm");
            return;
        }
    }

    let hosts = match store::supported_zaplink_hosts(db).await {
        Ok(hosts) => hosts,
        Err(err) => {
            warn!(error = %err, "could not list zap-link hosts for pre-warm");
            return;
        }
    };
    if hosts.is_empty() {
        return;
    }
    info!(hosts = hosts.len(), "pre-warming zap-link hosts");

    stream::iter(hosts)
        .map(|host| {
            let client = client.clone();
            let db = db.clone();
            let platform_id = platform_id.to_string();
            async move {
                let url = format!("{host}{WELL_KNOWN_PATH}");
                let result = ident_headers(
                    client
                        .head(&url)
                        .timeout(PREWARM_TIMEOUT)
                        .header(ACCEPT, MIME_ZAPSCRIPT),
                    &platform_id,
                )
                .send()
                .await;
                if let Ok(resp) = result {
                    if resp.status().is_success() {
                        let _ = store::touch_zaplink_host(&db, &host).await;
                    }
                }
            }
        })
        .buffer_unordered(PREWARM_CONCURRENCY)
        .collect::<Vec<()>>()
        .await;
}
