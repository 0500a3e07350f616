//! Content Acquirer — fetches disclosure documents over HTTP(S) with SSRF
//! protection, size limits, and MIME-aware text extraction.
//!
//! Redirects are followed manually (max 5) so every hop passes the same
//! guard: scheme allow-list, hostname checks before resolution, and address
//! checks after DNS resolution.

pub mod extract;

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use reqwest::{header, StatusCode, Url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::{AppError, FetchReason};

const MAX_REDIRECTS: usize = 5;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// MIME classification of fetched content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Html,
    Pdf,
    Text,
}

#[derive(Debug, Clone)]
pub struct AcquiredContent {
    pub text: String,
    pub kind: ContentKind,
    /// Canonicalized URL after redirects, used for fingerprinting.
    pub final_url: String,
}

pub struct Fetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl Fetcher {
    pub fn new(max_bytes: usize, timeout_ms: u64) -> anyhow::Result<Fetcher> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("esglens-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build fetch client")?;
        Ok(Fetcher { client, max_bytes })
    }

    /// Fetch a URL and return cleaned text. Every redirect hop is
    /// re-validated by the SSRF guard before any connection is made to it.
    pub async fn fetch(&self, raw_url: &str) -> Result<AcquiredContent, AppError> {
        let mut url = Url::parse(raw_url)
            .map_err(|_| AppError::Validation(format!("Invalid URL: {raw_url}")))?;

        for hop in 0..=MAX_REDIRECTS {
            validate_url(&url)?;
            check_resolved_addresses(&url).await?;

            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(map_transport_error)?;

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| AppError::Fetch {
                        reason: FetchReason::Upstream5xx,
                        message: "Redirect without Location header".to_string(),
                    })?;
                url = url.join(location).map_err(|_| AppError::Fetch {
                    reason: FetchReason::Disallowed,
                    message: format!("Invalid redirect target: {location}"),
                })?;
                debug!(hop, target = %url, "Following redirect");
                continue;
            }

            return self.read_response(url, response).await;
        }

        Err(AppError::Fetch {
            reason: FetchReason::Upstream5xx,
            message: format!("More than {MAX_REDIRECTS} redirects"),
        })
    }

    async fn read_response(
        &self,
        url: Url,
        mut response: reqwest::Response,
    ) -> Result<AcquiredContent, AppError> {
        let status = response.status();
        if status.is_client_error() {
            return Err(upstream_error(status, FetchReason::Upstream4xx));
        }
        if status.is_server_error() {
            return Err(upstream_error(status, FetchReason::Upstream5xx));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(too_large(self.max_bytes));
            }
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase());

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_transport_error)? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        let kind = classify(content_type.as_deref(), &body);
        let raw_text = match kind {
            ContentKind::Pdf => {
                extract::pdf_to_text(&body).map_err(AppError::Unprocessable)?
            }
            ContentKind::Html => {
                extract::html_to_text(&String::from_utf8_lossy(&body))
            }
            ContentKind::Text => String::from_utf8_lossy(&body).into_owned(),
        };

        let text = extract::clean_text(&raw_text);
        if text.trim().is_empty() {
            return Err(AppError::Unprocessable(
                "Document contained no extractable text".to_string(),
            ));
        }

        Ok(AcquiredContent {
            text,
            kind,
            final_url: canonicalize_url(&url),
        })
    }
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::Fetch {
        reason: FetchReason::TooLarge,
        message: format!("Response body exceeds {max_bytes} bytes"),
    }
}

fn upstream_error(status: StatusCode, reason: FetchReason) -> AppError {
    AppError::Fetch {
        reason,
        message: format!("Upstream returned {status}"),
    }
}

fn map_transport_error(e: reqwest::Error) -> AppError {
    let reason = if e.is_timeout() {
        FetchReason::Timeout
    } else {
        FetchReason::Upstream5xx
    };
    AppError::Fetch {
        reason,
        message: format!("Fetch failed: {e}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SSRF guard
// ────────────────────────────────────────────────────────────────────────────

/// Scheme and hostname checks that run before any DNS resolution.
pub fn validate_url(url: &Url) -> Result<(), AppError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Fetch {
            reason: FetchReason::Disallowed,
            message: format!("Scheme '{}' is not allowed", url.scheme()),
        });
    }

    match url.host() {
        None => Err(AppError::Fetch {
            reason: FetchReason::Disallowed,
            message: "URL has no host".to_string(),
        }),
        Some(url::Host::Domain(domain)) => {
            let domain = domain.to_lowercase();
            if domain == "localhost"
                || domain.ends_with(".localhost")
                || domain == "metadata.google.internal"
            {
                return Err(disallowed_host(&domain));
            }
            Ok(())
        }
        Some(url::Host::Ipv4(ip)) => {
            if is_disallowed_ip(IpAddr::V4(ip)) {
                return Err(disallowed_host(&ip.to_string()));
            }
            Ok(())
        }
        Some(url::Host::Ipv6(ip)) => {
            if is_disallowed_ip(IpAddr::V6(ip)) {
                return Err(disallowed_host(&ip.to_string()));
            }
            Ok(())
        }
    }
}

fn disallowed_host(host: &str) -> AppError {
    AppError::Fetch {
        reason: FetchReason::Disallowed,
        message: format!("Host '{host}' is not allowed"),
    }
}

/// Resolve the host and reject if any returned address is private,
/// loopback, link-local, or otherwise reserved.
async fn check_resolved_addresses(url: &Url) -> Result<(), AppError> {
    // Literal IPs were already checked pre-resolution.
    let host = match url.host() {
        Some(url::Host::Domain(d)) => d.to_string(),
        _ => return Ok(()),
    };
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| AppError::Fetch {
            reason: FetchReason::Upstream5xx,
            message: format!("DNS resolution failed for {host}: {e}"),
        })?;

    for addr in addrs {
        if is_disallowed_ip(addr.ip()) {
            return Err(AppError::Fetch {
                reason: FetchReason::Disallowed,
                message: format!("Host '{host}' resolves to a disallowed address"),
            });
        }
    }
    Ok(())
}

/// Address classes the fetcher refuses to contact.
pub fn is_disallowed_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // Carrier-grade NAT 100.64.0.0/10
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique-local fc00::/7
                || (v6.segments()[0] & 0xFE00) == 0xFC00
                // Link-local fe80::/10
                || (v6.segments()[0] & 0xFFC0) == 0xFE80
                // IPv4-mapped addresses inherit their IPv4 class
                || v6
                    .to_ipv4_mapped()
                    .map(|v4| is_disallowed_ip(IpAddr::V4(v4)))
                    .unwrap_or(false)
        }
    }
}

fn classify(content_type: Option<&str>, body: &[u8]) -> ContentKind {
    match content_type {
        Some("text/html") | Some("application/xhtml+xml") => ContentKind::Html,
        Some("application/pdf") => ContentKind::Pdf,
        Some("text/plain") => ContentKind::Text,
        _ => {
            if body.starts_with(b"%PDF") {
                ContentKind::Pdf
            } else if body.trim_ascii_start().starts_with(b"<") {
                ContentKind::Html
            } else {
                ContentKind::Text
            }
        }
    }
}

/// Canonical form used in fingerprints: scheme+host lowercased, default
/// ports dropped (the `Url` parser already does both), fragment removed.
pub fn canonicalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Fingerprinting
// ────────────────────────────────────────────────────────────────────────────

/// SHA-256 fingerprint over the request's identity: source (canonical URL
/// or text digest), analysis kind, sorted frameworks, industry sector.
pub fn fingerprint(
    source: &str,
    is_text: bool,
    quick_mode: bool,
    frameworks: &[crate::catalog::Framework],
    industry_sector: Option<&str>,
) -> String {
    let source_token = if is_text {
        hex_sha256(source.as_bytes())
    } else {
        source.to_string()
    };

    let mut framework_names: Vec<&str> = frameworks.iter().map(|f| f.as_str()).collect();
    framework_names.sort_unstable();
    framework_names.dedup();

    let kind = if quick_mode { "quick" } else { "full" };
    let material = format!(
        "{source_token}|{kind}|{}|{}",
        framework_names.join(","),
        industry_sector.unwrap_or_default()
    );
    hex_sha256(material.as_bytes())
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
