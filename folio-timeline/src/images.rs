//! Image auto-detection for project folders
//!
//! Probes `{base}/{year}/{slug}/{slug}_{n}.webp` for `n = 1..=limit` with a
//! `Range` request for the first kilobyte. Probing stops at the first miss,
//! so numbering is assumed to start at 1 and have no gaps.
//!
//! Development servers often answer missing static files with an HTML page
//! and status 200, so acceptance requires an image content type and, for
//! partial responses, a known file signature in the leading bytes.

use folio_common::LoaderSettings;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

/// Content types an image probe may declare
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/webp", "image/jpeg", "image/png", "image/gif"];

/// Extension used for probed filenames
pub const PROBE_EXTENSION: &str = "webp";

/// Bytes needed to tell every supported signature apart
const SIGNATURE_LEN: usize = 12;

/// Recognised magic numbers: RIFF....WEBP, JPEG SOI, PNG
pub fn has_image_signature(bytes: &[u8]) -> bool {
    let webp = bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP";
    let jpeg = bytes.starts_with(&[0xFF, 0xD8]);
    let png = bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]);
    webp || jpeg || png
}

/// Media type without parameters, lowercased
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Decide whether a probe response is a real image.
///
/// - status must be 200 or 206
/// - content type must be one of [`ACCEPTED_CONTENT_TYPES`]
/// - a 206 body must start with a known signature
pub fn looks_like_image(status: u16, content_type: Option<&str>, bytes: &[u8]) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    if !ACCEPTED_CONTENT_TYPES.contains(&essence(content_type).as_str()) {
        return false;
    }

    match status {
        200 => true,
        206 => has_image_signature(bytes),
        _ => false,
    }
}

/// URL of the `n`th candidate image for a project
pub fn candidate_url(base_url: &str, year: i32, slug: &str, n: u32) -> String {
    format!(
        "{}/{}/{}/{}_{}.{}",
        base_url, year, slug, slug, n, PROBE_EXTENSION
    )
}

/// Probe one URL. Network errors and non-images both count as a miss.
pub async fn probe_image(client: &Client, url: &str, settings: &LoaderSettings) -> bool {
    let last_byte = settings.image_probe_bytes.max(1) - 1;

    let mut response = match client
        .get(url)
        .header(RANGE, format!("bytes=0-{}", last_byte))
        .timeout(Duration::from_millis(settings.request_timeout_ms))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            debug!(url, error = %e, "Image probe request failed");
            return false;
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut prefix = Vec::with_capacity(SIGNATURE_LEN);
    if status == StatusCode::PARTIAL_CONTENT {
        while prefix.len() < SIGNATURE_LEN {
            match response.chunk().await {
                Ok(Some(chunk)) => prefix.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    debug!(url, error = %e, "Image probe body read failed");
                    return false;
                }
            }
        }
    }

    let accepted = looks_like_image(status.as_u16(), content_type.as_deref(), &prefix);
    debug!(
        url,
        status = status.as_u16(),
        content_type = content_type.as_deref().unwrap_or("none"),
        accepted,
        "Image probe"
    );
    accepted
}

/// Probe sequential filenames until the first miss or the probe limit.
///
/// Never fails; returns whatever was found before stopping.
pub async fn auto_detect_images(
    client: &Client,
    settings: &LoaderSettings,
    year: i32,
    slug: &str,
) -> Vec<String> {
    let mut found = Vec::new();

    for n in 1..=settings.image_probe_limit {
        let url = candidate_url(&settings.base_url, year, slug, n);
        if !probe_image(client, &url, settings).await {
            break;
        }
        found.push(url);
    }

    info!(year, slug, count = found.len(), "Image auto-detection complete");
    found
}
