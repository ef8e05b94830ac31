//! Shared fixtures for folio-timeline integration tests

#![allow(dead_code)]

use folio_common::LoaderSettings;
use folio_timeline::TimelineLoader;
use serde_json::{json, Value};
use wiremock::MockServer;

/// First bytes of a lossy WebP file
pub const WEBP_HEADER: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 \x18\x00\x00\x00";

/// Settings pointing at the mock server with short delays
pub fn test_settings(server: &MockServer) -> LoaderSettings {
    LoaderSettings {
        base_url: format!("{}/timeline", server.uri()),
        retry_delay_ms: 20,
        request_timeout_ms: 2_000,
        ..LoaderSettings::default()
    }
}

pub fn test_loader(server: &MockServer) -> TimelineLoader {
    TimelineLoader::new(test_settings(server)).expect("loader should build")
}

/// `projects.json` body listing the given years and slugs
pub fn index_json(years: &[(i32, &[&str])]) -> Value {
    let total: usize = years.iter().map(|(_, slugs)| slugs.len()).sum();
    json!({
        "timeline": {
            "title": "Archives",
            "description": "Test timeline",
            "lastUpdated": "2024-01-01",
            "totalProjects": total
        },
        "years": years
            .iter()
            .map(|(year, slugs)| json!({ "year": year, "projects": slugs }))
            .collect::<Vec<_>>()
    })
}

/// `project.json` body with a cover, so no image probing happens
pub fn project_json(year: i32, slug: &str) -> Value {
    json!({
        "id": slug,
        "title": format!("Project {}", slug),
        "year": year,
        "type": "PROJECT",
        "size": "small",
        "categories": ["web"],
        "description": "Fixture project",
        "cover": format!("/timeline/{}/{}/cover.webp", year, slug),
        "gallery": []
    })
}

/// `project.json` body without cover or gallery, which triggers probing
pub fn bare_project_json(year: i32, slug: &str) -> Value {
    json!({
        "id": slug,
        "title": format!("Project {}", slug),
        "year": year,
        "description": "Fixture project without images"
    })
}

pub fn index_path() -> &'static str {
    "/timeline/projects.json"
}

pub fn project_path(year: i32, slug: &str) -> String {
    format!("/timeline/{}/{}/project.json", year, slug)
}

pub fn image_path(year: i32, slug: &str, n: u32) -> String {
    format!("/timeline/{}/{}/{}_{}.webp", year, slug, slug, n)
}

/// Requests the server has seen for `path`
pub async fn hits(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
