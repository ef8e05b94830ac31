//! Timeline data model
//!
//! Shapes of the JSON resources served under the timeline base URL:
//! - `projects.json` → [`TimelineIndex`]
//! - `{year}/meta.json` → [`YearMeta`]
//! - `{year}/{slug}/project.json` → [`ProjectDescriptor`]

use crate::error::{LoaderError, LoaderResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Plausible calendar years for timeline entries
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2200;

/// Extensions accepted for descriptor image paths
pub const IMAGE_EXTENSIONS: &[&str] = &["webp", "jpg", "jpeg", "png", "gif", "avif"];

/// Header block of the timeline index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInfo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_projects: Option<u32>,
}

/// One year of the index and the slugs published under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearEntry {
    #[serde(deserialize_with = "deserialize_year")]
    pub year: i32,
    #[serde(default)]
    pub projects: Vec<String>,
}

/// `projects.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineIndex {
    pub timeline: TimelineInfo,
    pub years: Vec<YearEntry>,
}

/// A `(year, slug)` pair addressing one project descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProjectRef {
    pub year: i32,
    pub slug: String,
}

impl TimelineIndex {
    /// Structural check run on the raw JSON before typed parsing.
    pub fn check_structure(value: &serde_json::Value) -> LoaderResult<()> {
        let has_timeline = value.get("timeline").is_some_and(|t| !t.is_null());
        let has_years = value.get("years").is_some_and(|y| y.is_array());

        if has_timeline && has_years {
            Ok(())
        } else {
            Err(LoaderError::Validation(
                "Invalid index data structure".to_string(),
            ))
        }
    }

    /// Flatten every year into `(year, slug)` pairs in index order.
    ///
    /// Entries with implausible years, malformed slugs or slugs repeated
    /// within a year are skipped with a warning.
    pub fn project_refs(&self) -> Vec<ProjectRef> {
        let mut refs = Vec::new();
        for entry in &self.years {
            if !YEAR_RANGE.contains(&entry.year) {
                warn!(year = entry.year, "Skipping implausible year in timeline index");
                continue;
            }
            refs.extend(
                valid_slugs(entry)
                    .into_iter()
                    .map(|slug| ProjectRef {
                        year: entry.year,
                        slug,
                    }),
            );
        }
        refs
    }

    /// Valid slugs for one year, or `None` if the year is not listed
    pub fn year_slugs(&self, year: i32) -> Option<Vec<String>> {
        self.years
            .iter()
            .find(|entry| entry.year == year)
            .map(valid_slugs)
    }

    /// Years in index order
    pub fn years(&self) -> Vec<i32> {
        self.years.iter().map(|entry| entry.year).collect()
    }
}

fn valid_slugs(entry: &YearEntry) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut slugs = Vec::with_capacity(entry.projects.len());
    for slug in &entry.projects {
        if !is_valid_slug(slug) {
            warn!(year = entry.year, slug = %slug, "Skipping malformed project slug");
            continue;
        }
        if !seen.insert(slug.as_str()) {
            warn!(year = entry.year, slug = %slug, "Skipping duplicate project slug");
            continue;
        }
        slugs.push(slug.clone());
    }
    slugs
}

/// Slugs are non-empty and limited to `[a-z0-9-]`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// True if the path (ignoring query/fragment) ends in a known image extension
pub fn is_image_path(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectType {
    CaseStudy,
    Project,
    Experiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSize {
    Large,
    Small,
    Active,
}

/// Video host for `video_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Vimeo,
    Gumlet,
}

/// `{year}/{slug}/project.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: i32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ProjectSize>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_video_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_type: Option<VideoType>,
}

impl ProjectDescriptor {
    /// Required-field check on the raw JSON before typed parsing
    pub fn check_required(value: &serde_json::Value) -> LoaderResult<()> {
        let missing: Vec<&str> = ["id", "title", "year"]
            .into_iter()
            .filter(|field| value.get(field).map_or(true, |v| v.is_null()))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::Validation(format!(
                "Invalid project data: missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Post-parse validation against the year it was requested under.
    ///
    /// A year mismatch is an error. A video id without a type is kept but
    /// logged, and image entries without an image extension are dropped.
    pub fn validate_for(&mut self, year: i32, slug: &str) -> LoaderResult<()> {
        if self.year != year {
            return Err(LoaderError::Validation(format!(
                "Project {} declares year {} but was loaded from {}",
                slug, self.year, year
            )));
        }

        if self.video_id.is_some() && self.video_type.is_none() {
            warn!(year, slug, "Project has videoId without a valid videoType");
        }

        if let Some(images) = self.images.as_mut() {
            images.retain(|path| {
                let keep = is_image_path(path);
                if !keep {
                    warn!(year, slug, path = %path, "Dropping image without a recognised extension");
                }
                keep
            });
        }

        Ok(())
    }

    /// True when neither a cover nor a gallery was supplied
    pub fn needs_image_detection(&self) -> bool {
        self.cover.is_none() && self.gallery.is_none()
    }

    /// Fill `images`, `cover` (first) and `gallery` (the rest).
    ///
    /// Detected images win; with none detected the descriptor's own
    /// `images` list is used. Nothing changes if both are empty.
    pub fn apply_images(&mut self, detected: Vec<String>) {
        let images = if detected.is_empty() {
            match self.images.as_ref() {
                Some(existing) if !existing.is_empty() => existing.clone(),
                _ => return,
            }
        } else {
            detected
        };

        self.cover = images.first().cloned();
        self.gallery = Some(images.iter().skip(1).cloned().collect());
        self.images = Some(images);
    }
}

/// `{year}/meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearMeta {
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Any additional keys the site defines for a year
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Synthesized metadata for years without a usable `meta.json`
pub fn default_year_meta(year: i32) -> YearMeta {
    YearMeta {
        year,
        title: year.to_string(),
        description: format!("Projects from {}", year),
        extra: serde_json::Map::new(),
    }
}

impl YearMeta {
    /// Fill blanks left by a partial `meta.json` from the default
    pub fn complete_for(mut self, year: i32) -> Self {
        let defaults = default_year_meta(year);
        self.year = year;
        if self.title.trim().is_empty() {
            self.title = defaults.title;
        }
        if self.description.trim().is_empty() {
            self.description = defaults.description;
        }
        self
    }
}

/// Years appear as numbers in most files and as strings in a few
fn deserialize_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawYear {
        Number(i64),
        Text(String),
    }

    match RawYear::deserialize(deserializer)? {
        RawYear::Number(n) => i32::try_from(n).map_err(serde::de::Error::custom),
        RawYear::Text(s) => s.trim().parse::<i32>().map_err(serde::de::Error::custom),
    }
}

/// Unknown video hosts are dropped rather than failing the descriptor
fn deserialize_video_type<'de, D>(deserializer: D) -> Result<Option<VideoType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => match VideoType::deserialize(&value) {
            Ok(video_type) => Some(video_type),
            Err(e) => {
                warn!(video_type = %value, error = %e, "Ignoring unrecognised videoType");
                None
            }
        },
    })
}
