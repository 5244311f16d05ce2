//! Report entity and the request shapes that create or change it

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};
use crate::geo::GeoPoint;

/// Address stored while the external resolver has not supplied a label
pub const ADDRESS_PLACEHOLDER: &str = "Address pending";

/// Stable identity of an acting user, issued by the identity resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new_random() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(UserId)
    }
}

/// Problem category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Infrastructure,
    Cleanliness,
    #[serde(alias = "human-related")]
    Human,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Infrastructure, Category::Cleanliness, Category::Human];

    /// Storage and wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Infrastructure => "infrastructure",
            Category::Cleanliness => "cleanliness",
            Category::Human => "human",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Infrastructure => "Infrastructure",
            Category::Cleanliness => "Cleanliness",
            Category::Human => "Human-related",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "infrastructure" => Ok(Category::Infrastructure),
            "cleanliness" => Ok(Category::Cleanliness),
            "human" | "human-related" => Ok(Category::Human),
            other => Err(ReportError::Validation(format!(
                "unknown category '{}', expected one of infrastructure, cleanliness, human",
                other
            ))),
        }
    }
}

/// Report lifecycle status
///
/// `Flagged` is initial and `Solved` is terminal. Any status may be requested
/// as a target; the verification state machine decides whether it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(rename = "Report Flagged")]
    Flagged,
    #[serde(rename = "Verified")]
    Verified,
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Solved")]
    Solved,
}

impl ReportStatus {
    /// Storage identifier
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ReportStatus::Flagged => "flagged",
            ReportStatus::Verified => "verified",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Solved => "solved",
        }
    }

    /// Wire name
    pub fn display_name(&self) -> &'static str {
        match self {
            ReportStatus::Flagged => "Report Flagged",
            ReportStatus::Verified => "Verified",
            ReportStatus::InProgress => "In progress",
            ReportStatus::Solved => "Solved",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Solved)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ReportStatus {
    type Err = ReportError;

    /// Accepts wire names and storage identifiers, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "report_flagged" | "flagged" => Ok(ReportStatus::Flagged),
            "verified" => Ok(ReportStatus::Verified),
            "in_progress" | "inprogress" => Ok(ReportStatus::InProgress),
            "solved" => Ok(ReportStatus::Solved),
            _ => Err(ReportError::InvalidStatus(s.to_string())),
        }
    }
}

/// A persisted report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Free-text location supplied by the reporter
    pub location_label: String,
    pub category: Category,
    /// Derived from `category`
    pub category_label: String,
    pub location: GeoPoint,
    /// Human-readable address, placeholder until resolved
    pub address: Option<String>,
    pub status: ReportStatus,
    pub verification_count: u32,
    pub owner_id: UserId,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn is_owned_by(&self, actor: &UserId) -> bool {
        self.owner_id == *actor
    }

    /// Still blocks new reports of the same category nearby
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Create request as received from the caller
///
/// Every field is optional here so that missing input surfaces as a
/// `ValidationError`. Structurally malformed bodies (wrong JSON types, a
/// coordinates array of the wrong length) are rejected earlier, by the HTTP
/// layer, as a bad request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportDraft {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "userLocation")]
    pub location_label: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Draft that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub title: String,
    pub description: String,
    pub location_label: String,
    pub category: Category,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub images: Vec<String>,
}

impl ReportDraft {
    pub fn validate(self) -> ReportResult<ValidDraft> {
        let title = required_text("title", self.title)?;
        let description = required_text("description", self.description)?;
        let location_label = required_text("location label", self.location_label)?;

        let category = self
            .category
            .ok_or_else(|| ReportError::Validation("category is required".to_string()))?
            .parse::<Category>()?;

        let location = self
            .location
            .ok_or_else(|| ReportError::Validation("location is required".to_string()))?;
        location.validate().map_err(ReportError::Validation)?;

        let address = self
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let images = self
            .images
            .into_iter()
            .map(|handle| handle.trim().to_string())
            .filter(|handle| !handle.is_empty())
            .collect();

        Ok(ValidDraft {
            title,
            description,
            location_label,
            category,
            location,
            address,
            images,
        })
    }
}

/// Content update request
///
/// Only caller-editable fields exist on this type; anything else in the
/// request body (status, owner, counts) is dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportPatch {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default, alias = "userLocation")]
    pub location_label: Option<String>,
}

/// Patch that passed validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub location_label: Option<String>,
}

impl ReportPatch {
    pub fn validate(self) -> ReportResult<ValidPatch> {
        Ok(ValidPatch {
            title: self.title.map(|t| required_text("title", Some(t))).transpose()?,
            description: self
                .description
                .map(|d| required_text("description", Some(d)))
                .transpose()?,
            category: self.category.map(|c| c.parse::<Category>()).transpose()?,
            location_label: self
                .location_label
                .map(|l| required_text("location label", Some(l)))
                .transpose()?,
        })
    }
}

impl ValidPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.location_label.is_none()
    }

    /// Apply the editable fields, recomputing the category label
    pub fn apply_to(self, report: &mut Report) {
        if let Some(title) = self.title {
            report.title = title;
        }
        if let Some(description) = self.description {
            report.description = description;
        }
        if let Some(category) = self.category {
            report.category = category;
            report.category_label = category.label().to_string();
        }
        if let Some(location_label) = self.location_label {
            report.location_label = location_label;
        }
    }
}

/// Listing filter; every set field must match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub category: Option<Category>,
    pub status: Option<ReportStatus>,
    pub owner_id: Option<UserId>,
    /// Drop rows whose stored point fails validation
    pub valid_coordinates_only: bool,
}

impl ReportFilter {
    pub fn by_owner(owner: UserId) -> Self {
        Self {
            owner_id: Some(owner),
            ..Self::default()
        }
    }

    pub fn matches(&self, report: &Report) -> bool {
        self.category.map_or(true, |c| report.category == c)
            && self.status.map_or(true, |s| report.status == s)
            && self.owner_id.map_or(true, |o| report.owner_id == o)
            && (!self.valid_coordinates_only || report.location.is_valid())
    }
}

fn required_text(field: &str, value: Option<String>) -> ReportResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ReportError::Validation(format!("{} is required", field))),
    }
}
