use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{StudentRecord, UserRole};

/// Targeting mode of an announcement.
///
/// `Bucket` and `Location` are the single-tag legacy modes; the set-based
/// modes replaced them but old announcements still carry them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceMode {
    #[default]
    All,
    Bucket,
    Location,
    ProgramStages,
    Locations,
    Both,
}

impl AudienceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceMode::All => "all",
            AudienceMode::Bucket => "bucket",
            AudienceMode::Location => "location",
            AudienceMode::ProgramStages => "program_stages",
            AudienceMode::Locations => "locations",
            AudienceMode::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(AudienceMode::All),
            "bucket" => Some(AudienceMode::Bucket),
            "location" => Some(AudienceMode::Location),
            "program_stages" => Some(AudienceMode::ProgramStages),
            "locations" => Some(AudienceMode::Locations),
            "both" => Some(AudienceMode::Both),
            _ => None,
        }
    }
}

/// Who should receive an announcement.
///
/// Only the fields relevant to `mode` are consulted. A rule is validated once
/// when the announcement is created or updated and replaced wholesale on
/// update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRule {
    #[serde(default)]
    pub mode: AudienceMode,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub program_stages: BTreeSet<String>,
    #[serde(default)]
    pub locations: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudienceError {
    #[error("bucket is required when the audience mode is 'bucket'")]
    MissingBucket,
    #[error("state is required when the audience mode is 'location'")]
    MissingState,
    #[error("program_stages must not be empty when the audience mode is 'program_stages'")]
    MissingProgramStages,
    #[error("locations must not be empty when the audience mode is 'locations'")]
    MissingLocations,
    #[error("at least one of program_stages or locations is required when the audience mode is 'both'")]
    MissingStagesAndLocations,
}

impl AudienceError {
    pub const CODE: &'static str = "INVALID_AUDIENCE_RULE";
}

/// Narrowing filter for directory queries. Non-empty axes are OR-combined;
/// when every axis is empty the filter selects every user of `role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub role: UserRole,
    pub program_stages: Vec<String>,
    pub location_tags: Vec<String>,
    pub states: Vec<String>,
}

impl DirectoryFilter {
    pub fn students() -> Self {
        Self {
            role: UserRole::Student,
            program_stages: Vec::new(),
            location_tags: Vec::new(),
            states: Vec::new(),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.program_stages.is_empty() && self.location_tags.is_empty() && self.states.is_empty()
    }
}

impl AudienceRule {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self {
            mode: AudienceMode::Bucket,
            bucket: Some(bucket.into()),
            ..Default::default()
        }
    }

    pub fn location(state: impl Into<String>) -> Self {
        Self {
            mode: AudienceMode::Location,
            state: Some(state.into()),
            ..Default::default()
        }
    }

    pub fn program_stages<I, S>(stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: AudienceMode::ProgramStages,
            program_stages: stages.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn locations<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: AudienceMode::Locations,
            locations: locations.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn both<I, J, S, T>(stages: I, locations: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            mode: AudienceMode::Both,
            program_stages: stages.into_iter().map(Into::into).collect(),
            locations: locations.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Trims every tag and drops blank ones, so `"  "` never counts as a
    /// populated field.
    pub fn normalized(mut self) -> Self {
        self.bucket = clean_tag(self.bucket);
        self.state = clean_tag(self.state);
        self.program_stages = clean_set(self.program_stages);
        self.locations = clean_set(self.locations);
        self
    }

    pub fn validate(&self) -> std::result::Result<(), AudienceError> {
        match self.mode {
            AudienceMode::All => Ok(()),
            AudienceMode::Bucket if is_blank(&self.bucket) => Err(AudienceError::MissingBucket),
            AudienceMode::Location if is_blank(&self.state) => Err(AudienceError::MissingState),
            AudienceMode::ProgramStages if !has_tags(&self.program_stages) => {
                Err(AudienceError::MissingProgramStages)
            }
            AudienceMode::Locations if !has_tags(&self.locations) => {
                Err(AudienceError::MissingLocations)
            }
            AudienceMode::Both if !has_tags(&self.program_stages) && !has_tags(&self.locations) => {
                Err(AudienceError::MissingStagesAndLocations)
            }
            _ => Ok(()),
        }
    }

    /// Single source of truth for targeting. Both the "which announcements
    /// can this student see" and the "who receives this announcement"
    /// directions are derived from this predicate.
    ///
    /// Absent student attributes never match; a rule that is missing the
    /// field its mode needs matches nobody rather than everybody.
    pub fn matches(&self, student: &StudentRecord) -> bool {
        match self.mode {
            AudienceMode::All => true,
            AudienceMode::Bucket => same_tag(self.bucket.as_deref(), student.program_stage.as_deref()),
            AudienceMode::Location => same_tag(self.state.as_deref(), student.state.as_deref()),
            AudienceMode::ProgramStages => in_set(&self.program_stages, student.program_stage.as_deref()),
            AudienceMode::Locations => in_set(&self.locations, student.location_tag.as_deref()),
            AudienceMode::Both => {
                in_set(&self.program_stages, student.program_stage.as_deref())
                    || in_set(&self.locations, student.location_tag.as_deref())
            }
        }
    }

    /// Directory query that returns a superset of the students this rule
    /// matches. Callers still apply [`AudienceRule::matches`] to the rows.
    pub fn directory_filter(&self) -> DirectoryFilter {
        let mut filter = DirectoryFilter::students();
        match self.mode {
            AudienceMode::All => {}
            AudienceMode::Bucket => filter.program_stages.extend(self.bucket.clone()),
            AudienceMode::Location => filter.states.extend(self.state.clone()),
            AudienceMode::ProgramStages => {
                filter.program_stages.extend(self.program_stages.iter().cloned())
            }
            AudienceMode::Locations => filter.location_tags.extend(self.locations.iter().cloned()),
            AudienceMode::Both => {
                filter.program_stages.extend(self.program_stages.iter().cloned());
                filter.location_tags.extend(self.locations.iter().cloned());
            }
        }
        filter
    }

    /// True when the rule cannot match anyone. Used to skip the directory
    /// query, since an empty filter would otherwise select every student.
    pub fn targets_nobody(&self) -> bool {
        self.mode != AudienceMode::All && self.directory_filter().is_unconstrained()
    }
}

fn same_tag(rule: Option<&str>, student: Option<&str>) -> bool {
    match (rule, student) {
        (Some(rule), Some(student)) => !rule.is_empty() && rule == student,
        _ => false,
    }
}

fn in_set(set: &BTreeSet<String>, student: Option<&str>) -> bool {
    student.map(|tag| set.contains(tag)).unwrap_or(false)
}

fn is_blank(tag: &Option<String>) -> bool {
    tag.as_deref().map(|t| t.trim().is_empty()).unwrap_or(true)
}

fn has_tags(set: &BTreeSet<String>) -> bool {
    set.iter().any(|t| !t.trim().is_empty())
}

/// Trims a tag and maps blank values to `None`. Applied to rule tags and to
/// the student attributes they are compared against.
pub fn clean_tag(tag: Option<String>) -> Option<String> {
    tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn clean_set(set: BTreeSet<String>) -> BTreeSet<String> {
    set.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
