use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{value} is not a valid {kind}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// The role the owner of a classroom has in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tutor,
    Student,
}

/// How the learner prefers material to be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningStyle {
    StepByStep,
    Conceptual,
    Visual,
}

/// Preferences sent to the timetable generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPreferences {
    pub days_per_week: u8,
    pub hours_per_session: f32,
    pub learning_style: LearningStyle,
}

impl StudyPreferences {
    pub const DAYS_PER_WEEK: (u8, u8) = (1, 7);
    pub const HOURS_PER_SESSION: (f32, f32) = (0.5, 4.0);

    /// Returns true if the preferences are within the accepted ranges
    pub fn is_within_bounds(&self) -> bool {
        let (min_days, max_days) = Self::DAYS_PER_WEEK;
        let (min_hours, max_hours) = Self::HOURS_PER_SESSION;

        (min_days..=max_days).contains(&self.days_per_week)
            && (min_hours..=max_hours).contains(&self.hours_per_session)
    }
}

impl Default for StudyPreferences {
    fn default() -> Self {
        Self {
            days_per_week: 3,
            hours_per_session: 1.0,
            learning_style: LearningStyle::StepByStep,
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tutor => "tutor",
            Role::Student => "student",
        }
    }
}

impl LearningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::StepByStep => "step-by-step",
            LearningStyle::Conceptual => "conceptual",
            LearningStyle::Visual => "visual",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tutor" => Ok(Role::Tutor),
            "student" => Ok(Role::Student),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for LearningStyle {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "step-by-step" => Ok(LearningStyle::StepByStep),
            "conceptual" => Ok(LearningStyle::Conceptual),
            "visual" => Ok(LearningStyle::Visual),
            other => Err(UnknownVariant {
                kind: "learning style",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for LearningStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a study resource. Unknown kinds are kept as they were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Video,
    Website,
    Other(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Website => "website",
            ResourceKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for ResourceKind {
    fn from(value: &str) -> Self {
        match value {
            "video" => ResourceKind::Video,
            "website" => ResourceKind::Website,
            other => ResourceKind::Other(other.to_string()),
        }
    }
}

/// Color given to notes created without one
pub const DEFAULT_NOTE_COLOR: &str = "yellow";
/// Name given to notes created without one
pub const DEFAULT_NOTE_NAME: &str = "Note";
