use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub title: String,
    pub bio: String,
    pub profile_image_url: Option<String>,
    pub teacher_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub reviewer_ref: String,
    pub scores: ReviewScores,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The five scored factors of a single review.
#[derive(Debug, Clone, Copy)]
pub struct ReviewScores {
    pub teaching_quality: f64,
    pub availability: f64,
    pub communication: f64,
    pub knowledge: f64,
    pub fairness: f64,
}

/// Derived per-doctor aggregate, recomputed on every read.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_teaching_quality: f64,
    pub avg_availability: f64,
    pub avg_communication: f64,
    pub avg_knowledge: f64,
    pub avg_fairness: f64,
    pub overall_rating: f64,
    pub total_reviews: usize,
}

pub const FACTOR_LABELS: [&str; 5] = [
    "teaching quality",
    "availability",
    "communication",
    "knowledge",
    "fairness",
];

impl RatingSummary {
    /// Per-factor averages in `FACTOR_LABELS` order.
    pub fn factor_averages(&self) -> [f64; 5] {
        [
            self.avg_teaching_quality,
            self.avg_availability,
            self.avg_communication,
            self.avg_knowledge,
            self.avg_fairness,
        ]
    }
}

/// Doctor plus its summary, the shape the listing and comparison views consume.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorWithRatings {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub title: String,
    pub bio: String,
    pub profile_image_url: Option<String>,
    pub ratings: RatingSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(anyhow::anyhow!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Overall rating, highest first.
    Rating,
    /// Review count, highest first.
    Reviews,
    /// Name, case-insensitive A-Z.
    Name,
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rating" => Ok(SortKey::Rating),
            "reviews" => Ok(SortKey::Reviews),
            "name" => Ok(SortKey::Name),
            other => Err(anyhow::anyhow!(
                "unknown sort key: {other} (expected rating, reviews, or name)"
            )),
        }
    }
}
