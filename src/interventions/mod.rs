//! Intervention recommendations
//!
//! Rule-based suggestions produced with each prediction, plus templates for
//! manually requested interventions.

pub mod rules;
pub mod templates;

pub use rules::{generate, MAX_RECOMMENDATIONS};
pub use templates::{FocusArea, InterventionTemplate};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of support action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    AcademicSupport,
    AttendanceMonitoring,
    ExtracurricularGuidance,
    ApplicationWorkshop,
    IntensiveIntervention,
    General,
}

impl InterventionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionType::AcademicSupport => "academic_support",
            InterventionType::AttendanceMonitoring => "attendance_monitoring",
            InterventionType::ExtracurricularGuidance => "extracurricular_guidance",
            InterventionType::ApplicationWorkshop => "application_workshop",
            InterventionType::IntensiveIntervention => "intensive_intervention",
            InterventionType::General => "general",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "academic_support" => Some(InterventionType::AcademicSupport),
            "attendance_monitoring" => Some(InterventionType::AttendanceMonitoring),
            "extracurricular_guidance" => Some(InterventionType::ExtracurricularGuidance),
            "application_workshop" => Some(InterventionType::ApplicationWorkshop),
            "intensive_intervention" => Some(InterventionType::IntensiveIntervention),
            "general" => Some(InterventionType::General),
            _ => None,
        }
    }
}

impl fmt::Display for InterventionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a persisted intervention
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl InterventionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionStatus::Pending => "pending",
            InterventionStatus::Active => "active",
            InterventionStatus::Completed => "completed",
            InterventionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for InterventionStatus {
    type Err = crate::PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(InterventionStatus::Pending),
            "active" => Ok(InterventionStatus::Active),
            "completed" => Ok(InterventionStatus::Completed),
            "cancelled" | "canceled" => Ok(InterventionStatus::Cancelled),
            _ => Err(crate::PredictorError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for InterventionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suggested support action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: InterventionType,
    pub title: String,
    pub description: String,
    /// 1 is the most urgent
    pub priority: u8,
    pub duration: String,
    pub resources: Vec<String>,
}
