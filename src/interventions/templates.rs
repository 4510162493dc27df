//! Templates for manually requested interventions

use serde::{Deserialize, Serialize};

use super::InterventionType;

/// Area a suggested intervention should address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    #[default]
    Academic,
    Attendance,
    Extracurricular,
    Application,
}

impl FocusArea {
    /// Unrecognised areas are treated as academic
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "attendance" => FocusArea::Attendance,
            "extracurricular" => FocusArea::Extracurricular,
            "application" => FocusArea::Application,
            _ => FocusArea::Academic,
        }
    }
}

/// A ready-to-persist intervention suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionTemplate {
    #[serde(rename = "type")]
    pub kind: InterventionType,
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub resources: Vec<String>,
}

impl InterventionTemplate {
    pub fn for_focus(area: FocusArea, student_name: Option<&str>) -> Self {
        let (kind, title, description, priority, resources): (_, _, _, u8, &[&str]) = match area
        {
            FocusArea::Academic => (
                InterventionType::AcademicSupport,
                "Academic Excellence Program",
                "Personalized academic support focusing on weak subjects",
                1,
                &["Weekly tutoring", "Study materials", "Progress tracking"],
            ),
            FocusArea::Attendance => (
                InterventionType::AttendanceMonitoring,
                "Attendance Improvement Initiative",
                "Structured program to improve attendance and punctuality",
                1,
                &["Daily check-ins", "Parent notifications", "Reward system"],
            ),
            FocusArea::Extracurricular => (
                InterventionType::ExtracurricularGuidance,
                "Holistic Development Program",
                "Guidance on building meaningful extracurricular profile",
                3,
                &["Club recommendations", "Leadership workshops", "Community service"],
            ),
            FocusArea::Application => (
                InterventionType::ApplicationWorkshop,
                "Application Enhancement Workshop",
                "Comprehensive support for improving application materials",
                2,
                &["Portfolio review", "Essay editing", "Interview practice"],
            ),
        };

        let title = match student_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("{} for {}", title, name),
            None => title.to_string(),
        };

        InterventionTemplate {
            kind,
            title,
            description: description.to_string(),
            priority,
            resources: resources.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_focus_is_academic() {
        assert_eq!(FocusArea::parse_or_default("music"), FocusArea::Academic);
        assert_eq!(FocusArea::parse_or_default(" Attendance "), FocusArea::Attendance);
    }

    #[test]
    fn test_title_includes_student_name() {
        let template = InterventionTemplate::for_focus(FocusArea::Application, Some("Maria"));
        assert_eq!(template.title, "Application Enhancement Workshop for Maria");
        assert_eq!(template.kind, InterventionType::ApplicationWorkshop);
        assert_eq!(template.priority, 2);

        let anonymous = InterventionTemplate::for_focus(FocusArea::Application, Some("  "));
        assert_eq!(anonymous.title, "Application Enhancement Workshop");
    }

    #[test]
    fn test_extracurricular_template() {
        let template = InterventionTemplate::for_focus(FocusArea::Extracurricular, None);
        assert_eq!(template.priority, 3);
        assert_eq!(
            template.resources,
            vec!["Club recommendations", "Leadership workshops", "Community service"]
        );
    }
}
