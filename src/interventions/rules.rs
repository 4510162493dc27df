//! Rule engine turning features and a score into recommendations

use super::{InterventionType, Recommendation};
use crate::features::StudentFeatures;

/// Upper bound on recommendations returned per prediction
pub const MAX_RECOMMENDATIONS: usize = 5;

const LOW_OVERALL_GRADE: f64 = 3.0;
const LOW_ATTENDANCE_RATE: f64 = 0.8;
const LOW_EXTRACURRICULAR_SCORE: f64 = 2.4;
const AT_RISK_SCORE: f64 = 60.0;

/// Generate recommendations, most urgent first
///
/// Rules are independent and checked in a fixed order. Sorting is stable, so
/// equal priorities keep rule order.
pub fn generate(score: f64, features: &StudentFeatures) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if features.overall_grade < LOW_OVERALL_GRADE {
        recommendations.push(recommendation(
            InterventionType::AcademicSupport,
            "Academic Tutoring Program",
            "Weekly tutoring sessions in weak subjects",
            1,
            "8 weeks",
            &["Tutor matching", "Study materials", "Progress tracking"],
        ));
    }

    if features.attendance_rate < LOW_ATTENDANCE_RATE {
        recommendations.push(recommendation(
            InterventionType::AttendanceMonitoring,
            "Attendance Improvement Plan",
            "Daily monitoring and support",
            1,
            "12 weeks",
            &["Daily check-ins", "Parent notifications", "Incentive program"],
        ));
    }

    if features.extracurricular_score < LOW_EXTRACURRICULAR_SCORE {
        recommendations.push(recommendation(
            InterventionType::ExtracurricularGuidance,
            "Extracurricular Development",
            "Guidance on building meaningful activities",
            3,
            "Ongoing",
            &["Club recommendations", "Leadership opportunities"],
        ));
    }

    if features.has_low_application_score() {
        recommendations.push(recommendation(
            InterventionType::ApplicationWorkshop,
            "Application Enhancement",
            "Improve portfolio and recommendation letters",
            2,
            "2 weeks",
            &["Portfolio review", "Writing assistance", "Mock interviews"],
        ));
    }

    if score < AT_RISK_SCORE {
        recommendations.push(recommendation(
            InterventionType::IntensiveIntervention,
            "Comprehensive Support Program",
            "Multi-faceted intervention for at-risk students",
            1,
            "16 weeks",
            &["Academic counseling", "Mental health support", "Career guidance"],
        ));
    }

    recommendations.sort_by_key(|r| r.priority);
    recommendations.truncate(MAX_RECOMMENDATIONS);

    log::debug!(
        "Generated {} recommendations for score {:.1}",
        recommendations.len(),
        score
    );
    recommendations
}

fn recommendation(
    kind: InterventionType,
    title: &str,
    description: &str,
    priority: u8,
    duration: &str,
    resources: &[&str],
) -> Recommendation {
    Recommendation {
        kind,
        title: title.to_string(),
        description: description.to_string(),
        priority,
        duration: duration.to_string(),
        resources: resources.iter().map(|r| r.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{LabelEncoders, RawInput};

    fn features_for(raw: RawInput) -> StudentFeatures {
        StudentFeatures::from_input(&raw, &LabelEncoders::default())
    }

    fn strong_student() -> RawInput {
        RawInput {
            english_grade: Some(4.5),
            math_grade: Some(4.5),
            sciences_grade: Some(4.5),
            language_grade: Some(4.5),
            portfolio_rating: Some(5.0),
            coverletter_rating: Some(4.0),
            refletter_rating: Some(5.0),
            attendance_rate: Some(0.95),
            extracurricular_level: Some(4.0),
            ..RawInput::default()
        }
    }

    #[test]
    fn test_no_rules_fire_for_strong_student() {
        let recs = generate(92.0, &features_for(strong_student()));
        assert!(recs.is_empty());
    }

    #[test]
    fn test_all_rules_fire_in_priority_order() {
        let raw = RawInput {
            english_grade: Some(2.0),
            math_grade: Some(2.0),
            sciences_grade: Some(2.0),
            language_grade: Some(2.0),
            portfolio_rating: Some(2.0),
            coverletter_rating: Some(2.0),
            refletter_rating: Some(2.0),
            attendance_rate: Some(0.6),
            extracurricular_level: Some(1.0),
            ..RawInput::default()
        };
        let recs = generate(45.0, &features_for(raw));

        let kinds: Vec<_> = recs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InterventionType::AcademicSupport,
                InterventionType::AttendanceMonitoring,
                InterventionType::IntensiveIntervention,
                InterventionType::ApplicationWorkshop,
                InterventionType::ExtracurricularGuidance,
            ]
        );
        let priorities: Vec<_> = recs.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![1, 1, 1, 2, 3]);
        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
    }

    #[test]
    fn test_score_rule_alone() {
        let recs = generate(59.9, &features_for(strong_student()));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, InterventionType::IntensiveIntervention);
        assert_eq!(recs[0].duration, "16 weeks");
        assert_eq!(recs[0].resources.len(), 3);

        assert!(generate(60.0, &features_for(strong_student())).is_empty());
    }

    #[test]
    fn test_default_input_only_triggers_application_rule() {
        // Default ratings average 3.0, below the 3.5 application threshold
        let recs = generate(75.0, &features_for(RawInput::default()));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, InterventionType::ApplicationWorkshop);
        assert_eq!(recs[0].priority, 2);
    }

    #[test]
    fn test_same_inputs_same_output() {
        let features = features_for(RawInput {
            attendance_rate: Some(0.5),
            ..RawInput::default()
        });
        assert_eq!(generate(55.0, &features), generate(55.0, &features));
    }
}
