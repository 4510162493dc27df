//! Student feature representation for model input
//!
//! Each prediction request is encoded as one fixed-order feature vector.

use serde::Serialize;

use super::encoding::LabelEncoders;
use super::input::RawInput;

/// Placeholder distance to the nearest education hub, not derived from geography
pub const EDUCATION_HUB_DISTANCE: f64 = 500.0;

/// Added to the grade spread so identical grades don't divide by zero
const CONSISTENCY_EPSILON: f64 = 0.1;

/// Canonical feature names, in the order trained models expect them
pub const FEATURE_NAMES: [&str; StudentFeatures::DIM] = [
    "english.grade",
    "math.grade",
    "sciences.grade",
    "language.grade",
    "overall_grade",
    "academic_consistency",
    "consistency_score",
    "portfolio.rating",
    "coverletter.rating",
    "refletter.rating",
    "application_strength",
    "strong_recommendation",
    "strong_portfolio",
    "age",
    "attendance_rate",
    "extracurricular_score",
    "education_hub_distance",
    "multiple_weak_subjects",
    "low_application_score",
    "math_english_diff",
    "science_language_diff",
    "academic_potential",
    "performance_index",
    "gender_encoded",
    "nationality_encoded",
    "ethnic.group_encoded",
];

/// Features derived from a single student's raw attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentFeatures {
    pub english_grade: f64,
    pub math_grade: f64,
    pub sciences_grade: f64,
    pub language_grade: f64,
    /// Mean of the four subject grades
    pub overall_grade: f64,
    /// Population standard deviation of the four subject grades
    pub academic_consistency: f64,
    pub consistency_score: f64,

    pub portfolio_rating: f64,
    pub coverletter_rating: f64,
    pub refletter_rating: f64,
    /// Mean of the three application ratings
    pub application_strength: f64,
    pub strong_recommendation: f64,
    pub strong_portfolio: f64,

    pub age: f64,
    pub attendance_rate: f64,
    pub extracurricular_score: f64,
    pub education_hub_distance: f64,

    /// 1.0 when two or more of english/math/sciences are below 3
    pub multiple_weak_subjects: f64,
    pub low_application_score: f64,

    pub math_english_diff: f64,
    pub science_language_diff: f64,

    pub academic_potential: f64,
    pub performance_index: f64,

    pub gender_encoded: f64,
    pub nationality_encoded: f64,
    pub ethnic_group_encoded: f64,
}

impl StudentFeatures {
    /// Dimension of feature vector
    pub const DIM: usize = 26;

    /// Compute every derived feature from raw input
    pub fn from_input(raw: &RawInput, encoders: &LabelEncoders) -> Self {
        let grades = raw.grades();
        let [english_grade, math_grade, sciences_grade, language_grade] = grades;

        let overall_grade = mean(&grades);
        let academic_consistency = population_std(&grades);
        let consistency_score = 1.0 / (academic_consistency + CONSISTENCY_EPSILON);

        let ratings = raw.ratings();
        let [portfolio_rating, coverletter_rating, refletter_rating] = ratings;
        let application_strength = mean(&ratings);

        let age = raw.age_or_default();
        let attendance_rate = raw.attendance_rate_or_default();
        let extracurricular_score = raw.extracurricular_level_or_default() * 0.8;

        // Language is not one of the core subjects for the weak-subject count
        let weak_count = grades[..3].iter().filter(|&&g| g < 3.0).count();

        let academic_potential =
            overall_grade * 0.6 + extracurricular_score * 0.3 + attendance_rate * 0.1;
        let performance_index =
            (overall_grade * 0.4 + application_strength * 0.3 + attendance_rate * 0.3) * 20.0;

        StudentFeatures {
            english_grade,
            math_grade,
            sciences_grade,
            language_grade,
            overall_grade,
            academic_consistency,
            consistency_score,
            portfolio_rating,
            coverletter_rating,
            refletter_rating,
            application_strength,
            strong_recommendation: flag(refletter_rating >= 4.0),
            strong_portfolio: flag(portfolio_rating >= 4.0),
            age,
            attendance_rate,
            extracurricular_score,
            education_hub_distance: EDUCATION_HUB_DISTANCE,
            multiple_weak_subjects: flag(weak_count >= 2),
            low_application_score: flag(application_strength < 3.5),
            math_english_diff: math_grade - english_grade,
            science_language_diff: sciences_grade - language_grade,
            academic_potential,
            performance_index,
            gender_encoded: encoders.gender.encode(raw.gender_or_empty()) as f64,
            nationality_encoded: encoders.nationality.encode(raw.nationality_or_empty()) as f64,
            ethnic_group_encoded: encoders.ethnic_group.encode(raw.ethnic_group_or_empty())
                as f64,
        }
    }

    /// Convert to a flat vector in canonical order
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.english_grade,
            self.math_grade,
            self.sciences_grade,
            self.language_grade,
            self.overall_grade,
            self.academic_consistency,
            self.consistency_score,
            self.portfolio_rating,
            self.coverletter_rating,
            self.refletter_rating,
            self.application_strength,
            self.strong_recommendation,
            self.strong_portfolio,
            self.age,
            self.attendance_rate,
            self.extracurricular_score,
            self.education_hub_distance,
            self.multiple_weak_subjects,
            self.low_application_score,
            self.math_english_diff,
            self.science_language_diff,
            self.academic_potential,
            self.performance_index,
            self.gender_encoded,
            self.nationality_encoded,
            self.ethnic_group_encoded,
        ]
    }

    /// Named view of the features in canonical order
    pub fn to_feature_vector(&self) -> FeatureVector {
        FeatureVector {
            entries: FEATURE_NAMES.iter().copied().zip(self.to_vec()).collect(),
        }
    }

    pub fn has_low_application_score(&self) -> bool {
        self.low_application_score >= 1.0
    }
}

/// Compute the feature vector for a raw input
pub fn compute_features(raw: &RawInput, encoders: &LabelEncoders) -> FeatureVector {
    StudentFeatures::from_input(raw, encoders).to_feature_vector()
}

/// Ordered, named feature values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    entries: Vec<(&'static str, f64)>,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Value for a name, 0.0 when the vector doesn't carry it
    pub fn value_or_zero(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    /// Arrange values in the order of a model's feature schema
    pub fn project<S: AsRef<str>>(&self, schema: &[S]) -> Vec<f64> {
        if schema.len() != self.len() {
            log::warn!(
                "Feature schema has {} columns but the vector carries {}",
                schema.len(),
                self.len()
            );
        }
        schema
            .iter()
            .map(|name| self.value_or_zero(name.as_ref()))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let naive = values.iter().sum::<f64>() / n;
    if naive.is_finite() {
        return naive;
    }
    // The sum overflowed; average the values rescaled into [-1, 1]
    let scale = max_abs(values);
    values.iter().map(|v| v / scale).sum::<f64>() / n * scale
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    if variance.is_finite() {
        return variance.sqrt();
    }
    let scale = max_abs(values);
    let scaled_mean = m / scale;
    let scaled_variance = values
        .iter()
        .map(|x| (x / scale - scaled_mean).powi(2))
        .sum::<f64>()
        / n;
    scaled_variance.sqrt() * scale
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
}
