//! Score to grade and risk tier

use crate::{Grade, RiskLevel};

/// Lower bound of each band, highest first
const BANDS: [(f64, Grade, RiskLevel); 4] = [
    (90.0, Grade::A, RiskLevel::Low),
    (80.0, Grade::B, RiskLevel::Low),
    (70.0, Grade::C, RiskLevel::Medium),
    (60.0, Grade::D, RiskLevel::High),
];

pub fn classify(score: f64) -> (Grade, RiskLevel) {
    BANDS
        .iter()
        .find(|(lower, _, _)| score >= *lower)
        .map(|&(_, grade, risk)| (grade, risk))
        .unwrap_or((Grade::F, RiskLevel::Critical))
}
