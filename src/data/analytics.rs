//! Aggregate views over stored predictions for the dashboard

use rusqlite::params;
use serde::Serialize;

use super::database::{round2, Database};
use crate::Result;

const NATIONALITY_LIMIT: usize = 10;
const RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBucket {
    pub grade_range: String,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCount {
    pub risk_level: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationalityStats {
    pub nationality: String,
    pub count: usize,
    pub avg_score: f64,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionTypeStats {
    pub intervention_type: String,
    pub count: usize,
    pub avg_priority: f64,
    /// None until some intervention of this type has been rated
    pub avg_effectiveness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPrediction {
    pub name: String,
    pub predicted_score: f64,
    pub predicted_grade: String,
    pub risk_level: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_students: usize,
    pub average_score: f64,
    /// High and Critical risk students
    pub high_risk_count: usize,
    pub intervention_count: usize,
}

/// Everything the dashboard shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardAnalytics {
    pub grade_distribution: Vec<GradeBucket>,
    pub risk_distribution: Vec<RiskCount>,
    pub nationality_stats: Vec<NationalityStats>,
    pub intervention_stats: Vec<InterventionTypeStats>,
    pub recent_predictions: Vec<RecentPrediction>,
    pub summary: DashboardSummary,
    /// No predictions stored yet
    pub empty: bool,
    /// Fixed sample data shown when the database could not be queried
    pub demo: bool,
}

impl DashboardAnalytics {
    pub fn empty() -> Self {
        DashboardAnalytics {
            empty: true,
            ..Default::default()
        }
    }

    pub fn demo() -> Self {
        let bucket = |grade_range: &str, count, avg_score| GradeBucket {
            grade_range: grade_range.to_string(),
            count,
            avg_score,
        };
        let risk = |risk_level: &str, count| RiskCount {
            risk_level: risk_level.to_string(),
            count,
        };
        let nationality = |nationality: &str, count, avg_score, avg_confidence| NationalityStats {
            nationality: nationality.to_string(),
            count,
            avg_score,
            avg_confidence,
        };
        let recent = |name: &str, predicted_score, grade: &str, risk: &str, date: &str| {
            RecentPrediction {
                name: name.to_string(),
                predicted_score,
                predicted_grade: grade.to_string(),
                risk_level: risk.to_string(),
                date: date.to_string(),
            }
        };

        DashboardAnalytics {
            grade_distribution: vec![
                bucket("A (90-100)", 45, 94.2),
                bucket("B (80-89)", 98, 84.7),
                bucket("C (70-79)", 87, 74.3),
                bucket("D (60-69)", 52, 64.8),
                bucket("F (<60)", 24, 48.5),
            ],
            risk_distribution: vec![
                risk("Low", 185),
                risk("Medium", 79),
                risk("High", 32),
                risk("Critical", 10),
            ],
            nationality_stats: vec![
                nationality("United States", 120, 82.5, 88.3),
                nationality("China", 45, 85.2, 86.7),
                nationality("India", 38, 81.8, 87.1),
            ],
            intervention_stats: vec![
                InterventionTypeStats {
                    intervention_type: "academic_support".to_string(),
                    count: 45,
                    avg_priority: 1.8,
                    avg_effectiveness: Some(0.75),
                },
                InterventionTypeStats {
                    intervention_type: "attendance_monitoring".to_string(),
                    count: 28,
                    avg_priority: 1.5,
                    avg_effectiveness: Some(0.82),
                },
            ],
            recent_predictions: vec![
                recent("John Smith", 85.5, "B", "Low", "2024-01-15 14:30:00"),
                recent("Maria Garcia", 92.3, "A", "Low", "2024-01-15 13:45:00"),
                recent("David Chen", 67.8, "D", "High", "2024-01-15 12:20:00"),
                recent("Sarah Johnson", 88.9, "B", "Low", "2024-01-15 11:15:00"),
                recent("James Wilson", 73.2, "C", "Medium", "2024-01-15 10:30:00"),
            ],
            summary: DashboardSummary {
                total_students: 306,
                average_score: 78.5,
                high_risk_count: 42,
                intervention_count: 89,
            },
            empty: false,
            demo: true,
        }
    }
}

impl Database {
    /// Compute dashboard analytics from stored predictions
    pub fn dashboard(&self) -> Result<DashboardAnalytics> {
        let conn = self.connection();

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        if total == 0 {
            return Ok(DashboardAnalytics::empty());
        }

        let grade_distribution = conn
            .prepare(
                r#"SELECT
                       CASE
                           WHEN predicted_score >= 90 THEN 'A (90-100)'
                           WHEN predicted_score >= 80 THEN 'B (80-89)'
                           WHEN predicted_score >= 70 THEN 'C (70-79)'
                           WHEN predicted_score >= 60 THEN 'D (60-69)'
                           ELSE 'F (<60)'
                       END AS grade_range,
                       COUNT(*),
                       AVG(predicted_score) AS avg_score
                   FROM students
                   GROUP BY grade_range
                   ORDER BY avg_score DESC"#,
            )?
            .query_map([], |row| {
                Ok(GradeBucket {
                    grade_range: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                    avg_score: round2(row.get(2)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let risk_distribution = conn
            .prepare(
                "SELECT risk_level, COUNT(*) FROM students GROUP BY risk_level ORDER BY COUNT(*) DESC",
            )?
            .query_map([], |row| {
                Ok(RiskCount {
                    risk_level: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let nationality_stats = conn
            .prepare(
                r#"SELECT COALESCE(NULLIF(nationality, ''), 'Unknown') AS nat,
                          COUNT(*), AVG(predicted_score) AS avg_score, AVG(confidence)
                   FROM students
                   GROUP BY nat
                   ORDER BY avg_score DESC
                   LIMIT ?1"#,
            )?
            .query_map(params![NATIONALITY_LIMIT as i64], |row| {
                Ok(NationalityStats {
                    nationality: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                    avg_score: round2(row.get(2)?),
                    avg_confidence: round2(row.get(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let intervention_stats = conn
            .prepare(
                r#"SELECT intervention_type, COUNT(*), AVG(priority), AVG(effectiveness_score)
                   FROM interventions
                   GROUP BY intervention_type
                   ORDER BY COUNT(*) DESC, intervention_type"#,
            )?
            .query_map([], |row| {
                Ok(InterventionTypeStats {
                    intervention_type: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                    avg_priority: round2(row.get(2)?),
                    avg_effectiveness: row.get::<_, Option<f64>>(3)?.map(round2),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let recent_predictions = conn
            .prepare(
                r#"SELECT name, predicted_score, predicted_grade, risk_level, prediction_date
                   FROM students
                   ORDER BY prediction_date DESC, id DESC
                   LIMIT ?1"#,
            )?
            .query_map(params![RECENT_LIMIT as i64], |row| {
                Ok(RecentPrediction {
                    name: row.get(0)?,
                    predicted_score: row.get(1)?,
                    predicted_grade: row.get(2)?,
                    risk_level: row.get(3)?,
                    date: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (average_score, high_risk_count): (Option<f64>, i64) = conn.query_row(
            r#"SELECT AVG(predicted_score),
                      SUM(CASE WHEN risk_level IN ('High', 'Critical') THEN 1 ELSE 0 END)
               FROM students"#,
            [],
            |row| Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0))),
        )?;
        let intervention_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM interventions", [], |row| row.get(0))?;

        Ok(DashboardAnalytics {
            grade_distribution,
            risk_distribution,
            nationality_stats,
            intervention_stats,
            recent_predictions,
            summary: DashboardSummary {
                total_students: total as usize,
                average_score: round2(average_score.unwrap_or(0.0)),
                high_risk_count: high_risk_count as usize,
                intervention_count: intervention_count as usize,
            },
            empty: false,
            demo: false,
        })
    }

    /// Dashboard analytics, or the demo data set when the query fails
    pub fn dashboard_or_demo(&self) -> DashboardAnalytics {
        match self.dashboard() {
            Ok(analytics) => analytics,
            Err(e) => {
                log::warn!("Dashboard query failed, showing demo data: {}", e);
                DashboardAnalytics::demo()
            }
        }
    }
}

/// Render analytics as plain text tables
pub fn format_dashboard(analytics: &DashboardAnalytics) -> String {
    if analytics.empty {
        return "No predictions yet. Run `student predict` to add one.\n".to_string();
    }

    let mut out = String::new();
    if analytics.demo {
        out.push_str("(demo data: the database could not be read)\n\n");
    }

    let s = &analytics.summary;
    out.push_str(&format!(
        "Students: {}  Average score: {:.1}  At risk: {}  Interventions: {}\n\n",
        s.total_students, s.average_score, s.high_risk_count, s.intervention_count
    ));

    out.push_str(&format!("{:<12} {:>6} {:>8}\n", "Grade", "Count", "Avg"));
    out.push_str(&"-".repeat(28));
    out.push('\n');
    for b in &analytics.grade_distribution {
        out.push_str(&format!("{:<12} {:>6} {:>8.1}\n", b.grade_range, b.count, b.avg_score));
    }

    out.push_str(&format!("\n{:<12} {:>6}\n", "Risk", "Count"));
    out.push_str(&"-".repeat(19));
    out.push('\n');
    for r in &analytics.risk_distribution {
        out.push_str(&format!("{:<12} {:>6}\n", r.risk_level, r.count));
    }

    if !analytics.nationality_stats.is_empty() {
        out.push_str(&format!(
            "\n{:<20} {:>6} {:>8} {:>11}\n",
            "Nationality", "Count", "Avg", "Confidence"
        ));
        out.push_str(&"-".repeat(48));
        out.push('\n');
        for n in &analytics.nationality_stats {
            out.push_str(&format!(
                "{:<20} {:>6} {:>8.1} {:>11.1}\n",
                n.nationality, n.count, n.avg_score, n.avg_confidence
            ));
        }
    }

    if !analytics.intervention_stats.is_empty() {
        out.push_str(&format!(
            "\n{:<26} {:>6} {:>9} {:>14}\n",
            "Intervention", "Count", "Priority", "Effectiveness"
        ));
        out.push_str(&"-".repeat(58));
        out.push('\n');
        for i in &analytics.intervention_stats {
            let effectiveness = i
                .avg_effectiveness
                .map(|e| format!("{:.2}", e))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "{:<26} {:>6} {:>9.1} {:>14}\n",
                i.intervention_type, i.count, i.avg_priority, effectiveness
            ));
        }
    }

    if !analytics.recent_predictions.is_empty() {
        out.push_str("\nRecent predictions:\n");
        for p in &analytics.recent_predictions {
            out.push_str(&format!(
                "  {:<20} {:>6.1} {}  {:<8} {}\n",
                p.name, p.predicted_score, p.predicted_grade, p.risk_level, p.date
            ));
        }
    }
    out
}
