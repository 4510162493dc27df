//! SQLite database management for predictions and interventions

use crate::features::RawInput;
use crate::interventions::{
    InterventionStatus, InterventionTemplate, InterventionType, Recommendation,
};
use crate::predict::{classify, PredictionResult};
use crate::{Grade, PredictorError, Result, RiskLevel};
use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Timestamp format stored in every date column
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = r#"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            gender TEXT NOT NULL DEFAULT '',
            nationality TEXT NOT NULL DEFAULT '',
            age REAL,
            english_grade REAL,
            math_grade REAL,
            sciences_grade REAL,
            language_grade REAL,
            portfolio_rating REAL,
            coverletter_rating REAL,
            refletter_rating REAL,
            predicted_score REAL NOT NULL,
            predicted_grade TEXT NOT NULL,
            risk_level TEXT NOT NULL,
            confidence REAL NOT NULL,
            recommendations TEXT NOT NULL DEFAULT '[]',
            prediction_date TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS interventions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER REFERENCES students(id),
            student_name TEXT NOT NULL,
            intervention_type TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            priority INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            resources TEXT NOT NULL DEFAULT '[]',
            effectiveness_score REAL,
            created_at TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_students_date ON students(prediction_date);
        CREATE INDEX IF NOT EXISTS idx_interventions_created ON interventions(created_at);
        "#;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

/// A persisted prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: i64,
    pub name: String,
    pub gender: String,
    pub nationality: String,
    pub age: f64,
    pub english_grade: f64,
    pub math_grade: f64,
    pub sciences_grade: f64,
    pub language_grade: f64,
    pub portfolio_rating: f64,
    pub coverletter_rating: f64,
    pub refletter_rating: f64,
    pub predicted_score: f64,
    pub predicted_grade: Grade,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub recommendations: Vec<Recommendation>,
    pub prediction_date: NaiveDateTime,
}

/// A persisted intervention, with the current student name when linked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub id: i64,
    pub student_id: Option<i64>,
    pub student_name: String,
    #[serde(rename = "type")]
    pub kind: InterventionType,
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub status: InterventionStatus,
    pub resources: Vec<String>,
    pub effectiveness_score: Option<f64>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// Fields of a manually created intervention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIntervention {
    pub student_id: Option<i64>,
    pub student_name: String,
    #[serde(rename = "type")]
    pub kind: InterventionType,
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub status: InterventionStatus,
    pub resources: Vec<String>,
}

impl Default for NewIntervention {
    fn default() -> Self {
        NewIntervention {
            student_id: None,
            student_name: "Unknown".to_string(),
            kind: InterventionType::General,
            title: "Untitled Intervention".to_string(),
            description: "No description provided".to_string(),
            priority: 3,
            status: InterventionStatus::Pending,
            resources: Vec::new(),
        }
    }
}

impl NewIntervention {
    pub fn from_template(
        template: InterventionTemplate,
        student_id: Option<i64>,
        student_name: &str,
    ) -> Self {
        NewIntervention {
            student_id,
            student_name: student_name.to_string(),
            kind: template.kind,
            title: template.title,
            description: template.description,
            priority: template.priority,
            status: InterventionStatus::Pending,
            resources: template.resources,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub total_predictions: usize,
    /// Rounded to two decimals, 0 when nothing has been predicted
    pub average_score: f64,
    pub intervention_count: usize,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ==================== Student Operations ====================

    /// Persist a prediction and one pending intervention per recommendation
    pub fn save_prediction(&self, input: &RawInput, result: &PredictionResult) -> Result<i64> {
        self.save_prediction_at(input, result, Local::now().naive_local())
    }

    pub fn save_prediction_at(
        &self,
        input: &RawInput,
        result: &PredictionResult,
        at: NaiveDateTime,
    ) -> Result<i64> {
        let name = input.name_or_default();
        let [english, math, sciences, language] = input.grades();
        let [portfolio, coverletter, refletter] = input.ratings();
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        let recommendations = to_json(&result.recommendations)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"INSERT INTO students
               (name, gender, nationality, age, english_grade, math_grade, sciences_grade,
                language_grade, portfolio_rating, coverletter_rating, refletter_rating,
                predicted_score, predicted_grade, risk_level, confidence, recommendations,
                prediction_date)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"#,
            params![
                name,
                input.gender_or_empty(),
                input.nationality_or_empty(),
                input.age_or_default(),
                english,
                math,
                sciences,
                language,
                portfolio,
                coverletter,
                refletter,
                result.score,
                result.grade.as_str(),
                result.risk_level.as_str(),
                result.confidence,
                recommendations,
                timestamp,
            ],
        )?;
        let student_id = tx.last_insert_rowid();

        for rec in &result.recommendations {
            tx.execute(
                r#"INSERT INTO interventions
                   (student_id, student_name, intervention_type, title, description,
                    priority, status, resources, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                params![
                    student_id,
                    name,
                    rec.kind.as_str(),
                    rec.title,
                    rec.description,
                    rec.priority,
                    InterventionStatus::Pending.as_str(),
                    to_json(&rec.resources)?,
                    timestamp,
                ],
            )?;
        }
        tx.commit()?;

        log::info!(
            "Saved prediction {} for {} ({:.1}, {} interventions)",
            student_id,
            name,
            result.score,
            result.recommendations.len()
        );
        Ok(student_id)
    }

    /// Most recent predictions first
    pub fn recent_students(&self, limit: usize) -> Result<Vec<StudentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM students ORDER BY prediction_date DESC, id DESC LIMIT ?1",
        )?;
        let students = stmt
            .query_map(params![limit as i64], Self::row_to_student)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(students)
    }

    pub fn get_student(&self, id: i64) -> Result<StudentRecord> {
        self.conn
            .query_row(
                "SELECT * FROM students WHERE id = ?1",
                params![id],
                Self::row_to_student,
            )
            .optional()?
            .ok_or(PredictorError::StudentNotFound(id))
    }

    fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<StudentRecord> {
        let predicted_score: f64 = row.get("predicted_score")?;
        let (default_grade, default_risk) = classify(predicted_score);
        let grade: String = row.get("predicted_grade")?;
        let risk: String = row.get("risk_level")?;
        let recommendations: String = row.get("recommendations")?;
        let prediction_date: String = row.get("prediction_date")?;

        Ok(StudentRecord {
            id: row.get("id")?,
            name: row.get("name")?,
            gender: row.get("gender")?,
            nationality: row.get("nationality")?,
            age: row.get::<_, Option<f64>>("age")?.unwrap_or_default(),
            english_grade: row.get::<_, Option<f64>>("english_grade")?.unwrap_or_default(),
            math_grade: row.get::<_, Option<f64>>("math_grade")?.unwrap_or_default(),
            sciences_grade: row.get::<_, Option<f64>>("sciences_grade")?.unwrap_or_default(),
            language_grade: row.get::<_, Option<f64>>("language_grade")?.unwrap_or_default(),
            portfolio_rating: row.get::<_, Option<f64>>("portfolio_rating")?.unwrap_or_default(),
            coverletter_rating: row
                .get::<_, Option<f64>>("coverletter_rating")?
                .unwrap_or_default(),
            refletter_rating: row.get::<_, Option<f64>>("refletter_rating")?.unwrap_or_default(),
            predicted_score,
            predicted_grade: Grade::from_str_opt(&grade).unwrap_or(default_grade),
            risk_level: RiskLevel::from_str_opt(&risk).unwrap_or(default_risk),
            confidence: row.get("confidence")?,
            recommendations: serde_json::from_str(&recommendations).unwrap_or_default(),
            prediction_date: parse_timestamp(&prediction_date).unwrap_or_default(),
        })
    }

    // ==================== Intervention Operations ====================

    /// Newest first
    pub fn list_interventions(&self, limit: usize) -> Result<Vec<InterventionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT i.id, i.student_id, COALESCE(s.name, i.student_name) AS student_name,
                      i.intervention_type, i.title, i.description, i.priority, i.status,
                      i.resources, i.effectiveness_score, i.created_at, i.completed_at
               FROM interventions i
               LEFT JOIN students s ON i.student_id = s.id
               ORDER BY i.created_at DESC, i.id DESC
               LIMIT ?1"#,
        )?;
        let interventions = stmt
            .query_map(params![limit as i64], Self::row_to_intervention)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(interventions)
    }

    pub fn get_intervention(&self, id: i64) -> Result<InterventionRecord> {
        self.conn
            .query_row(
                r#"SELECT i.id, i.student_id, COALESCE(s.name, i.student_name) AS student_name,
                          i.intervention_type, i.title, i.description, i.priority, i.status,
                          i.resources, i.effectiveness_score, i.created_at, i.completed_at
                   FROM interventions i
                   LEFT JOIN students s ON i.student_id = s.id
                   WHERE i.id = ?1"#,
                params![id],
                Self::row_to_intervention,
            )
            .optional()?
            .ok_or(PredictorError::InterventionNotFound(id))
    }

    pub fn create_intervention(&self, new: &NewIntervention) -> Result<i64> {
        let created_at = Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string();
        self.conn.execute(
            r#"INSERT INTO interventions
               (student_id, student_name, intervention_type, title, description,
                priority, status, resources, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                new.student_id,
                new.student_name,
                new.kind.as_str(),
                new.title,
                new.description,
                new.priority,
                new.status.as_str(),
                to_json(&new.resources)?,
                created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Created intervention {}: {}", id, new.title);
        Ok(id)
    }

    /// Change status; `completed_at` is set only for completed interventions
    pub fn update_intervention_status(&self, id: i64, status: InterventionStatus) -> Result<()> {
        let completed_at = (status == InterventionStatus::Completed)
            .then(|| Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string());
        let changed = self.conn.execute(
            "UPDATE interventions SET status = ?1, completed_at = ?2 WHERE id = ?3",
            params![status.as_str(), completed_at, id],
        )?;
        if changed == 0 {
            return Err(PredictorError::InterventionNotFound(id));
        }
        log::info!("Intervention {} is now {}", id, status);
        Ok(())
    }

    /// Record how well an intervention worked, clamped to [0, 1]
    pub fn rate_intervention(&self, id: i64, effectiveness: f64) -> Result<()> {
        if !effectiveness.is_finite() {
            return Err(PredictorError::Parse(format!(
                "Effectiveness must be a number, got {}",
                effectiveness
            )));
        }
        let changed = self.conn.execute(
            "UPDATE interventions SET effectiveness_score = ?1 WHERE id = ?2",
            params![effectiveness.clamp(0.0, 1.0), id],
        )?;
        if changed == 0 {
            return Err(PredictorError::InterventionNotFound(id));
        }
        Ok(())
    }

    pub fn delete_intervention(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM interventions WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(PredictorError::InterventionNotFound(id));
        }
        log::info!("Deleted intervention {}", id);
        Ok(())
    }

    fn row_to_intervention(row: &rusqlite::Row) -> rusqlite::Result<InterventionRecord> {
        let kind: String = row.get("intervention_type")?;
        let status: String = row.get("status")?;
        let resources: String = row.get("resources")?;
        let created_at: String = row.get("created_at")?;
        let completed_at: Option<String> = row.get("completed_at")?;
        let priority: i64 = row.get("priority")?;

        Ok(InterventionRecord {
            id: row.get("id")?,
            student_id: row.get("student_id")?,
            student_name: row.get("student_name")?,
            kind: InterventionType::from_str_opt(&kind).unwrap_or(InterventionType::General),
            title: row.get("title")?,
            description: row.get("description")?,
            priority: u8::try_from(priority).unwrap_or(u8::MAX),
            status: status.parse().unwrap_or_default(),
            resources: serde_json::from_str(&resources).unwrap_or_default(),
            effectiveness_score: row.get("effectiveness_score")?,
            created_at: parse_timestamp(&created_at).unwrap_or_default(),
            completed_at: completed_at.as_deref().and_then(parse_timestamp),
        })
    }

    /// Drop every stored prediction and intervention and recreate the schema
    pub fn reset(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            r#"
            DROP TABLE IF EXISTS interventions;
            DROP TABLE IF EXISTS students;
            "#,
        )?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        log::info!("Database reset");
        Ok(())
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let total_predictions: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;

        let average_score: Option<f64> = self.conn.query_row(
            "SELECT AVG(predicted_score) FROM students",
            [],
            |row| row.get(0),
        )?;

        let intervention_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM interventions", [], |row| row.get(0))?;

        Ok(DatabaseStats {
            total_predictions: total_predictions as usize,
            average_score: round2(average_score.unwrap_or(0.0)),
            intervention_count: intervention_count as usize,
        })
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| PredictorError::Parse(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::interventions::FocusArea;
    use chrono::NaiveDate;

    pub(crate) fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    pub(crate) fn result_with(score: f64, recommendations: Vec<Recommendation>) -> PredictionResult {
        let (grade, risk_level) = classify(score);
        PredictionResult {
            score,
            grade,
            risk_level,
            confidence: 90.0,
            recommendations,
            model_predictions: Default::default(),
            feature_analysis: None,
            fallback: None,
        }
    }

    pub(crate) fn named(name: &str, nationality: &str) -> RawInput {
        RawInput {
            name: Some(name.to_string()),
            nationality: Some(nationality.to_string()),
            english_grade: Some(4.0),
            ..RawInput::default()
        }
    }

    fn tutoring() -> Recommendation {
        Recommendation {
            kind: InterventionType::AcademicSupport,
            title: "Academic Tutoring Program".to_string(),
            description: "Weekly tutoring sessions in weak subjects".to_string(),
            priority: 1,
            duration: "8 weeks".to_string(),
            resources: vec!["Tutor matching".to_string(), "Study materials".to_string()],
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.intervention_count, 0);
    }

    #[test]
    fn test_save_prediction_with_interventions() {
        let db = Database::in_memory().unwrap();
        let result = result_with(55.0, vec![tutoring()]);
        let id = db
            .save_prediction_at(&named("David Chen", "China"), &result, at(15, 9))
            .unwrap();

        let student = db.get_student(id).unwrap();
        assert_eq!(student.name, "David Chen");
        assert_eq!(student.english_grade, 4.0);
        assert_eq!(student.math_grade, 3.0);
        assert_eq!(student.predicted_grade, Grade::F);
        assert_eq!(student.risk_level, RiskLevel::Critical);
        assert_eq!(student.recommendations, vec![tutoring()]);
        assert_eq!(student.prediction_date, at(15, 9));

        let interventions = db.list_interventions(50).unwrap();
        assert_eq!(interventions.len(), 1);
        assert_eq!(interventions[0].student_id, Some(id));
        assert_eq!(interventions[0].status, InterventionStatus::Pending);
        assert_eq!(interventions[0].resources.len(), 2);
    }

    #[test]
    fn test_recent_students_newest_first() {
        let db = Database::in_memory().unwrap();
        for (day, name) in [(10, "Old"), (20, "Newest"), (15, "Middle")] {
            db.save_prediction_at(&named(name, "India"), &result_with(80.0, vec![]), at(day, 8))
                .unwrap();
        }
        let names: Vec<_> = db
            .recent_students(2)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Newest", "Middle"]);
    }

    #[test]
    fn test_unknown_student() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.get_student(42),
            Err(PredictorError::StudentNotFound(42))
        ));
    }

    #[test]
    fn test_intervention_lifecycle() {
        let db = Database::in_memory().unwrap();
        let template = InterventionTemplate::for_focus(FocusArea::Attendance, Some("Sarah"));
        let id = db
            .create_intervention(&NewIntervention::from_template(template, None, "Sarah"))
            .unwrap();

        let created = db.get_intervention(id).unwrap();
        assert_eq!(created.kind, InterventionType::AttendanceMonitoring);
        assert_eq!(created.title, "Attendance Improvement Initiative for Sarah");
        assert_eq!(created.completed_at, None);

        db.update_intervention_status(id, InterventionStatus::Completed)
            .unwrap();
        let completed = db.get_intervention(id).unwrap();
        assert_eq!(completed.status, InterventionStatus::Completed);
        assert!(completed.completed_at.is_some());

        db.update_intervention_status(id, InterventionStatus::Active)
            .unwrap();
        assert_eq!(db.get_intervention(id).unwrap().completed_at, None);

        db.rate_intervention(id, 1.7).unwrap();
        assert_eq!(db.get_intervention(id).unwrap().effectiveness_score, Some(1.0));

        db.delete_intervention(id).unwrap();
        assert!(matches!(
            db.delete_intervention(id),
            Err(PredictorError::InterventionNotFound(_))
        ));
        assert!(db
            .update_intervention_status(id, InterventionStatus::Active)
            .is_err());
    }

    #[test]
    fn test_manual_intervention_defaults() {
        let db = Database::in_memory().unwrap();
        let id = db.create_intervention(&NewIntervention::default()).unwrap();
        let record = db.get_intervention(id).unwrap();
        assert_eq!(record.kind, InterventionType::General);
        assert_eq!(record.student_name, "Unknown");
        assert_eq!(record.priority, 3);
    }

    #[test]
    fn test_stats() {
        let db = Database::in_memory().unwrap();
        db.save_prediction_at(&named("A", "US"), &result_with(80.0, vec![tutoring()]), at(1, 1))
            .unwrap();
        db.save_prediction_at(&named("B", "US"), &result_with(71.34, vec![]), at(2, 1))
            .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_predictions, 2);
        assert_eq!(stats.average_score, 75.67);
        assert_eq!(stats.intervention_count, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let db = Database::in_memory().unwrap();
        db.save_prediction_at(&named("A", "US"), &result_with(80.0, vec![tutoring()]), at(1, 1))
            .unwrap();
        db.create_intervention(&NewIntervention::default()).unwrap();

        db.reset().unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.intervention_count, 0);
        assert!(db.list_interventions(10).unwrap().is_empty());

        // The schema is usable again and ids start over
        let id = db
            .save_prediction_at(&named("B", "UK"), &result_with(70.0, vec![]), at(2, 1))
            .unwrap();
        assert_eq!(id, 1);
    }
}
