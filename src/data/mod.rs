//! Data storage
//!
//! SQLite persistence for predictions and interventions, plus dashboard
//! analytics over them.

pub mod analytics;
pub mod database;

pub use analytics::{format_dashboard, DashboardAnalytics};
pub use database::{Database, DatabaseStats, InterventionRecord, NewIntervention, StudentRecord};
