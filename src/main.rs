//! Student Performance Prediction CLI
//!
//! Scores students with the trained model ensemble and manages the resulting
//! interventions.

use clap::{Args, Parser, Subcommand};
use student_performance::{Config, Result};

#[derive(Parser)]
#[command(name = "student")]
#[command(about = "Student performance prediction and intervention planning", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Predict a student's performance
    Predict {
        /// JSON file with student attributes
        #[arg(long)]
        input: Option<String>,
        #[command(flatten)]
        student: StudentArgs,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Don't store the prediction
        #[arg(long)]
        no_save: bool,
    },
    /// List recent predictions
    Students {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show prediction statistics
    Stats,
    /// Delete all predictions and interventions
    Reset,
    /// Show dashboard analytics
    Dashboard {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Intervention management commands
    Interventions {
        #[command(subcommand)]
        action: InterventionCommands,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
}

/// Student attributes; each overrides the value from --input
#[derive(Args, Default)]
struct StudentArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    english: Option<f64>,
    #[arg(long)]
    math: Option<f64>,
    #[arg(long)]
    sciences: Option<f64>,
    #[arg(long)]
    language: Option<f64>,
    #[arg(long)]
    portfolio: Option<f64>,
    #[arg(long)]
    coverletter: Option<f64>,
    #[arg(long)]
    refletter: Option<f64>,
    #[arg(long)]
    age: Option<f64>,
    /// Fraction of classes attended (0-1)
    #[arg(long)]
    attendance: Option<f64>,
    #[arg(long)]
    extracurricular: Option<f64>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    nationality: Option<String>,
    #[arg(long)]
    ethnic_group: Option<String>,
}

#[derive(Subcommand)]
enum InterventionCommands {
    /// List interventions, newest first
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Create an intervention manually
    Create {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        student_id: Option<i64>,
        #[arg(long)]
        student_name: Option<String>,
        /// Intervention type, e.g. academic_support
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<u8>,
        /// Repeat for each resource
        #[arg(long = "resource")]
        resources: Vec<String>,
    },
    /// Change an intervention's status
    Status {
        id: i64,
        /// pending, active, completed or cancelled
        status: String,
        /// Effectiveness rating (0-1)
        #[arg(long)]
        effectiveness: Option<f64>,
    },
    /// Delete an intervention
    Delete { id: i64 },
    /// Suggest an intervention from a template
    Suggest {
        #[arg(long)]
        student_id: Option<i64>,
        /// academic, attendance, extracurricular or application
        #[arg(long, default_value = "academic")]
        focus: String,
        /// Store the suggestion as a pending intervention
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Predict {
            input,
            student,
            format,
            no_save,
        } => commands::predict(&config, input, student, format, no_save),
        Commands::Students { limit } => commands::students(&config, limit),
        Commands::Stats => commands::stats(&config),
        Commands::Reset => commands::reset(&config),
        Commands::Dashboard { format } => commands::dashboard(&config, format),
        Commands::Interventions { action } => match action {
            InterventionCommands::List { limit, format } => {
                commands::interventions_list(&config, limit, format)
            }
            InterventionCommands::Create {
                title,
                student_id,
                student_name,
                kind,
                description,
                priority,
                resources,
            } => commands::interventions_create(
                &config,
                title,
                student_id,
                student_name,
                kind,
                description,
                priority,
                resources,
            ),
            InterventionCommands::Status {
                id,
                status,
                effectiveness,
            } => commands::interventions_status(&config, id, &status, effectiveness),
            InterventionCommands::Delete { id } => commands::interventions_delete(&config, id),
            InterventionCommands::Suggest {
                student_id,
                focus,
                save,
            } => commands::interventions_suggest(&config, student_id, &focus, save),
        },
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use student_performance::data::{format_dashboard, Database, NewIntervention};
    use student_performance::features::RawInput;
    use student_performance::interventions::{
        FocusArea, InterventionStatus, InterventionTemplate, InterventionType,
    };
    use student_performance::predict::{format_prediction, ModelBundle, PerformancePredictor};
    use student_performance::PredictorError;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        // Create data directories
        if let Some(parent) = std::path::Path::new(&config.data.database_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!("Created database/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!(
            "  2. Export trained models into {}/ (feature_columns.txt, scaler.json, ...)",
            config.data.model_dir
        );
        println!("  3. Run 'student predict --english 4 --math 3.5' to make predictions");

        Ok(())
    }

    fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string_pretty(value).map_err(|e| PredictorError::Parse(e.to_string()))
    }

    fn build_input(input: Option<String>, args: StudentArgs) -> Result<RawInput> {
        let mut raw = match input {
            Some(path) => RawInput::from_json_str(&std::fs::read_to_string(&path)?)?,
            None => RawInput::default(),
        };

        let StudentArgs {
            name,
            english,
            math,
            sciences,
            language,
            portfolio,
            coverletter,
            refletter,
            age,
            attendance,
            extracurricular,
            gender,
            nationality,
            ethnic_group,
        } = args;

        raw.name = name.or(raw.name);
        raw.english_grade = english.or(raw.english_grade);
        raw.math_grade = math.or(raw.math_grade);
        raw.sciences_grade = sciences.or(raw.sciences_grade);
        raw.language_grade = language.or(raw.language_grade);
        raw.portfolio_rating = portfolio.or(raw.portfolio_rating);
        raw.coverletter_rating = coverletter.or(raw.coverletter_rating);
        raw.refletter_rating = refletter.or(raw.refletter_rating);
        raw.age = age.or(raw.age);
        raw.attendance_rate = attendance.or(raw.attendance_rate);
        raw.extracurricular_level = extracurricular.or(raw.extracurricular_level);
        raw.gender = gender.or(raw.gender);
        raw.nationality = nationality.or(raw.nationality);
        raw.ethnic_group = ethnic_group.or(raw.ethnic_group);
        Ok(raw)
    }

    pub fn predict(
        config: &Config,
        input: Option<String>,
        student: StudentArgs,
        format: OutputFormat,
        no_save: bool,
    ) -> Result<()> {
        let raw = build_input(input, student)?;
        let predictor = PerformancePredictor::from_model_dir(config);
        let result = predictor.predict(&raw);

        let student_id = if no_save || result.is_fallback() {
            None
        } else {
            let db = Database::open(&config.data.database_path)?;
            Some(db.save_prediction(&raw, &result)?)
        };

        match format {
            OutputFormat::Table => {
                print!("{}", format_prediction(&result, raw.name_or_default()));
                if let Some(id) = student_id {
                    println!("Saved as student {}", id);
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "success": true,
                    "name": raw.name_or_default(),
                    "prediction": result,
                    "student_id": student_id,
                });
                println!("{}", to_pretty_json(&json)?);
            }
            OutputFormat::Csv => {
                println!("name,score,grade,risk_level,confidence,recommendations,fallback");
                println!(
                    "{},{:.2},{},{},{:.1},{},{}",
                    raw.name_or_default(),
                    result.score,
                    result.grade,
                    result.risk_level,
                    result.confidence,
                    result.recommendations.len(),
                    result.is_fallback()
                );
            }
        }

        Ok(())
    }

    pub fn students(config: &Config, limit: usize) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let students = db.recent_students(limit)?;
        if students.is_empty() {
            println!("No predictions stored yet.");
            return Ok(());
        }

        println!(
            "{:>5}  {:<24} {:>6} {:>5}  {:<8} {}",
            "ID", "Name", "Score", "Grade", "Risk", "Date"
        );
        println!("{}", "-".repeat(72));
        for s in students {
            println!(
                "{:>5}  {:<24} {:>6.1} {:>5}  {:<8} {}",
                s.id, s.name, s.predicted_score, s.predicted_grade, s.risk_level, s.prediction_date
            );
        }
        Ok(())
    }

    pub fn stats(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Prediction Statistics");
        println!("───────────────────────────────");
        println!("  Database:       {}", config.data.database_path);
        println!("  Predictions:    {}", stats.total_predictions);
        println!("  Average score:  {:.2}", stats.average_score);
        println!("  Interventions:  {}", stats.intervention_count);

        Ok(())
    }

    pub fn reset(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        db.reset()?;
        println!("Database reset: {}", config.data.database_path);
        Ok(())
    }

    pub fn dashboard(config: &Config, format: OutputFormat) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let analytics = db.dashboard_or_demo();

        match format {
            OutputFormat::Json => println!("{}", to_pretty_json(&analytics)?),
            OutputFormat::Table => print!("{}", format_dashboard(&analytics)),
            OutputFormat::Csv => {
                return Err(PredictorError::Config(
                    "Dashboard supports table or json output".to_string(),
                ))
            }
        }
        Ok(())
    }

    pub fn interventions_list(config: &Config, limit: usize, format: OutputFormat) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let interventions = db.list_interventions(limit)?;

        match format {
            OutputFormat::Json => println!("{}", to_pretty_json(&interventions)?),
            OutputFormat::Csv => {
                println!("id,student_id,student_name,type,title,priority,status,created_at");
                for i in &interventions {
                    println!(
                        "{},{},{},{},{},{},{},{}",
                        i.id,
                        i.student_id.map(|id| id.to_string()).unwrap_or_default(),
                        i.student_name,
                        i.kind,
                        i.title,
                        i.priority,
                        i.status,
                        i.created_at
                    );
                }
            }
            OutputFormat::Table => {
                if interventions.is_empty() {
                    println!("No interventions.");
                    return Ok(());
                }
                println!(
                    "{:>5}  {:<20} {:<40} {:>3}  {:<10}",
                    "ID", "Student", "Title", "P", "Status"
                );
                println!("{}", "-".repeat(84));
                for i in interventions {
                    println!(
                        "{:>5}  {:<20} {:<40} {:>3}  {:<10}",
                        i.id, i.student_name, i.title, i.priority, i.status
                    );
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn interventions_create(
        config: &Config,
        title: Option<String>,
        student_id: Option<i64>,
        student_name: Option<String>,
        kind: Option<String>,
        description: Option<String>,
        priority: Option<u8>,
        resources: Vec<String>,
    ) -> Result<()> {
        let defaults = NewIntervention::default();
        let kind = match kind {
            Some(k) => InterventionType::from_str_opt(&k)
                .ok_or_else(|| PredictorError::Parse(format!("Unknown intervention type: {}", k)))?,
            None => defaults.kind,
        };

        let new = NewIntervention {
            student_id,
            student_name: student_name.unwrap_or(defaults.student_name),
            kind,
            title: title.unwrap_or(defaults.title),
            description: description.unwrap_or(defaults.description),
            priority: priority.unwrap_or(defaults.priority),
            status: InterventionStatus::Pending,
            resources,
        };

        let db = Database::open(&config.data.database_path)?;
        let id = db.create_intervention(&new)?;
        println!("Intervention created successfully (ID {})", id);
        Ok(())
    }

    pub fn interventions_status(
        config: &Config,
        id: i64,
        status: &str,
        effectiveness: Option<f64>,
    ) -> Result<()> {
        let status: InterventionStatus = status.parse()?;
        let db = Database::open(&config.data.database_path)?;
        db.update_intervention_status(id, status)?;
        if let Some(score) = effectiveness {
            db.rate_intervention(id, score)?;
        }
        println!("Intervention {} updated to {}", id, status);
        Ok(())
    }

    pub fn interventions_delete(config: &Config, id: i64) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        db.delete_intervention(id)?;
        println!("Intervention {} deleted", id);
        Ok(())
    }

    pub fn interventions_suggest(
        config: &Config,
        student_id: Option<i64>,
        focus: &str,
        save: bool,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let student_name = match student_id {
            Some(id) => Some(db.get_student(id)?.name),
            None => None,
        };

        let template =
            InterventionTemplate::for_focus(FocusArea::parse_or_default(focus), student_name.as_deref());

        println!("{}", template.title);
        println!("  Type:        {}", template.kind);
        println!("  Priority:    {}", template.priority);
        println!("  Description: {}", template.description);
        println!("  Resources:   {}", template.resources.join(", "));

        if save {
            let name = student_name.unwrap_or_else(|| "Unknown".to_string());
            let id = db.create_intervention(&NewIntervention::from_template(
                template, student_id, &name,
            ))?;
            println!("\nSaved as intervention {}", id);
        }
        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let bundle = ModelBundle::load(std::path::Path::new(&config.data.model_dir))?;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Directory:      {}", config.data.model_dir);
        println!("  Features:       {}", bundle.feature_columns().len());
        println!("  Models:");
        for kind in bundle.model_kinds() {
            match config.ensemble.weight_for(kind) {
                Some(weight) => println!("    {:<16} weight {:.2}", kind, weight),
                None => println!("    {:<16} reported only", kind),
            }
        }
        println!("  Encoded classes:");
        println!("    gender:       {}", bundle.encoders().gender.len());
        println!("    nationality:  {}", bundle.encoders().nationality.len());
        println!("    ethnic.group: {}", bundle.encoders().ethnic_group.len());
        println!("  Feature order:");
        for (i, name) in bundle.feature_columns().iter().enumerate() {
            println!("    {:>2}. {}", i, name);
        }

        Ok(())
    }
}
