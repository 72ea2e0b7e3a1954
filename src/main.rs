use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod browse;
mod db;
mod models;
mod ratings;
mod report;

use models::{ReviewScores, SortKey};

#[derive(Parser)]
#[command(name = "course-ratings")]
#[command(about = "Course rating store, aggregation, and comparison service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Create or update a doctor record
    AddDoctor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        department: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        bio: String,
    },
    /// Link a doctor record to its teacher account
    LinkTeacher {
        #[arg(long)]
        doctor_id: Uuid,
        #[arg(long)]
        email: String,
    },
    /// Submit one review for a doctor
    AddReview {
        #[arg(long)]
        doctor_id: Uuid,
        #[arg(long)]
        teaching: f64,
        #[arg(long)]
        availability: f64,
        #[arg(long)]
        communication: f64,
        #[arg(long)]
        knowledge: f64,
        #[arg(long)]
        fairness: f64,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, default_value = "anonymous")]
        reviewer: String,
    },
    /// Import reviews from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Ranked doctor listing with search and department filters
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long, default_value = "rating")]
        sort: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Side-by-side factor comparison of 2-3 doctors
    Compare {
        /// Comma-separated doctor ids
        #[arg(long)]
        ids: String,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["department", "doctor_id"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        doctor_id: Option<Uuid>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::AddDoctor {
            name,
            department,
            title,
            bio,
        } => {
            let id = db::insert_doctor(&pool, &name, &department, &title, &bio).await?;
            println!("Doctor {name} recorded with id {id}.");
        }
        Commands::LinkTeacher { doctor_id, email } => {
            let full_name = db::link_teacher(&pool, doctor_id, &email).await?;
            println!("Doctor {doctor_id} linked to teacher {full_name}.");
        }
        Commands::AddReview {
            doctor_id,
            teaching,
            availability,
            communication,
            knowledge,
            fairness,
            comment,
            reviewer,
        } => {
            let scores = ReviewScores {
                teaching_quality: teaching,
                availability,
                communication,
                knowledge,
                fairness,
            };
            if let Some(factor) = ratings::invalid_factor(&scores) {
                bail!("{factor} score must sit on the 0.0-5.0 scale in 0.5 steps");
            }
            let id =
                db::insert_review(&pool, doctor_id, &scores, comment.as_deref(), &reviewer).await?;
            println!("Review {id} recorded.");
        }
        Commands::Import { csv } => {
            let outcome = db::import_csv(&pool, &csv).await?;
            for reason in &outcome.skipped {
                println!("Skipped {reason}");
            }
            println!(
                "Inserted {} reviews from {} ({} rows skipped).",
                outcome.inserted,
                csv.display(),
                outcome.skipped.len()
            );
        }
        Commands::List {
            search,
            department,
            sort,
            limit,
            json,
        } => {
            let sort_key: SortKey = sort.parse()?;
            let doctors = db::load_doctors_with_ratings(&pool).await?;

            if let Some(dept) = &department {
                let known = browse::departments(&doctors);
                if !known.iter().any(|d| d == dept) {
                    bail!("unknown department {dept} (known: {})", known.join(", "));
                }
            }

            let mut listed =
                browse::filter_doctors(&doctors, search.as_deref(), department.as_deref());
            browse::sort_doctors(&mut listed, sort_key);
            listed.truncate(limit);

            if listed.is_empty() {
                println!("No doctors match.");
                return Ok(());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                for doctor in &listed {
                    println!(
                        "- {} ({}, {}) overall {:.1} across {} reviews",
                        doctor.name,
                        doctor.title,
                        doctor.department,
                        doctor.ratings.overall_rating,
                        doctor.ratings.total_reviews
                    );
                }
            }
        }
        Commands::Compare { ids } => {
            let mut parsed = Vec::new();
            for part in ids.split(',') {
                let id = Uuid::parse_str(part.trim())
                    .with_context(|| format!("invalid doctor id: {part}"))?;
                parsed.push(id);
            }
            if parsed.len() > browse::COMPARE_LIMIT {
                bail!("compare takes at most {} doctor ids", browse::COMPARE_LIMIT);
            }

            let mut set = browse::CompareSet::default();
            for id in parsed {
                set.toggle(id);
            }
            if set.len() < 2 {
                bail!("compare needs at least 2 distinct doctor ids");
            }

            let doctors = db::load_doctors_with_ratings(&pool).await?;
            let mut selected = Vec::new();
            for id in set.ids() {
                let doctor = doctors
                    .iter()
                    .find(|doctor| doctor.id == *id)
                    .with_context(|| format!("no doctor with id {id}"))?;
                selected.push(doctor.clone());
            }

            print!("{}", report::build_comparison(&selected));
        }
        Commands::Report {
            department,
            doctor_id,
            out,
        } => {
            let doctors = db::load_doctors_with_ratings(&pool).await?;

            let (scope, scoped): (Option<String>, Vec<_>) = match (&department, doctor_id) {
                (Some(dept), _) => (
                    Some(dept.clone()),
                    browse::filter_doctors(&doctors, None, Some(dept.as_str())),
                ),
                (None, Some(id)) => {
                    let doctor = doctors
                        .iter()
                        .find(|doctor| doctor.id == id)
                        .with_context(|| format!("no doctor with id {id}"))?;
                    (Some(doctor.name.clone()), vec![doctor.clone()])
                }
                (None, None) => (None, doctors.clone()),
            };

            let mut reviews = db::fetch_reviews(&pool, doctor_id).await?;
            if doctor_id.is_none() {
                let scoped_ids: Vec<Uuid> = scoped.iter().map(|doctor| doctor.id).collect();
                reviews.retain(|review| scoped_ids.contains(&review.doctor_id));
            }

            let report = report::build_report(scope.as_deref(), &scoped, &reviews);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
