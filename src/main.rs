use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};
use uuid::Uuid;

mod aggregator;
mod db;
mod error;
mod models;
mod report;
mod scale;
mod store;

use aggregator::{GradeAggregator, MutationOutcome};
use models::{ComponentDraft, CourseStanding, TermSummary};
use store::{GradeStore, PgGradeStore};

#[derive(Parser)]
#[command(name = "unisum")]
#[command(about = "University GPA and grade tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TermScope {
    #[arg(long)]
    email: String,
    #[arg(long)]
    class_level: String,
    #[arg(long)]
    term_number: i32,
}

#[derive(Args)]
struct CourseScope {
    #[command(flatten)]
    term: TermScope,
    #[arg(long)]
    course: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Register a student (upserts on email)
    AddStudent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        university: Option<String>,
        #[arg(long)]
        department: Option<String>,
    },
    /// Add a term for a student
    AddTerm {
        #[command(flatten)]
        scope: TermScope,
    },
    /// List a student's terms
    Terms {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Remove a term and everything in it
    RemoveTerm {
        #[command(flatten)]
        scope: TermScope,
    },
    /// Add a course to a term
    AddCourse {
        #[command(flatten)]
        scope: TermScope,
        #[arg(long)]
        name: String,
        #[arg(long)]
        credits: f64,
    },
    /// List the courses of a term
    Courses {
        #[command(flatten)]
        scope: TermScope,
        #[arg(long)]
        json: bool,
    },
    /// Remove a course and its grades
    RemoveCourse {
        #[command(flatten)]
        scope: CourseScope,
    },
    /// Add a weighted grade component to a course
    AddGrade {
        #[command(flatten)]
        scope: CourseScope,
        #[arg(long)]
        label: String,
        #[arg(long)]
        score: f64,
        #[arg(long)]
        weight: f64,
    },
    /// Edit a grade component by id
    UpdateGrade {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        label: String,
        #[arg(long)]
        score: f64,
        #[arg(long)]
        weight: f64,
    },
    /// Remove a grade component by id
    RemoveGrade {
        #[arg(long)]
        id: Uuid,
    },
    /// List the grade components of a course
    Grades {
        #[command(flatten)]
        scope: CourseScope,
        #[arg(long)]
        json: bool,
    },
    /// Show the effective grade scale of a course
    Scale {
        #[command(flatten)]
        scope: CourseScope,
        #[arg(long)]
        json: bool,
    },
    /// Override one letter band of a course's grade scale
    SetScale {
        #[command(flatten)]
        scope: CourseScope,
        #[arg(long)]
        letter: String,
        #[arg(long)]
        min_score: i32,
        #[arg(long)]
        gpa_point: f64,
    },
    /// Drop one override, or all of them, restoring the defaults
    ResetScale {
        #[command(flatten)]
        scope: CourseScope,
        #[arg(long)]
        letter: Option<String>,
    },
    /// Import grades from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write a markdown transcript for a student
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "transcript.md")]
        out: PathBuf,
    },
}

fn standing_summary(course_name: &str, standing: &CourseStanding, term: &TermSummary) -> String {
    let mut out = String::new();
    match (&standing.letter_grade, standing.gpa_point) {
        (Some(letter), Some(gpa_point)) => {
            let _ = writeln!(
                out,
                "{course_name}: average {:.1}, {letter} ({gpa_point:.2})",
                standing.average
            );
        }
        _ => {
            let _ = writeln!(out, "{course_name}: no grades yet");
        }
    }
    match term.gpa {
        Some(gpa) => {
            let _ = writeln!(
                out,
                "Term GPA: {gpa:.2} over {} graded credits",
                term.total_credits
            );
        }
        None => {
            let _ = writeln!(out, "Term GPA: not yet available");
        }
    }
    out
}

fn print_outcome(course_name: &str, outcome: &MutationOutcome) {
    print!(
        "{}",
        standing_summary(course_name, &outcome.standing, &outcome.term)
    );
}

async fn recompute_and_print(pool: &PgPool, course_id: Uuid) -> anyhow::Result<()> {
    let store = PgGradeStore::new(pool.clone());
    let mut aggregator = GradeAggregator::open(store, course_id).await?;
    let (standing, term) = aggregator.recompute().await?;
    print!(
        "{}",
        standing_summary(&aggregator.course().name, &standing, &term)
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let cli = Cli::parse();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set to a Postgres instance")?;

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
        Commands::AddStudent {
            name,
            email,
            university,
            department,
        } => {
            let student = db::upsert_student(
                &pool,
                &name,
                &email,
                university.as_deref(),
                department.as_deref(),
            )
            .await?;
            println!("Registered {} ({}).", student.full_name, student.email);
        }
        Commands::AddTerm { scope } => {
            let student = db::student_by_email(&pool, &scope.email).await?;
            let term =
                db::upsert_term(&pool, student.id, &scope.class_level, scope.term_number).await?;
            println!(
                "Added {} term {} for {}.",
                term.class_level, term.term_number, student.full_name
            );
        }
        Commands::Terms { email, json } => {
            let student = db::student_by_email(&pool, &email).await?;
            let terms = db::terms_for_student(&pool, student.id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&terms)?);
            } else if terms.is_empty() {
                println!("No terms recorded for {}.", student.full_name);
            } else {
                for term in &terms {
                    match term.gpa {
                        Some(gpa) => println!(
                            "- {} term {}: GPA {gpa:.2} over {} credits",
                            term.class_level, term.term_number, term.total_credits
                        ),
                        None => println!(
                            "- {} term {}: no grades yet",
                            term.class_level, term.term_number
                        ),
                    }
                }
            }
        }
        Commands::RemoveTerm { scope } => {
            let term =
                db::resolve_term(&pool, &scope.email, &scope.class_level, scope.term_number)
                    .await?;
            db::remove_term(&pool, term.id).await?;
            println!("Removed {} term {}.", scope.class_level, scope.term_number);
        }
        Commands::AddCourse {
            scope,
            name,
            credits,
        } => {
            let term =
                db::resolve_term(&pool, &scope.email, &scope.class_level, scope.term_number)
                    .await?;
            let course = db::upsert_course(&pool, term.id, &name, credits).await?;
            println!("Added {} ({} credits).", course.name, course.credits);
        }
        Commands::Courses { scope, json } => {
            let term =
                db::resolve_term(&pool, &scope.email, &scope.class_level, scope.term_number)
                    .await?;
            let store = PgGradeStore::new(pool.clone());
            let courses = store.term_courses(term.id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&courses)?);
            } else if courses.is_empty() {
                println!("No courses recorded.");
            } else {
                for course in &courses {
                    match (&course.letter_grade, course.gpa_point) {
                        (Some(letter), Some(gpa_point)) => println!(
                            "- {} ({} credits): average {:.1}, {letter} ({gpa_point:.2})",
                            course.name, course.credits, course.average
                        ),
                        _ => println!(
                            "- {} ({} credits): no grades yet",
                            course.name, course.credits
                        ),
                    }
                }
            }
        }
        Commands::RemoveCourse { scope } => {
            let course = db::resolve_course(
                &pool,
                &scope.term.email,
                &scope.term.class_level,
                scope.term.term_number,
                &scope.course,
            )
            .await?;
            db::remove_course(&pool, course.id).await?;
            println!("Removed {}.", course.name);
        }
        Commands::AddGrade {
            scope,
            label,
            score,
            weight,
        } => {
            let course = db::resolve_course(
                &pool,
                &scope.term.email,
                &scope.term.class_level,
                scope.term.term_number,
                &scope.course,
            )
            .await?;
            let store = PgGradeStore::new(pool.clone());
            let mut aggregator = GradeAggregator::open(store, course.id).await?;
            let outcome = aggregator
                .add_component(ComponentDraft {
                    label,
                    score,
                    weight,
                })
                .await?;
            println!(
                "Added {} ({}): {} of weight {}.",
                outcome.component.label,
                outcome.component.id,
                outcome.component.score,
                outcome.component.weight
            );
            print_outcome(&course.name, &outcome);
        }
        Commands::UpdateGrade {
            id,
            label,
            score,
            weight,
        } => {
            let course_id = db::course_of_component(&pool, id).await?;
            let store = PgGradeStore::new(pool.clone());
            let mut aggregator = GradeAggregator::open(store, course_id).await?;
            let outcome = aggregator
                .update_component(
                    id,
                    ComponentDraft {
                        label,
                        score,
                        weight,
                    },
                )
                .await?;
            let name = aggregator.course().name.clone();
            print_outcome(&name, &outcome);
        }
        Commands::RemoveGrade { id } => {
            let course_id = db::course_of_component(&pool, id).await?;
            let store = PgGradeStore::new(pool.clone());
            let mut aggregator = GradeAggregator::open(store, course_id).await?;
            let outcome = aggregator.remove_component(id).await?;
            println!("Removed {}.", outcome.component.label);
            let name = aggregator.course().name.clone();
            print_outcome(&name, &outcome);
        }
        Commands::Grades { scope, json } => {
            let course = db::resolve_course(
                &pool,
                &scope.term.email,
                &scope.term.class_level,
                scope.term.term_number,
                &scope.course,
            )
            .await?;
            let components = db::components_for_course(&pool, course.id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&components)?);
            } else if components.is_empty() {
                println!("No grades recorded for {}.", course.name);
            } else {
                for component in &components {
                    println!(
                        "- {} ({}): score {} at weight {}",
                        component.label, component.id, component.score, component.weight
                    );
                }
                let remaining = aggregator::remaining_weight(&components, None);
                println!("Remaining weight budget: {remaining}.");
            }
        }
        Commands::Scale { scope, json } => {
            let course = db::resolve_course(
                &pool,
                &scope.term.email,
                &scope.term.class_level,
                scope.term.term_number,
                &scope.course,
            )
            .await?;
            let store = PgGradeStore::new(pool.clone());
            let custom = store.custom_scale(course.id).await?;
            let effective = scale::merge_overrides(course.id, &custom);
            if json {
                println!("{}", serde_json::to_string_pretty(&effective)?);
            } else {
                println!("Grade scale for {}:", course.name);
                for entry in &effective {
                    let marker = if entry.is_custom { " (custom)" } else { "" };
                    println!(
                        "- {} from {}: {:.2}{marker}",
                        entry.letter, entry.min_score, entry.gpa_point
                    );
                }
            }
        }
        Commands::SetScale {
            scope,
            letter,
            min_score,
            gpa_point,
        } => {
            let course = db::resolve_course(
                &pool,
                &scope.term.email,
                &scope.term.class_level,
                scope.term.term_number,
                &scope.course,
            )
            .await?;
            let entry = scale::override_entry(course.id, &letter, min_score, gpa_point)?;
            let store = PgGradeStore::new(pool.clone());
            let stored = store.upsert_scale_entry(course.id, &entry).await?;
            println!(
                "Set {} to ({}, {:.2}) for {}.",
                stored.letter, stored.min_score, stored.gpa_point, course.name
            );
            recompute_and_print(&pool, course.id).await?;
        }
        Commands::ResetScale { scope, letter } => {
            let course = db::resolve_course(
                &pool,
                &scope.term.email,
                &scope.term.class_level,
                scope.term.term_number,
                &scope.course,
            )
            .await?;
            let store = PgGradeStore::new(pool.clone());
            match letter {
                Some(letter) => {
                    let letter = letter.to_ascii_uppercase();
                    store.remove_scale_entry(course.id, &letter).await?;
                    println!("Restored the default {letter} band for {}.", course.name);
                }
                None => {
                    store.clear_custom_scale(course.id).await?;
                    println!("Restored the default scale for {}.", course.name);
                }
            }
            recompute_and_print(&pool, course.id).await?;
        }
        Commands::Import { csv } => {
            let outcome = db::import_csv(&pool, &csv).await?;
            println!(
                "Imported {} grades from {} ({} rejected).",
                outcome.inserted,
                csv.display(),
                outcome.rejected
            );
        }
        Commands::Report { email, out } => {
            let student = db::student_by_email(&pool, &email).await?;
            let terms = db::terms_for_student(&pool, student.id).await?;
            let store = PgGradeStore::new(pool.clone());
            let mut terms_with_courses = Vec::with_capacity(terms.len());
            for term in terms {
                let courses = store.term_courses(term.id).await?;
                terms_with_courses.push((term, courses));
            }
            let report = report::build_report(&student, &terms_with_courses);
            std::fs::write(&out, report)?;
            println!("Transcript written to {}.", out.display());
        }
    }

    Ok(())
}
