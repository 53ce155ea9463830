use std::path::Path;

use anyhow::{bail, Context};
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

use crate::aggregator::{self, GradeAggregator};
use crate::error::GradeError;
use crate::models::{ComponentDraft, Course, GradeComponent, Student, Term};
use crate::scale;
use crate::store::{GradeStore, PgGradeStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn upsert_student(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    university: Option<&str>,
    department: Option<&str>,
) -> anyhow::Result<Student> {
    let row = sqlx::query(
        r#"
        INSERT INTO gpa_tracker.students (id, full_name, email, university, department)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            university = COALESCE(EXCLUDED.university, gpa_tracker.students.university),
            department = COALESCE(EXCLUDED.department, gpa_tracker.students.department)
        RETURNING id, full_name, email, university, department
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(university)
    .bind(department)
    .fetch_one(pool)
    .await?;

    Ok(Student {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        university: row.get("university"),
        department: row.get("department"),
    })
}

pub async fn student_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Student> {
    let row = sqlx::query(
        "SELECT id, full_name, email, university, department \
         FROM gpa_tracker.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Student {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            university: row.get("university"),
            department: row.get("department"),
        }),
        None => bail!("no student registered with email {email}"),
    }
}

fn term_from_row(row: &sqlx::postgres::PgRow) -> Term {
    Term {
        id: row.get("id"),
        student_id: row.get("student_id"),
        class_level: row.get("class_level"),
        term_number: row.get("term_number"),
        gpa: row.get("gpa"),
        total_credits: row.get("total_credits"),
    }
}

pub async fn upsert_term(
    pool: &PgPool,
    student_id: Uuid,
    class_level: &str,
    term_number: i32,
) -> anyhow::Result<Term> {
    let row = sqlx::query(
        r#"
        INSERT INTO gpa_tracker.terms (id, student_id, class_level, term_number)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, class_level, term_number) DO UPDATE
        SET class_level = EXCLUDED.class_level
        RETURNING id, student_id, class_level, term_number, gpa, total_credits
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(class_level)
    .bind(term_number)
    .fetch_one(pool)
    .await?;

    Ok(term_from_row(&row))
}

pub async fn terms_for_student(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Vec<Term>> {
    let rows = sqlx::query(
        "SELECT id, student_id, class_level, term_number, gpa, total_credits \
         FROM gpa_tracker.terms \
         WHERE student_id = $1 \
         ORDER BY class_level, term_number",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(term_from_row).collect())
}

pub async fn resolve_term(
    pool: &PgPool,
    email: &str,
    class_level: &str,
    term_number: i32,
) -> anyhow::Result<Term> {
    let student = student_by_email(pool, email).await?;
    let row = sqlx::query(
        "SELECT id, student_id, class_level, term_number, gpa, total_credits \
         FROM gpa_tracker.terms \
         WHERE student_id = $1 AND class_level = $2 AND term_number = $3",
    )
    .bind(student.id)
    .bind(class_level)
    .bind(term_number)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(term_from_row(&row)),
        None => bail!(
            "no term {class_level} #{term_number} for {}; create it with add-term",
            student.full_name
        ),
    }
}

pub async fn remove_term(pool: &PgPool, term_id: Uuid) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM gpa_tracker.terms WHERE id = $1")
        .bind(term_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        bail!("term {term_id} not found");
    }
    Ok(())
}

pub async fn upsert_course(
    pool: &PgPool,
    term_id: Uuid,
    name: &str,
    credits: f64,
) -> anyhow::Result<Course> {
    let row = sqlx::query(
        r#"
        INSERT INTO gpa_tracker.courses (id, term_id, name, credits)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (term_id, name) DO UPDATE
        SET credits = EXCLUDED.credits
        RETURNING id, term_id, name, credits, average, letter_grade, gpa_point
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(term_id)
    .bind(name)
    .bind(credits)
    .fetch_one(pool)
    .await?;

    Ok(Course {
        id: row.get("id"),
        term_id: row.get("term_id"),
        name: row.get("name"),
        credits: row.get("credits"),
        average: row.get("average"),
        letter_grade: row.get("letter_grade"),
        gpa_point: row.get("gpa_point"),
    })
}

pub async fn resolve_course(
    pool: &PgPool,
    email: &str,
    class_level: &str,
    term_number: i32,
    name: &str,
) -> anyhow::Result<Course> {
    let term = resolve_term(pool, email, class_level, term_number).await?;
    let store = PgGradeStore::new(pool.clone());
    let courses = store.term_courses(term.id).await?;
    courses
        .into_iter()
        .find(|course| course.name == name)
        .with_context(|| format!("no course named '{name}' in {class_level} #{term_number}"))
}

/// Deleting a course cascades to its components and scale overrides, so the
/// term aggregate has to be refreshed afterwards.
pub async fn remove_course(pool: &PgPool, course_id: Uuid) -> anyhow::Result<()> {
    let row = sqlx::query("DELETE FROM gpa_tracker.courses WHERE id = $1 RETURNING term_id")
        .bind(course_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        bail!("course {course_id} not found");
    };
    let term_id: Uuid = row.get("term_id");

    let store = PgGradeStore::new(pool.clone());
    aggregator::refresh_term(&store, term_id).await?;
    Ok(())
}

/// Grade commands address components by id; route back to the owning course.
pub async fn course_of_component(pool: &PgPool, component_id: Uuid) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT course_id FROM gpa_tracker.grade_components WHERE id = $1")
        .bind(component_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(row.get("course_id")),
        None => bail!("grade component {component_id} not found"),
    }
}

pub async fn components_for_course(
    pool: &PgPool,
    course_id: Uuid,
) -> anyhow::Result<Vec<GradeComponent>> {
    let store = PgGradeStore::new(pool.clone());
    Ok(store.components(course_id).await?)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7f3c2a51-6b0e-4f2a-9c3d-8a1e5b2f4c6d")?,
            "Elif Demir",
            "elif.demir@example.edu",
            "Istanbul Technical University",
            "Computer Engineering",
        ),
        (
            Uuid::parse_str("b2e4d6f8-1a3c-4e5b-8d7f-9c0a2b4d6e8f")?,
            "Mert Yilmaz",
            "mert.yilmaz@example.edu",
            "Istanbul Technical University",
            "Industrial Engineering",
        ),
    ];

    for (id, full_name, email, university, department) in students {
        sqlx::query(
            r#"
            INSERT INTO gpa_tracker.students (id, full_name, email, university, department)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(university)
        .bind(department)
        .execute(pool)
        .await?;
    }

    let elif = student_by_email(pool, "elif.demir@example.edu").await?;
    let term = upsert_term(pool, elif.id, "Freshman", 1).await?;

    let calculus = upsert_course(pool, term.id, "Calculus I", 4.0).await?;
    seed_grades(
        pool,
        calculus.id,
        &[("midterm", 80.0, 40.0), ("final", 60.0, 30.0)],
    )
    .await?;

    let physics = upsert_course(pool, term.id, "Physics I", 3.0).await?;
    seed_grades(
        pool,
        physics.id,
        &[
            ("quiz 1", 95.0, 10.0),
            ("midterm", 88.0, 40.0),
            ("final", 91.0, 50.0),
        ],
    )
    .await?;

    // Statistics carries a custom CC band, exercising the override path.
    let statistics = upsert_course(pool, term.id, "Statistics", 3.0).await?;
    let store = PgGradeStore::new(pool.clone());
    let entry = scale::override_entry(statistics.id, "CC", 55, 2.2)?;
    store.upsert_scale_entry(statistics.id, &entry).await?;
    seed_grades(pool, statistics.id, &[("project", 56.0, 100.0)]).await?;

    let mert = student_by_email(pool, "mert.yilmaz@example.edu").await?;
    let term = upsert_term(pool, mert.id, "Sophomore", 2).await?;
    let operations = upsert_course(pool, term.id, "Operations Research", 4.0).await?;
    seed_grades(
        pool,
        operations.id,
        &[("homework", 100.0, 20.0), ("midterm", 72.0, 40.0)],
    )
    .await?;

    Ok(())
}

async fn seed_grades(
    pool: &PgPool,
    course_id: Uuid,
    grades: &[(&str, f64, f64)],
) -> anyhow::Result<()> {
    let store = PgGradeStore::new(pool.clone());
    let mut aggregator = GradeAggregator::open(store, course_id).await?;
    for (label, score, weight) in grades {
        aggregator
            .add_component(ComponentDraft {
                label: (*label).to_string(),
                score: *score,
                weight: *weight,
            })
            .await?;
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub rejected: usize,
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<ImportOutcome> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        class_level: String,
        term_number: i32,
        course: String,
        credits: f64,
        label: String,
        score: f64,
        weight: f64,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut outcome = ImportOutcome::default();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student = upsert_student(pool, &row.full_name, &row.email, None, None).await?;
        let term = upsert_term(pool, student.id, &row.class_level, row.term_number).await?;
        let course = upsert_course(pool, term.id, &row.course, row.credits).await?;

        let store = PgGradeStore::new(pool.clone());
        let mut aggregator = GradeAggregator::open(store, course.id).await?;
        let draft = ComponentDraft {
            label: row.label,
            score: row.score,
            weight: row.weight,
        };
        let result = aggregator.add_component(draft).await;
        tally_import_row(&mut outcome, &row.email, &row.course, result)?;
    }

    Ok(outcome)
}

/// Per-row import decision: validation rejections are counted and logged,
/// anything else aborts the import.
fn tally_import_row<T>(
    outcome: &mut ImportOutcome,
    email: &str,
    course: &str,
    result: Result<T, GradeError>,
) -> Result<(), GradeError> {
    match result {
        Ok(_) => {
            outcome.inserted += 1;
            Ok(())
        }
        Err(err) if err.is_validation() => {
            warn!(email, course, error = %err, "import row rejected");
            outcome.rejected += 1;
            Ok(())
        }
        Err(err) => Err(err),
    }
}
