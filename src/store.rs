use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::GradeError;
use crate::models::{
    ComponentDraft, Course, CourseStanding, GradeComponent, GradeScaleEntry, TermSummary,
};

#[async_trait]
pub trait GradeStore: Send + Sync {
    async fn course(&self, course_id: Uuid) -> Result<Course, GradeError>;
    async fn components(&self, course_id: Uuid) -> Result<Vec<GradeComponent>, GradeError>;
    async fn custom_scale(&self, course_id: Uuid) -> Result<Vec<GradeScaleEntry>, GradeError>;
    async fn insert_component(
        &self,
        course_id: Uuid,
        draft: &ComponentDraft,
    ) -> Result<GradeComponent, GradeError>;
    async fn update_component(
        &self,
        id: Uuid,
        draft: &ComponentDraft,
    ) -> Result<GradeComponent, GradeError>;
    async fn delete_component(&self, id: Uuid) -> Result<(), GradeError>;
    async fn save_course_standing(
        &self,
        course_id: Uuid,
        standing: &CourseStanding,
    ) -> Result<(), GradeError>;
    async fn term_courses(&self, term_id: Uuid) -> Result<Vec<Course>, GradeError>;
    async fn save_term_summary(
        &self,
        term_id: Uuid,
        summary: &TermSummary,
    ) -> Result<(), GradeError>;
    async fn upsert_scale_entry(
        &self,
        course_id: Uuid,
        entry: &GradeScaleEntry,
    ) -> Result<GradeScaleEntry, GradeError>;
    async fn remove_scale_entry(&self, course_id: Uuid, letter: &str) -> Result<(), GradeError>;
    async fn clear_custom_scale(&self, course_id: Uuid) -> Result<(), GradeError>;
}

#[derive(Clone)]
pub struct PgGradeStore {
    pool: PgPool,
}

impl PgGradeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn course_from_row(row: &PgRow) -> Course {
    Course {
        id: row.get("id"),
        term_id: row.get("term_id"),
        name: row.get("name"),
        credits: row.get("credits"),
        average: row.get("average"),
        letter_grade: row.get("letter_grade"),
        gpa_point: row.get("gpa_point"),
    }
}

fn component_from_row(row: &PgRow) -> GradeComponent {
    GradeComponent {
        id: row.get("id"),
        course_id: row.get("course_id"),
        label: row.get("label"),
        score: row.get("score"),
        weight: row.get("weight"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn scale_entry_from_row(row: &PgRow) -> GradeScaleEntry {
    GradeScaleEntry {
        id: row.get("id"),
        course_id: row.get("course_id"),
        letter: row.get("letter"),
        min_score: row.get("min_score"),
        gpa_point: row.get("gpa_point"),
        is_custom: row.get("is_custom"),
    }
}

#[async_trait]
impl GradeStore for PgGradeStore {
    async fn course(&self, course_id: Uuid) -> Result<Course, GradeError> {
        let row = sqlx::query(
            "SELECT id, term_id, name, credits, average, letter_grade, gpa_point \
             FROM gpa_tracker.courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GradeError::CourseNotFound(course_id))?;

        Ok(course_from_row(&row))
    }

    async fn components(&self, course_id: Uuid) -> Result<Vec<GradeComponent>, GradeError> {
        let rows = sqlx::query(
            "SELECT id, course_id, label, score, weight, created_at, updated_at \
             FROM gpa_tracker.grade_components \
             WHERE course_id = $1 \
             ORDER BY created_at, id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(component_from_row).collect())
    }

    async fn custom_scale(&self, course_id: Uuid) -> Result<Vec<GradeScaleEntry>, GradeError> {
        let rows = sqlx::query(
            "SELECT id, course_id, letter, min_score, gpa_point, is_custom \
             FROM gpa_tracker.grade_scales \
             WHERE course_id = $1 \
             ORDER BY min_score DESC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(scale_entry_from_row).collect())
    }

    async fn insert_component(
        &self,
        course_id: Uuid,
        draft: &ComponentDraft,
    ) -> Result<GradeComponent, GradeError> {
        let mut tx = self.pool.begin().await?;

        // The course-row lock serializes budget checks across processes; the
        // sum is re-read from stored rows so a stale client cannot
        // oversubscribe. Standing writes still assume one editor per course.
        sqlx::query("SELECT id FROM gpa_tracker.courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(GradeError::CourseNotFound(course_id))?;

        let stored: f64 = sqlx::query(
            "SELECT COALESCE(SUM(weight), 0) AS total \
             FROM gpa_tracker.grade_components WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?
        .get("total");

        if stored + draft.weight > 100.0 {
            return Err(GradeError::WeightBudgetExceeded {
                requested: draft.weight,
                remaining: (100.0 - stored).max(0.0),
            });
        }

        let row = sqlx::query(
            "INSERT INTO gpa_tracker.grade_components (id, course_id, label, score, weight) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, course_id, label, score, weight, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(&draft.label)
        .bind(draft.score)
        .bind(draft.weight)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(component_from_row(&row))
    }

    async fn update_component(
        &self,
        id: Uuid,
        draft: &ComponentDraft,
    ) -> Result<GradeComponent, GradeError> {
        let mut tx = self.pool.begin().await?;

        let course_id: Uuid =
            sqlx::query("SELECT course_id FROM gpa_tracker.grade_components WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(GradeError::ComponentNotFound(id))?
                .get("course_id");

        sqlx::query("SELECT id FROM gpa_tracker.courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(GradeError::CourseNotFound(course_id))?;

        let stored: f64 = sqlx::query(
            "SELECT COALESCE(SUM(weight), 0) AS total \
             FROM gpa_tracker.grade_components \
             WHERE course_id = $1 AND id <> $2",
        )
        .bind(course_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?
        .get("total");

        if stored + draft.weight > 100.0 {
            return Err(GradeError::WeightBudgetExceeded {
                requested: draft.weight,
                remaining: (100.0 - stored).max(0.0),
            });
        }

        let row = sqlx::query(
            "UPDATE gpa_tracker.grade_components \
             SET label = $2, score = $3, weight = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, course_id, label, score, weight, created_at, updated_at",
        )
        .bind(id)
        .bind(&draft.label)
        .bind(draft.score)
        .bind(draft.weight)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(component_from_row(&row))
    }

    async fn delete_component(&self, id: Uuid) -> Result<(), GradeError> {
        let result = sqlx::query("DELETE FROM gpa_tracker.grade_components WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GradeError::ComponentNotFound(id));
        }
        Ok(())
    }

    async fn save_course_standing(
        &self,
        course_id: Uuid,
        standing: &CourseStanding,
    ) -> Result<(), GradeError> {
        let result = sqlx::query(
            "UPDATE gpa_tracker.courses \
             SET average = $2, letter_grade = $3, gpa_point = $4 \
             WHERE id = $1",
        )
        .bind(course_id)
        .bind(standing.average)
        .bind(standing.letter_grade.as_deref())
        .bind(standing.gpa_point)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GradeError::CourseNotFound(course_id));
        }
        Ok(())
    }

    async fn term_courses(&self, term_id: Uuid) -> Result<Vec<Course>, GradeError> {
        let rows = sqlx::query(
            "SELECT id, term_id, name, credits, average, letter_grade, gpa_point \
             FROM gpa_tracker.courses \
             WHERE term_id = $1 \
             ORDER BY name",
        )
        .bind(term_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(course_from_row).collect())
    }

    async fn save_term_summary(
        &self,
        term_id: Uuid,
        summary: &TermSummary,
    ) -> Result<(), GradeError> {
        let result = sqlx::query(
            "UPDATE gpa_tracker.terms SET gpa = $2, total_credits = $3 WHERE id = $1",
        )
        .bind(term_id)
        .bind(summary.gpa)
        .bind(summary.total_credits)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GradeError::TermNotFound(term_id));
        }
        Ok(())
    }

    async fn upsert_scale_entry(
        &self,
        course_id: Uuid,
        entry: &GradeScaleEntry,
    ) -> Result<GradeScaleEntry, GradeError> {
        let row = sqlx::query(
            "INSERT INTO gpa_tracker.grade_scales \
             (id, course_id, letter, min_score, gpa_point, is_custom) \
             VALUES ($1, $2, $3, $4, $5, TRUE) \
             ON CONFLICT (course_id, letter) DO UPDATE \
             SET min_score = EXCLUDED.min_score, gpa_point = EXCLUDED.gpa_point \
             RETURNING id, course_id, letter, min_score, gpa_point, is_custom",
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(&entry.letter)
        .bind(entry.min_score)
        .bind(entry.gpa_point)
        .fetch_one(&self.pool)
        .await?;

        Ok(scale_entry_from_row(&row))
    }

    async fn remove_scale_entry(&self, course_id: Uuid, letter: &str) -> Result<(), GradeError> {
        sqlx::query("DELETE FROM gpa_tracker.grade_scales WHERE course_id = $1 AND letter = $2")
            .bind(course_id)
            .bind(letter)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_custom_scale(&self, course_id: Uuid) -> Result<(), GradeError> {
        sqlx::query("DELETE FROM gpa_tracker.grade_scales WHERE course_id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
