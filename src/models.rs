use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub university: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Term {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_level: String,
    pub term_number: i32,
    pub gpa: Option<f64>,
    pub total_credits: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub id: Uuid,
    pub term_id: Uuid,
    pub name: String,
    pub credits: f64,
    pub average: f64,
    pub letter_grade: Option<String>,
    pub gpa_point: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeComponent {
    pub id: Uuid,
    pub course_id: Uuid,
    pub label: String,
    pub score: f64,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeScaleEntry {
    pub id: Uuid,
    pub course_id: Uuid,
    pub letter: String,
    pub min_score: i32,
    pub gpa_point: f64,
    pub is_custom: bool,
}

#[derive(Debug, Clone)]
pub struct ComponentDraft {
    pub label: String,
    pub score: f64,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct ResolvedGrade {
    pub letter: String,
    pub gpa_point: f64,
}

#[derive(Debug, Clone)]
pub struct CourseStanding {
    pub average: f64,
    pub letter_grade: Option<String>,
    pub gpa_point: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TermSummary {
    pub gpa: Option<f64>,
    pub total_credits: f64,
}
