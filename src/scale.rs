use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::error::GradeError;
use crate::models::{GradeScaleEntry, ResolvedGrade};

pub const DEFAULT_BANDS: [(&str, i32, f64); 9] = [
    ("AA", 90, 4.00),
    ("BA", 85, 3.50),
    ("BB", 75, 3.00),
    ("CB", 65, 2.50),
    ("CC", 60, 2.00),
    ("DC", 50, 1.50),
    ("DD", 45, 1.00),
    ("FD", 40, 0.50),
    ("FF", 0, 0.00),
];

pub fn default_scale(course_id: Uuid) -> Vec<GradeScaleEntry> {
    DEFAULT_BANDS
        .iter()
        .map(|(letter, min_score, gpa_point)| GradeScaleEntry {
            id: Uuid::nil(),
            course_id,
            letter: (*letter).to_string(),
            min_score: *min_score,
            gpa_point: *gpa_point,
            is_custom: false,
        })
        .collect()
}

pub fn merge_overrides(course_id: Uuid, custom: &[GradeScaleEntry]) -> Vec<GradeScaleEntry> {
    let by_letter: HashMap<&str, &GradeScaleEntry> = custom
        .iter()
        .map(|entry| (entry.letter.as_str(), entry))
        .collect();

    default_scale(course_id)
        .into_iter()
        .map(|band| match by_letter.get(band.letter.as_str()) {
            Some(over) => (*over).clone(),
            None => band,
        })
        .collect()
}

pub fn resolve_grade(scale: &[GradeScaleEntry], average: Option<f64>) -> Option<ResolvedGrade> {
    let average = average?;
    if !(0.0..=100.0).contains(&average) {
        warn!(average, "average outside 0-100 reached grade resolution; clamping");
    }
    let clamped = average.clamp(0.0, 100.0);

    let mut bands: Vec<&GradeScaleEntry> = scale.iter().collect();
    bands.sort_by(|a, b| b.min_score.cmp(&a.min_score));

    bands
        .iter()
        .find(|band| f64::from(band.min_score) <= clamped)
        .or_else(|| bands.last())
        .map(|band| ResolvedGrade {
            letter: band.letter.clone(),
            gpa_point: band.gpa_point,
        })
}

pub fn is_override(entry: &GradeScaleEntry) -> bool {
    match DEFAULT_BANDS
        .iter()
        .find(|(letter, _, _)| *letter == entry.letter)
    {
        Some((_, min_score, gpa_point)) => {
            // 0.001 tolerance: binary floats for values like 3.50 are not exact
            entry.min_score != *min_score || (entry.gpa_point - gpa_point).abs() > 0.001
        }
        None => true,
    }
}

pub fn override_entry(
    course_id: Uuid,
    letter: &str,
    min_score: i32,
    gpa_point: f64,
) -> Result<GradeScaleEntry, GradeError> {
    let letter = letter.to_ascii_uppercase();
    if !DEFAULT_BANDS.iter().any(|(known, _, _)| *known == letter) {
        return Err(GradeError::UnknownScaleLetter(letter));
    }
    if !(0..=100).contains(&min_score) {
        return Err(GradeError::MinScoreOutOfRange(min_score));
    }
    if !(0.0..=4.0).contains(&gpa_point) {
        return Err(GradeError::GpaPointOutOfRange(gpa_point));
    }

    Ok(GradeScaleEntry {
        id: Uuid::nil(),
        course_id,
        letter,
        min_score,
        gpa_point,
        is_custom: true,
    })
}
