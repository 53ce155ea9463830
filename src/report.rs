use std::fmt::Write;

use crate::models::{Course, Student, Term};

fn course_line(course: &Course) -> String {
    match (&course.letter_grade, course.gpa_point) {
        (Some(letter), Some(gpa_point)) => format!(
            "- {} ({} credits): average {:.1}, {} ({:.2})",
            course.name, course.credits, course.average, letter, gpa_point
        ),
        _ => format!(
            "- {} ({} credits): not yet graded",
            course.name, course.credits
        ),
    }
}

fn cumulative_gpa(terms: &[(Term, Vec<Course>)]) -> Option<(f64, f64)> {
    let mut points = 0.0;
    let mut credits = 0.0;
    for (_, courses) in terms {
        for course in courses {
            if let Some(gpa_point) = course.gpa_point {
                points += gpa_point * course.credits;
                credits += course.credits;
            }
        }
    }
    (credits > 0.0).then(|| (points / credits, credits))
}

pub fn build_report(student: &Student, terms: &[(Term, Vec<Course>)]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Transcript: {}", student.full_name);
    let _ = writeln!(output, "Email: {}", student.email);
    if let Some(university) = &student.university {
        match &student.department {
            Some(department) => {
                let _ = writeln!(output, "{university}, {department}");
            }
            None => {
                let _ = writeln!(output, "{university}");
            }
        }
    }

    if terms.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No terms recorded.");
        return output;
    }

    for (term, courses) in terms {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} — term {}", term.class_level, term.term_number);

        if courses.is_empty() {
            let _ = writeln!(output, "No courses recorded.");
            continue;
        }
        for course in courses {
            let _ = writeln!(output, "{}", course_line(course));
        }
        match term.gpa {
            Some(gpa) => {
                let _ = writeln!(
                    output,
                    "Term GPA: {:.2} over {} graded credits",
                    gpa, term.total_credits
                );
            }
            None => {
                let _ = writeln!(output, "Term GPA: not yet available");
            }
        }
    }

    let _ = writeln!(output);
    match cumulative_gpa(terms) {
        Some((gpa, credits)) => {
            let _ = writeln!(output, "Cumulative GPA: {gpa:.2} over {credits} graded credits");
        }
        None => {
            let _ = writeln!(output, "Cumulative GPA: not yet available");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn student() -> Student {
        Student {
            id: Uuid::new_v4(),
            full_name: "Elif Demir".to_string(),
            email: "elif.demir@example.edu".to_string(),
            university: Some("Istanbul Technical University".to_string()),
            department: Some("Computer Engineering".to_string()),
        }
    }

    fn term(class_level: &str, term_number: i32, gpa: Option<f64>, credits: f64) -> Term {
        Term {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            class_level: class_level.to_string(),
            term_number,
            gpa,
            total_credits: credits,
        }
    }

    fn course(name: &str, credits: f64, graded: Option<(f64, &str, f64)>) -> Course {
        let (average, letter_grade, gpa_point) = match graded {
            Some((average, letter, gpa_point)) => {
                (average, Some(letter.to_string()), Some(gpa_point))
            }
            None => (0.0, None, None),
        };
        Course {
            id: Uuid::new_v4(),
            term_id: Uuid::new_v4(),
            name: name.to_string(),
            credits,
            average,
            letter_grade,
            gpa_point,
        }
    }

    #[test]
    fn report_lists_courses_and_gpas() {
        let terms = vec![(
            term("Freshman", 1, Some(3.5), 7.0),
            vec![
                course("Calculus I", 4.0, Some((90.0, "AA", 4.0))),
                course("Physics I", 3.0, Some((85.0, "BA", 3.5))),
                course("Chemistry I", 3.0, None),
            ],
        )];

        let report = build_report(&student(), &terms);
        assert!(report.contains("# Transcript: Elif Demir"));
        assert!(report.contains("## Freshman — term 1"));
        assert!(report.contains("- Calculus I (4 credits): average 90.0, AA (4.00)"));
        assert!(report.contains("- Chemistry I (3 credits): not yet graded"));
        assert!(report.contains("Term GPA: 3.50 over 7 graded credits"));
        // (4×4.0 + 3×3.5) / 7 ≈ 3.79; the ungraded course carries no credits
        assert!(report.contains("Cumulative GPA: 3.79 over 7 graded credits"));
    }

    #[test]
    fn report_without_grades_shows_not_available() {
        let terms = vec![(
            term("Freshman", 1, None, 0.0),
            vec![course("Calculus I", 4.0, None)],
        )];

        let report = build_report(&student(), &terms);
        assert!(report.contains("Term GPA: not yet available"));
        assert!(report.contains("Cumulative GPA: not yet available"));
    }

    #[test]
    fn cumulative_gpa_spans_terms() {
        let terms = vec![
            (
                term("Freshman", 1, Some(4.0), 4.0),
                vec![course("Calculus I", 4.0, Some((95.0, "AA", 4.0)))],
            ),
            (
                term("Freshman", 2, Some(2.0), 4.0),
                vec![course("Calculus II", 4.0, Some((60.0, "CC", 2.0)))],
            ),
        ];

        let (gpa, credits) = cumulative_gpa(&terms).unwrap();
        assert!((gpa - 3.0).abs() < 1e-9);
        assert!((credits - 8.0).abs() < 1e-9);
    }

    #[test]
    fn empty_transcript_says_so() {
        let report = build_report(&student(), &[]);
        assert!(report.contains("No terms recorded."));
    }
}
