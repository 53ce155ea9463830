use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::GradeError;
use crate::models::{
    ComponentDraft, Course, CourseStanding, GradeComponent, GradeScaleEntry, TermSummary,
};
use crate::scale;
use crate::store::GradeStore;

pub fn total_weight(components: &[GradeComponent], excluding: Option<Uuid>) -> f64 {
    components
        .iter()
        .filter(|component| excluding != Some(component.id))
        .map(|component| component.weight)
        .sum()
}

pub fn remaining_weight(components: &[GradeComponent], excluding: Option<Uuid>) -> f64 {
    (100.0 - total_weight(components, excluding)).max(0.0)
}

pub fn can_accept(components: &[GradeComponent], new_weight: f64, excluding: Option<Uuid>) -> bool {
    total_weight(components, excluding) + new_weight <= 100.0
}

// Plain weighted sum, not renormalized by the weight in use: a course graded
// for 70 of its 100 weight points shows the partial average, not a projection.
pub fn weighted_average(components: &[GradeComponent]) -> f64 {
    components
        .iter()
        .map(|component| component.score * (component.weight / 100.0))
        .sum()
}

pub fn term_summary(courses: &[Course]) -> TermSummary {
    let mut total_credits = 0.0;
    let mut points = 0.0;
    for course in courses {
        if let Some(gpa_point) = course.gpa_point {
            total_credits += course.credits;
            points += gpa_point * course.credits;
        }
    }

    if total_credits > 0.0 {
        TermSummary {
            gpa: Some(points / total_credits),
            total_credits,
        }
    } else {
        TermSummary {
            gpa: None,
            total_credits: 0.0,
        }
    }
}

pub async fn refresh_term<S: GradeStore>(store: &S, term_id: Uuid) -> Result<TermSummary, GradeError> {
    let courses = store.term_courses(term_id).await?;
    let summary = term_summary(&courses);
    store.save_term_summary(term_id, &summary).await?;
    Ok(summary)
}

#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub component: GradeComponent,
    pub standing: CourseStanding,
    pub term: TermSummary,
}

pub struct GradeAggregator<S: GradeStore> {
    store: S,
    course: Course,
    components: Vec<GradeComponent>,
    effective_scale: Vec<GradeScaleEntry>,
}

impl<S: GradeStore> GradeAggregator<S> {
    pub async fn open(store: S, course_id: Uuid) -> Result<Self, GradeError> {
        let course = store.course(course_id).await?;
        let components = store.components(course_id).await?;
        let custom = store.custom_scale(course_id).await?;
        let effective_scale = scale::merge_overrides(course_id, &custom);

        Ok(Self {
            store,
            course,
            components,
            effective_scale,
        })
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn components(&self) -> &[GradeComponent] {
        &self.components
    }

    pub fn effective_scale(&self) -> &[GradeScaleEntry] {
        &self.effective_scale
    }

    pub fn remaining_weight(&self) -> f64 {
        remaining_weight(&self.components, None)
    }

    pub fn standing(&self) -> CourseStanding {
        let average = if self.components.is_empty() {
            None
        } else {
            Some(weighted_average(&self.components))
        };
        let resolved = scale::resolve_grade(&self.effective_scale, average);

        CourseStanding {
            average: average.unwrap_or(0.0),
            letter_grade: resolved.as_ref().map(|grade| grade.letter.clone()),
            gpa_point: resolved.map(|grade| grade.gpa_point),
        }
    }

    pub async fn add_component(
        &mut self,
        draft: ComponentDraft,
    ) -> Result<MutationOutcome, GradeError> {
        let draft = validated(draft)?;
        if !can_accept(&self.components, draft.weight, None) {
            return Err(GradeError::WeightBudgetExceeded {
                requested: draft.weight,
                remaining: remaining_weight(&self.components, None),
            });
        }

        let component = match self.store.insert_component(self.course.id, &draft).await {
            Ok(component) => component,
            Err(err) => return Err(self.reconciled(err).await),
        };
        self.components.push(component.clone());

        let (standing, term) = self.recompute().await?;
        Ok(MutationOutcome {
            component,
            standing,
            term,
        })
    }

    pub async fn update_component(
        &mut self,
        id: Uuid,
        draft: ComponentDraft,
    ) -> Result<MutationOutcome, GradeError> {
        let draft = validated(draft)?;
        let position = self
            .components
            .iter()
            .position(|component| component.id == id)
            .ok_or(GradeError::ComponentNotFound(id))?;

        if !can_accept(&self.components, draft.weight, Some(id)) {
            return Err(GradeError::WeightBudgetExceeded {
                requested: draft.weight,
                remaining: remaining_weight(&self.components, Some(id)),
            });
        }

        let component = match self.store.update_component(id, &draft).await {
            Ok(component) => component,
            Err(err) => return Err(self.reconciled(err).await),
        };
        self.components[position] = component.clone();

        let (standing, term) = self.recompute().await?;
        Ok(MutationOutcome {
            component,
            standing,
            term,
        })
    }

    pub async fn remove_component(&mut self, id: Uuid) -> Result<MutationOutcome, GradeError> {
        let position = self
            .components
            .iter()
            .position(|component| component.id == id)
            .ok_or(GradeError::ComponentNotFound(id))?;

        // Optimistic removal; a failed delete rolls back by re-fetching from
        // the store, never by re-inserting the stale row.
        let component = self.components.remove(position);
        if let Err(err) = self.store.delete_component(id).await {
            return Err(self.reconciled(err).await);
        }

        let (standing, term) = self.recompute().await?;
        Ok(MutationOutcome {
            component,
            standing,
            term,
        })
    }

    pub async fn recompute(&mut self) -> Result<(CourseStanding, TermSummary), GradeError> {
        let standing = self.standing();
        if let Err(err) = self.store.save_course_standing(self.course.id, &standing).await {
            return Err(self.reconciled(err).await);
        }
        self.course.average = standing.average;
        self.course.letter_grade = standing.letter_grade.clone();
        self.course.gpa_point = standing.gpa_point;

        debug!(
            course_id = %self.course.id,
            average = standing.average,
            letter = standing.letter_grade.as_deref().unwrap_or("N/A"),
            "course standing recomputed"
        );

        let term = match refresh_term(&self.store, self.course.term_id).await {
            Ok(term) => term,
            Err(err) => return Err(self.reconciled(err).await),
        };

        Ok((standing, term))
    }

    pub async fn reload(&mut self) -> Result<(), GradeError> {
        self.course = self.store.course(self.course.id).await?;
        self.components = self.store.components(self.course.id).await?;
        let custom = self.store.custom_scale(self.course.id).await?;
        self.effective_scale = scale::merge_overrides(self.course.id, &custom);
        Ok(())
    }

    async fn reconciled(&mut self, err: GradeError) -> GradeError {
        if let Err(reload_err) = self.reload().await {
            warn!(
                course_id = %self.course.id,
                error = %reload_err,
                "reload after failed write also failed"
            );
        }
        err
    }
}

fn validated(draft: ComponentDraft) -> Result<ComponentDraft, GradeError> {
    let label = draft.label.trim().to_string();
    if label.is_empty() {
        return Err(GradeError::EmptyLabel);
    }
    if !(0.0..=100.0).contains(&draft.score) {
        return Err(GradeError::ScoreOutOfRange(draft.score));
    }
    if !(draft.weight > 0.0 && draft.weight <= 100.0) {
        return Err(GradeError::WeightOutOfRange(draft.weight));
    }

    Ok(ComponentDraft { label, ..draft })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use super::*;

    #[derive(Clone, Default)]
    struct MemoryStore {
        inner: Arc<Mutex<Inner>>,
        fail_writes: Arc<AtomicBool>,
    }

    #[derive(Default)]
    struct Inner {
        courses: Vec<Course>,
        components: Vec<GradeComponent>,
        custom: Vec<GradeScaleEntry>,
        term_summaries: Vec<(Uuid, TermSummary)>,
    }

    impl MemoryStore {
        fn with_course(course: Course) -> Self {
            let store = MemoryStore::default();
            store.inner.lock().unwrap().courses.push(course);
            store
        }

        fn push_course(&self, course: Course) {
            self.inner.lock().unwrap().courses.push(course);
        }

        fn push_custom(&self, entry: GradeScaleEntry) {
            self.inner.lock().unwrap().custom.push(entry);
        }

        fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn write_error(&self) -> Option<GradeError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Some(GradeError::Storage(sqlx::Error::PoolClosed))
            } else {
                None
            }
        }

        fn stored_components(&self) -> Vec<GradeComponent> {
            self.inner.lock().unwrap().components.clone()
        }

        fn stored_course(&self, course_id: Uuid) -> Course {
            self.inner
                .lock()
                .unwrap()
                .courses
                .iter()
                .find(|course| course.id == course_id)
                .cloned()
                .unwrap()
        }

        fn last_term_summary(&self, term_id: Uuid) -> Option<TermSummary> {
            self.inner
                .lock()
                .unwrap()
                .term_summaries
                .iter()
                .rev()
                .find(|(id, _)| *id == term_id)
                .map(|(_, summary)| summary.clone())
        }
    }

    #[async_trait::async_trait]
    impl GradeStore for MemoryStore {
        async fn course(&self, course_id: Uuid) -> Result<Course, GradeError> {
            self.inner
                .lock()
                .unwrap()
                .courses
                .iter()
                .find(|course| course.id == course_id)
                .cloned()
                .ok_or(GradeError::CourseNotFound(course_id))
        }

        async fn components(&self, course_id: Uuid) -> Result<Vec<GradeComponent>, GradeError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .components
                .iter()
                .filter(|component| component.course_id == course_id)
                .cloned()
                .collect())
        }

        async fn custom_scale(&self, course_id: Uuid) -> Result<Vec<GradeScaleEntry>, GradeError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .custom
                .iter()
                .filter(|entry| entry.course_id == course_id)
                .cloned()
                .collect())
        }

        async fn insert_component(
            &self,
            course_id: Uuid,
            draft: &ComponentDraft,
        ) -> Result<GradeComponent, GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            let now = Utc::now();
            let component = GradeComponent {
                id: Uuid::new_v4(),
                course_id,
                label: draft.label.clone(),
                score: draft.score,
                weight: draft.weight,
                created_at: now,
                updated_at: now,
            };
            self.inner.lock().unwrap().components.push(component.clone());
            Ok(component)
        }

        async fn update_component(
            &self,
            id: Uuid,
            draft: &ComponentDraft,
        ) -> Result<GradeComponent, GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            let mut inner = self.inner.lock().unwrap();
            let component = inner
                .components
                .iter_mut()
                .find(|component| component.id == id)
                .ok_or(GradeError::ComponentNotFound(id))?;
            component.label = draft.label.clone();
            component.score = draft.score;
            component.weight = draft.weight;
            component.updated_at = Utc::now();
            Ok(component.clone())
        }

        async fn delete_component(&self, id: Uuid) -> Result<(), GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            let mut inner = self.inner.lock().unwrap();
            let before = inner.components.len();
            inner.components.retain(|component| component.id != id);
            if inner.components.len() == before {
                return Err(GradeError::ComponentNotFound(id));
            }
            Ok(())
        }

        async fn save_course_standing(
            &self,
            course_id: Uuid,
            standing: &CourseStanding,
        ) -> Result<(), GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            let mut inner = self.inner.lock().unwrap();
            let course = inner
                .courses
                .iter_mut()
                .find(|course| course.id == course_id)
                .ok_or(GradeError::CourseNotFound(course_id))?;
            course.average = standing.average;
            course.letter_grade = standing.letter_grade.clone();
            course.gpa_point = standing.gpa_point;
            Ok(())
        }

        async fn term_courses(&self, term_id: Uuid) -> Result<Vec<Course>, GradeError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .courses
                .iter()
                .filter(|course| course.term_id == term_id)
                .cloned()
                .collect())
        }

        async fn save_term_summary(
            &self,
            term_id: Uuid,
            summary: &TermSummary,
        ) -> Result<(), GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            self.inner
                .lock()
                .unwrap()
                .term_summaries
                .push((term_id, summary.clone()));
            Ok(())
        }

        async fn upsert_scale_entry(
            &self,
            course_id: Uuid,
            entry: &GradeScaleEntry,
        ) -> Result<GradeScaleEntry, GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            let mut inner = self.inner.lock().unwrap();
            inner
                .custom
                .retain(|existing| !(existing.course_id == course_id && existing.letter == entry.letter));
            let stored = GradeScaleEntry {
                id: Uuid::new_v4(),
                course_id,
                ..entry.clone()
            };
            inner.custom.push(stored.clone());
            Ok(stored)
        }

        async fn remove_scale_entry(&self, course_id: Uuid, letter: &str) -> Result<(), GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            self.inner
                .lock()
                .unwrap()
                .custom
                .retain(|entry| !(entry.course_id == course_id && entry.letter == letter));
            Ok(())
        }

        async fn clear_custom_scale(&self, course_id: Uuid) -> Result<(), GradeError> {
            if let Some(err) = self.write_error() {
                return Err(err);
            }
            self.inner
                .lock()
                .unwrap()
                .custom
                .retain(|entry| entry.course_id != course_id);
            Ok(())
        }
    }

    fn course_fixture(term_id: Uuid, name: &str, credits: f64) -> Course {
        Course {
            id: Uuid::new_v4(),
            term_id,
            name: name.to_string(),
            credits,
            average: 0.0,
            letter_grade: None,
            gpa_point: None,
        }
    }

    fn component_fixture(score: f64, weight: f64) -> GradeComponent {
        let now = Utc::now();
        GradeComponent {
            id: Uuid::new_v4(),
            course_id: Uuid::nil(),
            label: "quiz".to_string(),
            score,
            weight,
            created_at: now,
            updated_at: now,
        }
    }

    fn draft(label: &str, score: f64, weight: f64) -> ComponentDraft {
        ComponentDraft {
            label: label.to_string(),
            score,
            weight,
        }
    }

    #[test]
    fn weighted_average_is_a_plain_weighted_sum() {
        let mut components = vec![component_fixture(80.0, 40.0), component_fixture(60.0, 30.0)];
        assert!((weighted_average(&components) - 50.0).abs() < 1e-9);

        components.reverse();
        assert!((weighted_average(&components) - 50.0).abs() < 1e-9);

        assert!((weighted_average(&[]) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn budget_allows_exactly_one_hundred() {
        let components = vec![component_fixture(90.0, 70.0)];
        assert!(can_accept(&components, 30.0, None));
        assert!(!can_accept(&components, 30.1, None));
        assert!((remaining_weight(&components, None) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn budget_excludes_the_component_being_edited() {
        let components = vec![component_fixture(90.0, 60.0), component_fixture(70.0, 40.0)];
        let editing = components[1].id;
        assert!((total_weight(&components, Some(editing)) - 60.0).abs() < 1e-9);
        assert!(can_accept(&components, 40.0, Some(editing)));
        assert!(!can_accept(&components, 41.0, Some(editing)));
    }

    #[test]
    fn term_summary_skips_unresolved_courses() {
        let term_id = Uuid::new_v4();
        let mut graded_four = course_fixture(term_id, "Calculus I", 4.0);
        graded_four.gpa_point = Some(4.0);
        let mut graded_two = course_fixture(term_id, "Physics I", 2.0);
        graded_two.gpa_point = Some(2.0);
        let ungraded = course_fixture(term_id, "Chemistry I", 3.0);

        let summary = term_summary(&[graded_four, graded_two, ungraded]);
        assert!((summary.total_credits - 6.0).abs() < 1e-9);
        assert!((summary.gpa.unwrap() - 20.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn term_summary_with_no_graded_courses_is_not_available() {
        let summary = term_summary(&[course_fixture(Uuid::new_v4(), "Calculus I", 4.0)]);
        assert!(summary.gpa.is_none());
        assert!((summary.total_credits - 0.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn add_recomputes_standing_and_term() {
        let term_id = Uuid::new_v4();
        let course = course_fixture(term_id, "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut aggregator = GradeAggregator::open(store.clone(), course_id).await.unwrap();
        aggregator
            .add_component(draft("midterm", 80.0, 40.0))
            .await
            .unwrap();
        let outcome = aggregator
            .add_component(draft("final", 60.0, 30.0))
            .await
            .unwrap();

        assert!((outcome.standing.average - 50.0).abs() < 1e-9);
        assert_eq!(outcome.standing.letter_grade.as_deref(), Some("DC"));
        assert!((outcome.standing.gpa_point.unwrap() - 1.5).abs() < 1e-9);

        let stored = store.stored_course(course_id);
        assert!((stored.average - 50.0).abs() < 1e-9);
        assert_eq!(stored.letter_grade.as_deref(), Some("DC"));

        let term = store.last_term_summary(term_id).unwrap();
        assert!((term.gpa.unwrap() - 1.5).abs() < 1e-9);
        assert!((term.total_credits - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn add_rejects_over_budget_before_any_write() {
        let course = course_fixture(Uuid::new_v4(), "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut aggregator = GradeAggregator::open(store.clone(), course_id).await.unwrap();
        aggregator
            .add_component(draft("project", 75.0, 80.0))
            .await
            .unwrap();

        let err = aggregator
            .add_component(draft("final", 90.0, 30.0))
            .await
            .unwrap_err();
        match err {
            GradeError::WeightBudgetExceeded {
                requested,
                remaining,
            } => {
                assert!((requested - 30.0).abs() < 1e-9);
                assert!((remaining - 20.0).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.stored_components().len(), 1);
    }

    #[tokio::test]
    async fn update_excludes_its_own_weight_from_the_budget() {
        let course = course_fixture(Uuid::new_v4(), "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut aggregator = GradeAggregator::open(store.clone(), course_id).await.unwrap();
        aggregator
            .add_component(draft("midterm", 90.0, 60.0))
            .await
            .unwrap();
        let added = aggregator
            .add_component(draft("final", 80.0, 40.0))
            .await
            .unwrap();

        let updated = aggregator
            .update_component(added.component.id, draft("final", 85.0, 40.0))
            .await
            .unwrap();
        assert!((updated.component.score - 85.0).abs() < 1e-9);

        let err = aggregator
            .update_component(added.component.id, draft("final", 85.0, 50.0))
            .await
            .unwrap_err();
        match err {
            GradeError::WeightBudgetExceeded { remaining, .. } => {
                assert!((remaining - 40.0).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn update_unknown_component_is_not_found() {
        let course = course_fixture(Uuid::new_v4(), "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut aggregator = GradeAggregator::open(store, course_id).await.unwrap();
        let missing = Uuid::new_v4();
        assert!(matches!(
            aggregator
                .update_component(missing, draft("final", 85.0, 10.0))
                .await,
            Err(GradeError::ComponentNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn remove_refetches_when_the_delete_fails() {
        let course = course_fixture(Uuid::new_v4(), "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut aggregator = GradeAggregator::open(store.clone(), course_id).await.unwrap();
        aggregator
            .add_component(draft("midterm", 80.0, 40.0))
            .await
            .unwrap();
        let kept = aggregator
            .add_component(draft("final", 60.0, 30.0))
            .await
            .unwrap();

        store.set_fail_writes(true);
        let err = aggregator.remove_component(kept.component.id).await.unwrap_err();
        assert!(matches!(err, GradeError::Storage(_)));

        // the optimistic removal was rolled back by re-fetching
        assert_eq!(aggregator.components().len(), 2);
        assert_eq!(store.stored_components().len(), 2);
    }

    #[tokio::test]
    async fn failed_insert_leaves_the_working_set_reloaded() {
        let course = course_fixture(Uuid::new_v4(), "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut aggregator = GradeAggregator::open(store.clone(), course_id).await.unwrap();
        store.set_fail_writes(true);
        let err = aggregator
            .add_component(draft("midterm", 80.0, 40.0))
            .await
            .unwrap_err();
        assert!(matches!(err, GradeError::Storage(_)));
        assert!(aggregator.components().is_empty());
        assert!(store.stored_components().is_empty());
    }

    #[tokio::test]
    async fn course_without_components_has_no_resolved_letter() {
        let term_id = Uuid::new_v4();
        let course = course_fixture(term_id, "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut aggregator = GradeAggregator::open(store.clone(), course_id).await.unwrap();
        let standing = aggregator.standing();
        assert!((standing.average - 0.0).abs() < 1e-9);
        assert!(standing.letter_grade.is_none());
        assert!(standing.gpa_point.is_none());

        let added = aggregator
            .add_component(draft("midterm", 80.0, 40.0))
            .await
            .unwrap();
        let removed = aggregator.remove_component(added.component.id).await.unwrap();
        assert!(removed.standing.letter_grade.is_none());
        assert!(removed.term.gpa.is_none());

        let stored = store.stored_course(course_id);
        assert!(stored.letter_grade.is_none());
        assert!(stored.gpa_point.is_none());
    }

    #[tokio::test]
    async fn custom_scale_changes_the_resolved_letter() {
        let term_id = Uuid::new_v4();
        let course = course_fixture(term_id, "Statistics", 3.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);
        store.push_custom(GradeScaleEntry {
            id: Uuid::new_v4(),
            course_id,
            letter: "CC".to_string(),
            min_score: 55,
            gpa_point: 2.2,
            is_custom: true,
        });

        let mut aggregator = GradeAggregator::open(store, course_id).await.unwrap();
        let outcome = aggregator
            .add_component(draft("final", 56.0, 100.0))
            .await
            .unwrap();

        assert_eq!(outcome.standing.letter_grade.as_deref(), Some("CC"));
        assert!((outcome.standing.gpa_point.unwrap() - 2.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn term_rollup_spans_all_graded_courses() {
        let term_id = Uuid::new_v4();
        let course = course_fixture(term_id, "Calculus I", 4.0);
        let course_id = course.id;
        let store = MemoryStore::with_course(course);

        let mut sibling = course_fixture(term_id, "Physics I", 2.0);
        sibling.average = 90.0;
        sibling.letter_grade = Some("AA".to_string());
        sibling.gpa_point = Some(4.0);
        store.push_course(sibling);

        let mut aggregator = GradeAggregator::open(store.clone(), course_id).await.unwrap();
        let outcome = aggregator
            .add_component(draft("final", 76.0, 100.0))
            .await
            .unwrap();

        // BB (3.0) over 4 credits plus AA (4.0) over 2 credits
        assert_eq!(outcome.standing.letter_grade.as_deref(), Some("BB"));
        let expected = (3.0 * 4.0 + 4.0 * 2.0) / 6.0;
        assert!((outcome.term.gpa.unwrap() - expected).abs() < 1e-9);
        assert!((outcome.term.total_credits - 6.0).abs() < 1e-9);
    }

    #[test]
    fn validation_rejects_bad_drafts() {
        assert!(matches!(
            validated(draft("  ", 50.0, 10.0)),
            Err(GradeError::EmptyLabel)
        ));
        assert!(matches!(
            validated(draft("quiz", 101.0, 10.0)),
            Err(GradeError::ScoreOutOfRange(_))
        ));
        assert!(matches!(
            validated(draft("quiz", 50.0, 0.0)),
            Err(GradeError::WeightOutOfRange(_))
        ));
        assert!(matches!(
            validated(draft("quiz", 50.0, 100.5)),
            Err(GradeError::WeightOutOfRange(_))
        ));

        let cleaned = validated(draft("  quiz 1 ", 50.0, 10.0)).unwrap();
        assert_eq!(cleaned.label, "quiz 1");
    }
}
