use std::cmp::Ordering;

use uuid::Uuid;

use crate::models::{DoctorWithRatings, SortKey, FACTOR_LABELS};

/// At most this many doctors can sit in the comparison working set.
pub const COMPARE_LIMIT: usize = 3;

/// Stable sort; doctors that tie keep their input order. Zero-review
/// doctors carry an all-zero summary, so they sort as zeros rather than
/// being special-cased.
pub fn sort_doctors(doctors: &mut [DoctorWithRatings], key: SortKey) {
    match key {
        SortKey::Rating => doctors.sort_by(|a, b| {
            b.ratings
                .overall_rating
                .partial_cmp(&a.ratings.overall_rating)
                .unwrap_or(Ordering::Equal)
        }),
        SortKey::Reviews => {
            doctors.sort_by(|a, b| b.ratings.total_reviews.cmp(&a.ratings.total_reviews))
        }
        SortKey::Name => {
            doctors.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }
    }
}

/// Case-insensitive substring search across name, department, and title,
/// composed with an exact department filter. Either filter may be absent.
pub fn filter_doctors(
    doctors: &[DoctorWithRatings],
    query: Option<&str>,
    department: Option<&str>,
) -> Vec<DoctorWithRatings> {
    doctors
        .iter()
        .filter(|doctor| {
            let matches_query = match query {
                Some(q) => {
                    let q = q.to_lowercase();
                    doctor.name.to_lowercase().contains(&q)
                        || doctor.department.to_lowercase().contains(&q)
                        || doctor.title.to_lowercase().contains(&q)
                }
                None => true,
            };
            let matches_department = match department {
                Some(d) => doctor.department == d,
                None => true,
            };
            matches_query && matches_department
        })
        .cloned()
        .collect()
}

/// Distinct departments, sorted, for filter dropdowns.
pub fn departments(doctors: &[DoctorWithRatings]) -> Vec<String> {
    let mut names: Vec<String> = doctors.iter().map(|d| d.department.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// Working set of doctors selected for side-by-side comparison.
///
/// Toggling a present id removes it; toggling an absent id appends it
/// while the set is below `COMPARE_LIMIT` and is otherwise a no-op.
#[derive(Debug, Default, Clone)]
pub struct CompareSet {
    ids: Vec<Uuid>,
}

impl CompareSet {
    pub fn toggle(&mut self, id: Uuid) {
        if let Some(pos) = self.ids.iter().position(|existing| *existing == id) {
            self.ids.remove(pos);
        } else if self.ids.len() < COMPARE_LIMIT {
            self.ids.push(id);
        }
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// One factor row of a side-by-side comparison.
#[derive(Debug, Clone)]
pub struct FactorComparison {
    pub factor: &'static str,
    /// One value per compared doctor, in input order.
    pub values: Vec<f64>,
    pub best: f64,
    /// Indices of the doctor(s) holding the best value.
    pub winners: Vec<usize>,
    /// Gap between the best value and the runner-up; 0 when everyone ties.
    pub margin: f64,
}

/// Factor-by-factor comparison across the given doctors, with an extra
/// closing row for the overall rating.
pub fn compare(doctors: &[DoctorWithRatings]) -> Vec<FactorComparison> {
    let mut rows = Vec::with_capacity(FACTOR_LABELS.len() + 1);

    for (index, factor) in FACTOR_LABELS.iter().enumerate() {
        let values: Vec<f64> = doctors
            .iter()
            .map(|d| d.ratings.factor_averages()[index])
            .collect();
        rows.push(comparison_row(factor, values));
    }

    let overall: Vec<f64> = doctors.iter().map(|d| d.ratings.overall_rating).collect();
    rows.push(comparison_row("overall", overall));
    rows
}

fn comparison_row(factor: &'static str, values: Vec<f64>) -> FactorComparison {
    let best = values.iter().copied().fold(0.0f64, f64::max);
    let winners: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, value)| (best - **value).abs() < 1e-9)
        .map(|(index, _)| index)
        .collect();
    let runner_up = values
        .iter()
        .copied()
        .filter(|value| (best - value).abs() >= 1e-9)
        .fold(0.0f64, f64::max);
    let margin = if winners.len() == values.len() {
        0.0
    } else {
        best - runner_up
    };

    FactorComparison {
        factor,
        values,
        best,
        winners,
        margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingSummary;

    fn doctor(name: &str, department: &str, overall: f64, reviews: usize) -> DoctorWithRatings {
        DoctorWithRatings {
            id: Uuid::new_v4(),
            name: name.to_string(),
            department: department.to_string(),
            title: "Professor".to_string(),
            bio: String::new(),
            profile_image_url: None,
            ratings: RatingSummary {
                avg_teaching_quality: overall,
                avg_availability: overall,
                avg_communication: overall,
                avg_knowledge: overall,
                avg_fairness: overall,
                overall_rating: overall,
                total_reviews: reviews,
            },
        }
    }

    #[test]
    fn rating_sort_descends_and_reverses_cleanly() {
        let mut doctors = vec![
            doctor("Sara Haddad", "Anatomy", 3.2, 5),
            doctor("Omar Khalil", "Physiology", 4.8, 12),
            doctor("Lina Nasser", "Anatomy", 0.0, 0),
            doctor("Adel Mansour", "Pharmacology", 4.1, 7),
        ];
        sort_doctors(&mut doctors, SortKey::Rating);

        let descending: Vec<f64> = doctors.iter().map(|d| d.ratings.overall_rating).collect();
        assert_eq!(descending, vec![4.8, 4.1, 3.2, 0.0]);

        let mut ascending = descending.clone();
        ascending.reverse();
        assert!(ascending.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn review_sort_uses_counts() {
        let mut doctors = vec![
            doctor("Sara Haddad", "Anatomy", 4.9, 2),
            doctor("Omar Khalil", "Physiology", 3.0, 20),
        ];
        sort_doctors(&mut doctors, SortKey::Reviews);
        assert_eq!(doctors[0].name, "Omar Khalil");
    }

    #[test]
    fn name_sort_ignores_case() {
        let mut doctors = vec![
            doctor("omar Khalil", "Physiology", 3.0, 1),
            doctor("Adel Mansour", "Pharmacology", 2.0, 1),
            doctor("LINA Nasser", "Anatomy", 5.0, 1),
        ];
        sort_doctors(&mut doctors, SortKey::Name);
        let names: Vec<&str> = doctors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Adel Mansour", "LINA Nasser", "omar Khalil"]);
    }

    #[test]
    fn filters_compose_and_ignore_case() {
        let doctors = vec![
            doctor("Sara Haddad", "Anatomy", 4.0, 3),
            doctor("Omar Khalil", "Physiology", 3.5, 2),
            doctor("Lina Nasser", "Anatomy", 4.5, 8),
        ];

        let by_query = filter_doctors(&doctors, Some("PHYSIO"), None);
        assert_eq!(by_query.len(), 1);
        assert_eq!(by_query[0].name, "Omar Khalil");

        let by_title = filter_doctors(&doctors, Some("professor"), None);
        assert_eq!(by_title.len(), 3);

        let composed = filter_doctors(&doctors, Some("nasser"), Some("Anatomy"));
        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].name, "Lina Nasser");

        let mismatch = filter_doctors(&doctors, Some("nasser"), Some("Physiology"));
        assert!(mismatch.is_empty());
    }

    #[test]
    fn department_filter_is_exact_match() {
        let doctors = vec![
            doctor("Sara Haddad", "Anatomy", 4.0, 3),
            doctor("Omar Khalil", "Physiology", 3.5, 2),
            doctor("Lina Nasser", "Anatomy", 4.5, 8),
        ];

        let anatomy = filter_doctors(&doctors, None, Some("Anatomy"));
        assert_eq!(anatomy.len(), 2);
        assert!(anatomy.iter().all(|d| d.department == "Anatomy"));

        // exact match: neither case folding nor substrings apply
        assert!(filter_doctors(&doctors, None, Some("anatomy")).is_empty());
        assert!(filter_doctors(&doctors, None, Some("Anat")).is_empty());
    }

    #[test]
    fn department_list_is_sorted_and_distinct() {
        let doctors = vec![
            doctor("A", "Physiology", 1.0, 1),
            doctor("B", "Anatomy", 1.0, 1),
            doctor("C", "Anatomy", 1.0, 1),
        ];
        assert_eq!(departments(&doctors), vec!["Anatomy", "Physiology"]);
    }

    #[test]
    fn compare_set_never_exceeds_limit() {
        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let mut set = CompareSet::default();
        for id in &ids {
            set.toggle(*id);
            assert!(set.len() <= COMPARE_LIMIT);
        }
        assert_eq!(set.len(), COMPARE_LIMIT);
        assert_eq!(set.ids(), &ids[..COMPARE_LIMIT]);
        // past the bound: no eviction, no error
        assert!(!set.ids().contains(&ids[4]));
    }

    #[test]
    fn toggle_removes_present_members() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut set = CompareSet::default();
        set.toggle(a);
        set.toggle(b);
        set.toggle(a);
        assert_eq!(set.ids(), &[b]);
    }

    #[test]
    fn comparison_rows_mark_winner_and_margin() {
        let doctors = vec![
            doctor("Sara Haddad", "Anatomy", 4.5, 4),
            doctor("Omar Khalil", "Physiology", 3.0, 4),
        ];
        let rows = compare(&doctors);
        assert_eq!(rows.len(), 6);

        let overall = rows.last().unwrap();
        assert_eq!(overall.factor, "overall");
        assert_eq!(overall.winners, vec![0]);
        assert!((overall.margin - 1.5).abs() < 1e-9);
        assert_eq!(overall.values, vec![4.5, 3.0]);
    }

    #[test]
    fn full_tie_has_zero_margin() {
        let doctors = vec![
            doctor("Sara Haddad", "Anatomy", 4.0, 4),
            doctor("Omar Khalil", "Physiology", 4.0, 4),
        ];
        let rows = compare(&doctors);
        for row in rows {
            assert_eq!(row.winners.len(), 2);
            assert_eq!(row.margin, 0.0);
        }
    }
}
