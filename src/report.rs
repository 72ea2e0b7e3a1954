use std::collections::HashMap;
use std::fmt::Write;

use uuid::Uuid;

use crate::browse;
use crate::models::{DoctorWithRatings, ReviewRecord, SortKey};

#[derive(Debug, Clone)]
pub struct DepartmentSummary {
    pub department: String,
    pub doctor_count: usize,
    pub review_count: usize,
    pub avg_overall: f64,
}

/// Per-department rollup: doctor and review counts plus the mean overall
/// rating across the department's rated doctors.
pub fn department_mix(doctors: &[DoctorWithRatings]) -> Vec<DepartmentSummary> {
    let mut map: HashMap<String, (usize, usize, usize, f64)> = HashMap::new();

    for doctor in doctors {
        let entry = map.entry(doctor.department.clone()).or_insert((0, 0, 0, 0.0));
        entry.0 += 1;
        entry.1 += doctor.ratings.total_reviews;
        if doctor.ratings.total_reviews > 0 {
            entry.2 += 1;
            entry.3 += doctor.ratings.overall_rating;
        }
    }

    let mut summaries: Vec<DepartmentSummary> = map
        .into_iter()
        .map(
            |(department, (doctor_count, review_count, rated, overall_sum))| DepartmentSummary {
                department,
                doctor_count,
                review_count,
                avg_overall: if rated == 0 {
                    0.0
                } else {
                    overall_sum / rated as f64
                },
            },
        )
        .collect();

    summaries.sort_by(|a, b| b.review_count.cmp(&a.review_count));
    summaries
}

pub fn build_report(
    scope: Option<&str>,
    doctors: &[DoctorWithRatings],
    reviews: &[ReviewRecord],
) -> String {
    let summaries = department_mix(doctors);
    let names: HashMap<Uuid, &str> = doctors
        .iter()
        .map(|doctor| (doctor.id, doctor.name.as_str()))
        .collect();

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all departments");

    let _ = writeln!(output, "# Course Rating Report");
    let _ = writeln!(output, "Generated for {scope_label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Department Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No doctors on record.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} doctors, {} reviews (avg overall {:.1})",
                summary.department, summary.doctor_count, summary.review_count, summary.avg_overall
            );
        }
    }

    let mut ranked = doctors.to_vec();
    browse::sort_doctors(&mut ranked, SortKey::Rating);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Rated Doctors");

    if ranked.is_empty() {
        let _ = writeln!(output, "No doctors on record.");
    } else {
        for doctor in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) overall {:.1} across {} reviews",
                doctor.name,
                doctor.title,
                doctor.department,
                doctor.ratings.overall_rating,
                doctor.ratings.total_reviews
            );
        }
    }

    let mut recent: Vec<&ReviewRecord> = reviews
        .iter()
        .filter(|review| review.comment.is_some())
        .collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Review Comments");

    if recent.is_empty() {
        let _ = writeln!(output, "No written comments yet.");
    } else {
        for review in recent.iter().take(5) {
            let name = names.get(&review.doctor_id).copied().unwrap_or("unknown");
            let comment = review.comment.as_deref().unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} on {}: {}",
                name,
                review.created_at.date_naive(),
                comment
            );
        }
    }

    output
}

/// Side-by-side factor table for 2-3 doctors, winners marked per row.
pub fn build_comparison(doctors: &[DoctorWithRatings]) -> String {
    let rows = browse::compare(doctors);
    let mut output = String::new();

    let _ = writeln!(output, "# Doctor Comparison");
    let names: Vec<String> = doctors
        .iter()
        .map(|doctor| format!("{} ({})", doctor.name, doctor.department))
        .collect();
    let _ = writeln!(output, "Comparing {}", names.join(" vs "));
    let _ = writeln!(output);

    let _ = writeln!(output, "| Factor | {} |", names.join(" | "));
    let _ = writeln!(output, "|---|{}|", "---|".repeat(doctors.len()));

    for row in &rows {
        let cells: Vec<String> = row
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                if row.winners.contains(&index) && row.margin > 0.0 {
                    format!("**{value:.1}** (+{:.1})", row.margin)
                } else {
                    format!("{value:.1}")
                }
            })
            .collect();
        let _ = writeln!(output, "| {} | {} |", row.factor, cells.join(" | "));
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Higher scores are better; ratings come from anonymous student reviews."
    );

    output
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
    fn department_mix_counts_and_averages() {
        let doctors = vec![
            doctor("Dr. Sara Haddad", "Anatomy", 4.0, 3),
            doctor("Dr. Lina Nasser", "Anatomy", 2.0, 1),
            doctor("Dr. Omar Khalil", "Physiology", 0.0, 0),
        ];
        let summaries = department_mix(&doctors);
        assert_eq!(summaries.len(), 2);

        let anatomy = &summaries[0];
        assert_eq!(anatomy.department, "Anatomy");
        assert_eq!(anatomy.doctor_count, 2);
        assert_eq!(anatomy.review_count, 4);
        assert!((anatomy.avg_overall - 3.0).abs() < 1e-9);

        // zero-review departments report a zero average, not NaN
        let physiology = &summaries[1];
        assert_eq!(physiology.review_count, 0);
        assert_eq!(physiology.avg_overall, 0.0);
    }

    #[test]
    fn report_ranks_doctors_and_lists_sections() {
        let doctors = vec![
            doctor("Dr. Lina Nasser", "Pharmacology", 2.5, 2),
            doctor("Dr. Sara Haddad", "Anatomy", 4.5, 6),
        ];
        let report = build_report(None, &doctors, &[]);

        assert!(report.contains("## Department Mix"));
        assert!(report.contains("## Top Rated Doctors"));
        assert!(report.contains("No written comments yet."));

        let haddad = report.find("Dr. Sara Haddad").unwrap();
        let nasser = report.find("Dr. Lina Nasser").unwrap();
        assert!(haddad < nasser);
    }

    #[test]
    fn comparison_marks_winning_cells() {
        let doctors = vec![
            doctor("Dr. Sara Haddad", "Anatomy", 4.5, 4),
            doctor("Dr. Omar Khalil", "Physiology", 3.0, 4),
        ];
        let table = build_comparison(&doctors);
        assert!(table.contains("| overall | **4.5** (+1.5) | 3.0 |"));
    }
}
