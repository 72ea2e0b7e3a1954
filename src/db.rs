use std::collections::HashMap;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    Doctor, DoctorWithRatings, ReviewRecord, ReviewScores, Role, UserAccount,
};
use crate::ratings;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (
            Uuid::parse_str("6f1c2b6a-4d0e-4f6b-9a1e-2f4f7f0b8c11")?,
            "nadia.aziz@campus.edu",
            "Nadia Aziz",
            Role::Admin,
        ),
        (
            Uuid::parse_str("9a3d14c8-7b52-4a8e-b1d9-5c0f3e6a2d47")?,
            "sara.haddad@campus.edu",
            "Sara Haddad",
            Role::Teacher,
        ),
        (
            Uuid::parse_str("c82e9f04-1b6d-4c3a-8e57-90ab12cd34ef")?,
            "omar.khalil@campus.edu",
            "Omar Khalil",
            Role::Teacher,
        ),
    ];

    for (id, email, full_name, role) in users {
        sqlx::query(
            r#"
            INSERT INTO course_ratings.users (id, email, full_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, role = EXCLUDED.role
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(full_name)
        .bind(role.as_str())
        .execute(pool)
        .await?;
    }

    let doctors = vec![
        (
            "Dr. Sara Haddad",
            "Anatomy",
            "Associate Professor",
            "Leads the dissection lab track.",
            Some("sara.haddad@campus.edu"),
        ),
        (
            "Dr. Omar Khalil",
            "Physiology",
            "Professor",
            "Teaches cardiovascular physiology.",
            Some("omar.khalil@campus.edu"),
        ),
        (
            "Dr. Lina Nasser",
            "Pharmacology",
            "Lecturer",
            "Covers clinical pharmacokinetics.",
            None,
        ),
    ];

    for (name, department, title, bio, teacher_email) in doctors {
        let teacher_user_id = match teacher_email {
            Some(email) => Some(
                sqlx::query("SELECT id FROM course_ratings.users WHERE email = $1")
                    .bind(email)
                    .fetch_one(pool)
                    .await?
                    .get::<Uuid, _>("id"),
            ),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO course_ratings.doctors
            (id, name, department, title, bio, teacher_user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name, department) DO UPDATE
            SET title = EXCLUDED.title,
                bio = EXCLUDED.bio,
                teacher_user_id = EXCLUDED.teacher_user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(department)
        .bind(title)
        .bind(bio)
        .bind(teacher_user_id)
        .execute(pool)
        .await?;
    }

    let reviews = vec![
        (
            "seed-001",
            "Dr. Sara Haddad",
            "Anatomy",
            [5.0, 4.5, 4.0, 5.0, 4.5],
            Some("Clear walkthroughs, always reachable after lab."),
        ),
        (
            "seed-002",
            "Dr. Sara Haddad",
            "Anatomy",
            [4.0, 3.5, 4.5, 4.5, 4.0],
            None,
        ),
        (
            "seed-003",
            "Dr. Omar Khalil",
            "Physiology",
            [3.0, 2.5, 3.5, 4.5, 3.0],
            Some("Knows the material cold but lectures move fast."),
        ),
    ];

    for (source_key, name, department, scores, comment) in reviews {
        let doctor_id: Uuid = sqlx::query(
            "SELECT id FROM course_ratings.doctors WHERE name = $1 AND department = $2",
        )
        .bind(name)
        .bind(department)
        .fetch_one(pool)
        .await?
        .get("id");

        sqlx::query(
            r#"
            INSERT INTO course_ratings.reviews
            (id, doctor_id, reviewer_ref, teaching_quality, availability,
             communication, knowledge, fairness, comment, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(doctor_id)
        .bind("anonymous")
        .bind(scores[0])
        .bind(scores[1])
        .bind(scores[2])
        .bind(scores[3])
        .bind(scores[4])
        .bind(comment)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn insert_doctor(
    pool: &PgPool,
    name: &str,
    department: &str,
    title: &str,
    bio: &str,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO course_ratings.doctors (id, name, department, title, bio)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (name, department) DO UPDATE
        SET title = EXCLUDED.title, bio = EXCLUDED.bio
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(department)
    .bind(title)
    .bind(bio)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn find_user_by_email(
    pool: &PgPool,
    email: &str,
) -> anyhow::Result<Option<UserAccount>> {
    let row = sqlx::query(
        "SELECT id, email, full_name, role FROM course_ratings.users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let role: String = row.get("role");
            Ok(Some(UserAccount {
                id: row.get("id"),
                email: row.get("email"),
                full_name: row.get("full_name"),
                role: role.parse().context("stored role failed validation")?,
            }))
        }
        None => Ok(None),
    }
}

/// Attach a doctor record to its teacher account through an explicit
/// foreign key. Replaces name matching between accounts and doctor rows.
pub async fn link_teacher(pool: &PgPool, doctor_id: Uuid, email: &str) -> anyhow::Result<String> {
    let user = find_user_by_email(pool, email)
        .await?
        .with_context(|| format!("no user with email {email}"))?;

    if user.role != Role::Teacher {
        bail!("{} has role {}, expected teacher", user.email, user.role);
    }

    let updated = sqlx::query("UPDATE course_ratings.doctors SET teacher_user_id = $1 WHERE id = $2")
        .bind(user.id)
        .bind(doctor_id)
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        bail!("no doctor with id {doctor_id}");
    }

    Ok(user.full_name)
}

pub async fn insert_review(
    pool: &PgPool,
    doctor_id: Uuid,
    scores: &ReviewScores,
    comment: Option<&str>,
    reviewer_ref: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO course_ratings.reviews
        (id, doctor_id, reviewer_ref, teaching_quality, availability,
         communication, knowledge, fairness, comment)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(doctor_id)
    .bind(reviewer_ref)
    .bind(scores.teaching_quality)
    .bind(scores.availability)
    .bind(scores.communication)
    .bind(scores.knowledge)
    .bind(scores.fairness)
    .bind(comment)
    .execute(pool)
    .await
    .with_context(|| format!("failed to insert review for doctor {doctor_id}"))?;

    Ok(id)
}

pub async fn fetch_doctors(pool: &PgPool) -> anyhow::Result<Vec<Doctor>> {
    let rows = sqlx::query(
        "SELECT id, name, department, title, bio, profile_image_url, \
         teacher_user_id, created_at \
         FROM course_ratings.doctors",
    )
    .fetch_all(pool)
    .await?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(Doctor {
            id: row.get("id"),
            name: row.get("name"),
            department: row.get("department"),
            title: row.get("title"),
            bio: row.get("bio"),
            profile_image_url: row.get("profile_image_url"),
            teacher_user_id: row.get("teacher_user_id"),
            created_at: row.get("created_at"),
        });
    }

    Ok(doctors)
}

pub async fn fetch_reviews(
    pool: &PgPool,
    doctor_id: Option<Uuid>,
) -> anyhow::Result<Vec<ReviewRecord>> {
    let mut query = String::from(
        "SELECT id, doctor_id, reviewer_ref, teaching_quality, availability, \
         communication, knowledge, fairness, comment, created_at \
         FROM course_ratings.reviews",
    );

    if doctor_id.is_some() {
        query.push_str(" WHERE doctor_id = $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = doctor_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut reviews = Vec::new();

    for row in records {
        reviews.push(ReviewRecord {
            id: row.get("id"),
            doctor_id: row.get("doctor_id"),
            reviewer_ref: row.get("reviewer_ref"),
            scores: ReviewScores {
                teaching_quality: row.get("teaching_quality"),
                availability: row.get("availability"),
                communication: row.get("communication"),
                knowledge: row.get("knowledge"),
                fairness: row.get("fairness"),
            },
            comment: row.get("comment"),
            created_at: row.get("created_at"),
        });
    }

    Ok(reviews)
}

/// Every doctor with its summary recomputed from the current review rows.
/// Summaries are never stored; this is the read path the listing,
/// comparison, and report views all share.
pub async fn load_doctors_with_ratings(pool: &PgPool) -> anyhow::Result<Vec<DoctorWithRatings>> {
    let doctors = fetch_doctors(pool).await?;
    let reviews = fetch_reviews(pool, None).await?;

    let mut by_doctor: HashMap<Uuid, Vec<ReviewRecord>> = HashMap::new();
    for review in reviews {
        by_doctor.entry(review.doctor_id).or_default().push(review);
    }

    Ok(doctors
        .into_iter()
        .map(|doctor| {
            let summary = match by_doctor.get(&doctor.id) {
                Some(rows) => ratings::summarize(rows),
                None => ratings::summarize(&[]),
            };
            DoctorWithRatings {
                id: doctor.id,
                name: doctor.name,
                department: doctor.department,
                title: doctor.title,
                bio: doctor.bio,
                profile_image_url: doctor.profile_image_url,
                ratings: summary,
            }
        })
        .collect())
}

#[derive(serde::Deserialize)]
struct ImportRow {
    doctor_name: String,
    department: String,
    teaching_quality: f64,
    availability: f64,
    communication: f64,
    knowledge: f64,
    fairness: f64,
    comment: Option<String>,
    reviewer_ref: Option<String>,
    created_at: Option<DateTime<Utc>>,
    source_key: Option<String>,
}

impl ImportRow {
    fn scores(&self) -> ReviewScores {
        ReviewScores {
            teaching_quality: self.teaching_quality,
            availability: self.availability,
            communication: self.communication,
            knowledge: self.knowledge,
            fairness: self.fairness,
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub skipped: Vec<String>,
}

/// Off-scale scores reject the row, never the whole import.
fn check_import_row(index: usize, row: &ImportRow) -> Option<String> {
    ratings::invalid_factor(&row.scores()).map(|factor| {
        format!(
            "row {} ({}): {factor} score is off the 0.0-5.0 half-point scale",
            index + 1,
            row.doctor_name
        )
    })
}

/// Dedupe key for rows that ship without one. Derived from the row's
/// position and doctor so a re-run of the same file hits the same keys
/// instead of minting fresh ones.
fn fallback_source_key(index: usize, row: &ImportRow) -> String {
    let slug = |value: &str| value.to_lowercase().replace(' ', "-");
    format!(
        "import-{:04}-{}-{}",
        index + 1,
        slug(&row.doctor_name),
        slug(&row.department)
    )
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportOutcome> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut outcome = ImportOutcome::default();

    for (index, result) in reader.deserialize::<ImportRow>().enumerate() {
        let row = result?;
        if let Some(reason) = check_import_row(index, &row) {
            outcome.skipped.push(reason);
            continue;
        }
        let scores = row.scores();

        let doctor_id: Uuid = sqlx::query(
            r#"
            INSERT INTO course_ratings.doctors (id, name, department)
            VALUES ($1, $2, $3)
            ON CONFLICT (name, department) DO UPDATE
            SET department = EXCLUDED.department
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.doctor_name)
        .bind(&row.department)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = match row.source_key.as_deref() {
            Some(key) => key.to_string(),
            None => fallback_source_key(index, &row),
        };
        let reviewer_ref = row.reviewer_ref.as_deref().unwrap_or("anonymous");
        let created_at = row.created_at.unwrap_or_else(Utc::now);

        let result = sqlx::query(
            r#"
            INSERT INTO course_ratings.reviews
            (id, doctor_id, reviewer_ref, teaching_quality, availability,
             communication, knowledge, fairness, comment, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(doctor_id)
        .bind(reviewer_ref)
        .bind(scores.teaching_quality)
        .bind(scores.availability)
        .bind(scores.communication)
        .bind(scores.knowledge)
        .bind(scores.fairness)
        .bind(&row.comment)
        .bind(created_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            outcome.inserted += 1;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import_row(doctor_name: &str, department: &str, scores: [f64; 5]) -> ImportRow {
        ImportRow {
            doctor_name: doctor_name.to_string(),
            department: department.to_string(),
            teaching_quality: scores[0],
            availability: scores[1],
            communication: scores[2],
            knowledge: scores[3],
            fairness: scores[4],
            comment: None,
            reviewer_ref: None,
            created_at: None,
            source_key: None,
        }
    }

    #[test]
    fn invalid_rows_are_rejected_individually() {
        let good = import_row("Dr. Sara Haddad", "Anatomy", [4.0, 4.5, 3.5, 5.0, 4.0]);
        assert_eq!(check_import_row(0, &good), None);

        let bad = import_row("Dr. Omar Khalil", "Physiology", [4.0, 4.5, 3.3, 5.0, 4.0]);
        let reason = check_import_row(1, &bad).unwrap();
        assert!(reason.contains("row 2"));
        assert!(reason.contains("Dr. Omar Khalil"));
        assert!(reason.contains("communication"));
    }

    #[test]
    fn fallback_keys_are_deterministic_per_row() {
        let row = import_row("Dr. Sara Haddad", "Anatomy", [4.0; 5]);
        let key = fallback_source_key(0, &row);
        assert_eq!(key, "import-0001-dr.-sara-haddad-anatomy");
        assert_eq!(key, fallback_source_key(0, &row));

        // same row content at another position gets its own key
        assert_ne!(key, fallback_source_key(4, &row));
    }
}
