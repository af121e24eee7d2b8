use anyhow::Context;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::SubmissionRecord;
use crate::records;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("submission store request failed")]
    Query(#[from] sqlx::Error),
    #[error("schema migration failed")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Error)]
#[error("invalid access code")]
pub struct AccessDenied;

pub async fn init_db(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Stores one record. Returns `None` when a record with the same id exists.
pub async fn insert_submission<'e, E>(
    executor: E,
    record: &SubmissionRecord,
) -> Result<Option<Uuid>, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = record.id.unwrap_or_else(Uuid::new_v4);
    let selected_day = records::day_column(&record.selected_day);
    if selected_day.is_none() && !record.selected_day.is_null() {
        warn!("storing {id} without a day: {} is not a day number", record.selected_day);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO event_feedback.evaluations
        (id, name, email, sex, position, school, selected_day,
         general_ratings, session_ratings, strengths, improvements, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(record.name.as_deref())
    .bind(record.email.as_deref())
    .bind(record.sex.as_deref())
    .bind(record.position.as_deref())
    .bind(record.school.as_deref())
    .bind(selected_day)
    .bind(&record.general_ratings)
    .bind(&record.session_ratings)
    .bind(record.strengths.as_deref())
    .bind(record.improvements.as_deref())
    .bind(record.submitted_at.unwrap_or_else(Utc::now))
    .execute(executor)
    .await?;

    if result.rows_affected() > 0 {
        info!("stored evaluation {id}");
        Ok(Some(id))
    } else {
        Ok(None)
    }
}

/// Every stored record, in no particular order.
pub async fn fetch_submissions(pool: &PgPool) -> Result<Vec<SubmissionRecord>, StoreError> {
    let rows = sqlx::query(
        "SELECT id, name, email, sex, position, school, selected_day, \
         general_ratings, session_ratings, strengths, improvements, submitted_at \
         FROM event_feedback.evaluations",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let selected_day: Option<i32> = row.try_get("selected_day")?;
        let general_ratings: Option<Value> = row.try_get("general_ratings")?;
        let session_ratings: Option<Value> = row.try_get("session_ratings")?;
        records.push(SubmissionRecord {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            sex: row.try_get("sex")?,
            position: row.try_get("position")?,
            school: row.try_get("school")?,
            selected_day: selected_day.map(Value::from).unwrap_or(Value::Null),
            general_ratings: general_ratings.unwrap_or(Value::Null),
            session_ratings: session_ratings.unwrap_or(Value::Null),
            strengths: row.try_get("strengths")?,
            improvements: row.try_get("improvements")?,
            submitted_at: Some(row.try_get("submitted_at")?),
        });
    }

    info!("fetched {} evaluations", records.len());
    Ok(records)
}

pub async fn verify_access_code(pool: &PgPool, code: &str) -> Result<bool, StoreError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(false);
    }
    let valid: bool = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM event_feedback.access_codes WHERE code = $1) AS valid",
    )
    .bind(code)
    .fetch_one(pool)
    .await?
    .try_get("valid")?;
    Ok(valid)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO event_feedback.access_codes (code, label)
        VALUES ($1, $2)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind("QAME-ADMIN-2026")
    .bind("Division evaluation team")
    .execute(pool)
    .await?;

    let submitted_at = Utc
        .with_ymd_and_hms(2026, 2, 11, 17, 30, 0)
        .single()
        .context("invalid seed timestamp")?;

    let samples = vec![
        (
            "6f1c2a8e-2d54-4a77-9a1e-0c4de0e3b101",
            json!({
                "name": "Maria Santos",
                "email": "maria.santos@deped.gov.ph",
                "sex": "Female",
                "position": "Principal II",
                "school": "Bagong Silangan High School",
                "selected_day": 1,
                "general_ratings": {"pm1": 5, "pm2": 5, "pm3": 4, "pm4": 4, "v1": 5, "v2": 4, "v3": 4, "m1": 3, "m2": 4, "m3": 4},
                "session_ratings": {
                    "d1-s1": {"sq1": 5, "sq2": 5, "sq3": 4, "sq4": 4},
                    "d1-s2": {"sq1": 4, "sq2": 5, "sq3": 4, "sq4": 3}
                },
                "strengths": "The procurement session was very practical.",
                "improvements": "Serve lunch a little earlier."
            }),
        ),
        (
            "0a9b7c53-6e0f-4c2b-8d1e-5f3a2b1c7d02",
            json!({
                "name": "Jose Ramirez",
                "email": "jose.ramirez@deped.gov.ph",
                "sex": "Male",
                "position": "Master Teacher II",
                "school": "Commonwealth Elementary School",
                "selected_day": 1,
                "general_ratings": {"pm1": 4, "pm2": 4, "pm3": 4, "pm4": 3, "v1": 4, "v2": 4, "v3": 3, "m1": 4, "m2": 4, "m3": 3},
                "session_ratings": {"d1-s3": {"sq1": 4, "sq2": 4, "sq3": 3, "sq4": 4}},
                "strengths": "",
                "improvements": "Provide printed copies of the slides."
            }),
        ),
        (
            "c4e2f1d0-3b8a-4f6e-9c7d-2a1b0e9f8d03",
            json!({
                "name": "",
                "email": "ana.villanueva@deped.gov.ph",
                "sex": "Female",
                "position": "Public School District Supervisor",
                "school": "District II Office",
                "selected_day": "2",
                "general_ratings": {"pm1": 5, "pm2": 5, "pm3": 5, "pm4": 5, "v1": 5, "v2": 5, "v3": 4, "m1": 5, "m2": 5, "m3": 4},
                "session_ratings": {
                    "d2-s4": {"sq1": 5, "sq2": 5, "sq3": 5, "sq4": 4},
                    "d2-s5": {"sq1": 5, "sq2": 4, "sq3": 4, "sq4": 4}
                },
                "strengths": "Child protection cases were discussed clearly.",
                "improvements": ""
            }),
        ),
        (
            "9d8c7b6a-5f4e-4d3c-8b2a-1f0e9d8c7b04",
            json!({
                "name": "Ramon Cruz",
                "email": "ramon.cruz@deped.gov.ph",
                "sex": "Male",
                "position": "Principal IV",
                "school": "Quezon City Science High School",
                "selected_day": 3,
                "general_ratings": {"pm1": 4, "pm2": 3, "pm3": 4, "pm4": 4, "v1": 4, "v2": 3, "v3": 3, "m1": 3, "m2": 3, "m3": 3},
                "session_ratings": {
                    "d3-s7": {"sq1": 4, "sq2": 4, "sq3": 4, "sq4": 3},
                    "d3-mancom": {"sq1": 5, "sq2": 5, "sq3": 4, "sq4": 4}
                },
                "strengths": "Mediation workshop was engaging.",
                "improvements": "Longer time for the open forum."
            }),
        ),
    ];

    for (id, sample) in samples {
        let mut record: SubmissionRecord = serde_json::from_value(sample)?;
        record.id = Some(Uuid::parse_str(id)?);
        record.submitted_at = Some(submitted_at);
        insert_submission(pool, &record).await?;
    }

    Ok(())
}

fn parse_json_column(column: &str, text: Option<String>, lineno: usize) -> Value {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Value::Null;
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) => {
            warn!("row {lineno}: {column} is not valid JSON ({err}), ignoring it");
            Value::Null
        }
    }
}

/// Reads every row of an import file, failing on the first malformed row.
fn read_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<SubmissionRecord>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: Option<Uuid>,
        name: Option<String>,
        email: Option<String>,
        sex: Option<String>,
        position: Option<String>,
        school: Option<String>,
        selected_day: Option<String>,
        general_ratings: Option<String>,
        session_ratings: Option<String>,
        strengths: Option<String>,
        improvements: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut records = Vec::new();

    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        let lineno = idx + 2;
        let row = result.with_context(|| format!("malformed row {lineno}"))?;
        records.push(SubmissionRecord {
            id: row.id,
            name: row.name,
            email: row.email,
            sex: row.sex,
            position: row.position,
            school: row.school,
            selected_day: row.selected_day.map(Value::String).unwrap_or(Value::Null),
            general_ratings: parse_json_column("general_ratings", row.general_ratings, lineno),
            session_ratings: parse_json_column("session_ratings", row.session_ratings, lineno),
            strengths: row.strengths,
            improvements: row.improvements,
            submitted_at: None,
        });
    }

    Ok(records)
}

/// Imports a whole file in one transaction, so a failed run stores nothing.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let records = read_csv(csv_path)?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for record in &records {
        if insert_submission(&mut *tx, record).await?.is_some() {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_csv_reads_every_row() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/evaluations.csv");
        let records = read_csv(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].general_ratings["pm1"], json!(4));
        assert_eq!(records[1].session_ratings, Value::Null);
        assert_eq!(records[2].selected_day, Value::Null);
    }

    #[test]
    fn malformed_row_rejects_the_whole_file() {
        let path = std::env::temp_dir().join(format!("evaluations-{}.csv", Uuid::new_v4()));
        std::fs::write(
            &path,
            "id,name,email,sex,position,school,selected_day,general_ratings,session_ratings,strengths,improvements\n\
             ,Ana,ana@deped.gov.ph,Female,Principal I,HS,1,,,,\n\
             not-a-uuid,Ben,ben@deped.gov.ph,Male,Principal I,HS,1,,,,\n",
        )
        .unwrap();
        let err = read_csv(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("malformed row 3"));
    }

    #[test]
    fn json_columns_degrade_to_null() {
        assert_eq!(
            parse_json_column("general_ratings", Some(r#"{"pm1": 4}"#.to_string()), 2),
            json!({"pm1": 4})
        );
        assert_eq!(
            parse_json_column("general_ratings", Some("{pm1: 4".to_string()), 3),
            Value::Null
        );
        assert_eq!(parse_json_column("session_ratings", None, 4), Value::Null);
        assert_eq!(
            parse_json_column("session_ratings", Some("  ".to_string()), 5),
            Value::Null
        );
    }
}
