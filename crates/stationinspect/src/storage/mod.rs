//! Storage layer.
//!
//! `SQLite` persistence for broadcasters, inspections, reports, per-channel
//! ERP calculations and report images. Reference and form numbers are
//! assigned inside an immediate write transaction so that two writers can
//! never read the same "highest" number.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{
    params, Connection, OptionalExtension, Row, ToSql, Transaction, TransactionBehavior,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    Broadcaster, ErpCalculation, ImageCategory, Inspection, InspectionReport, ReportImage,
};
use crate::numbering::{next_form_number, next_reference_number, FORM_PREFIX};

/// Storage engine backed by a single `SQLite` connection.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories and initializes the schema as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // === Broadcasters ===

    /// Insert a broadcaster and return it with its id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_broadcaster(&self, broadcaster: &Broadcaster) -> Result<Broadcaster> {
        let now = Utc::now();
        let mut stored = broadcaster.clone();
        stored.created_at = Some(now);
        stored.updated_at = Some(now);

        self.conn.execute(
            "INSERT INTO broadcasters (name, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                stored.name,
                serde_json::to_string(&stored)?,
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )?;
        stored.id = Some(self.conn.last_insert_rowid());
        debug!(id = stored.id, name = %stored.name, "Inserted broadcaster");
        Ok(stored)
    }

    /// Get a broadcaster by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_broadcaster(&self, id: i64) -> Result<Option<Broadcaster>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, data FROM broadcasters WHERE id = ?1",
                [id],
                Self::row_to_broadcaster,
            )
            .optional()?)
    }

    /// All broadcasters ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_broadcasters(&self) -> Result<Vec<Broadcaster>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM broadcasters ORDER BY name COLLATE NOCASE")?;
        let rows = stmt
            .query_map([], Self::row_to_broadcaster)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_to_broadcaster(row: &Row<'_>) -> rusqlite::Result<Broadcaster> {
        let mut broadcaster: Broadcaster = json_column(row, 1)?;
        broadcaster.id = Some(row.get(0)?);
        Ok(broadcaster)
    }

    // === Inspections ===

    /// Insert an inspection, assigning the next form number for its year
    /// unless one is already set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_inspection(&self, inspection: &Inspection) -> Result<Inspection> {
        let tx = self.write_transaction()?;
        let now = Utc::now();
        let mut stored = inspection.clone();
        stored.created_at = Some(now);
        stored.updated_at = Some(now);

        if stored.form_number.is_none() {
            let year = stored.inspection_date.year();
            let prefix = format!("{FORM_PREFIX}{:02}/%", year.rem_euclid(100));
            let existing: Vec<String> = tx
                .prepare("SELECT form_number FROM inspections WHERE form_number LIKE ?1")?
                .query_map([prefix], |row| row.get(0))?
                .collect::<std::result::Result<_, _>>()?;
            stored.form_number = Some(next_form_number(
                year,
                existing.iter().map(String::as_str),
            ));
        }

        tx.execute(
            r"
            INSERT INTO inspections
                (form_number, broadcaster_id, inspection_date, status, air_status, data,
                 created_at, updated_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                stored.form_number,
                stored.broadcaster_id,
                stored.inspection_date.to_string(),
                stored.status.as_str(),
                stored.air_status.as_str(),
                serde_json::to_string(&stored)?,
                now.to_rfc3339(),
                now.to_rfc3339(),
                stored.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        stored.id = Some(tx.last_insert_rowid());
        tx.commit()?;

        debug!(id = stored.id, form_number = ?stored.form_number, "Inserted inspection");
        Ok(stored)
    }

    /// Replace a stored inspection.
    ///
    /// The form number and creation time of the stored record are kept.
    ///
    /// # Errors
    ///
    /// Returns not-found if no inspection has the given id.
    pub fn update_inspection(&self, id: i64, inspection: &Inspection) -> Result<Inspection> {
        let existing = self
            .get_inspection(id)?
            .ok_or_else(|| Error::not_found("inspection", id))?;

        let now = Utc::now();
        let mut stored = inspection.clone();
        stored.id = Some(id);
        stored.form_number = existing.form_number;
        stored.created_at = existing.created_at;
        stored.updated_at = Some(now);

        self.conn.execute(
            r"
            UPDATE inspections
            SET broadcaster_id = ?1, inspection_date = ?2, status = ?3, air_status = ?4,
                data = ?5, updated_at = ?6, completed_at = ?7
            WHERE id = ?8
            ",
            params![
                stored.broadcaster_id,
                stored.inspection_date.to_string(),
                stored.status.as_str(),
                stored.air_status.as_str(),
                serde_json::to_string(&stored)?,
                now.to_rfc3339(),
                stored.completed_at.map(|t| t.to_rfc3339()),
                id,
            ],
        )?;
        Ok(stored)
    }

    /// Get an inspection by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_inspection(&self, id: i64) -> Result<Option<Inspection>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, form_number, data FROM inspections WHERE id = ?1",
                [id],
                Self::row_to_inspection,
            )
            .optional()?)
    }

    /// Inspections, newest visit first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_inspections(&self, limit: usize) -> Result<Vec<Inspection>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, form_number, data FROM inspections
            ORDER BY inspection_date DESC, id DESC LIMIT ?1
            ",
        )?;
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit_i64], Self::row_to_inspection)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_to_inspection(row: &Row<'_>) -> rusqlite::Result<Inspection> {
        let mut inspection: Inspection = json_column(row, 2)?;
        inspection.id = Some(row.get(0)?);
        inspection.form_number = row.get(1)?;
        Ok(inspection)
    }

    // === Reports ===

    /// Insert a report, assigning the next reference number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails, including when
    /// the inspection already has a report.
    pub fn insert_report(&self, report: &InspectionReport) -> Result<InspectionReport> {
        let tx = self.write_transaction()?;
        let now = Utc::now();
        let mut stored = report.clone();
        stored.created_at = Some(now);
        stored.updated_at = Some(now);

        let existing: Vec<String> = tx
            .prepare("SELECT reference_number FROM reports")?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        stored.reference_number = next_reference_number(existing.iter().map(String::as_str));

        tx.execute(
            r"
            INSERT INTO reports
                (inspection_id, report_type, status, title, reference_number, findings,
                 observations, conclusions, recommendations, violations, compliance_status,
                 generated_docx, created_at, updated_at, date_completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ",
            params![
                stored.inspection_id,
                stored.report_type.as_str(),
                stored.status.as_str(),
                stored.title,
                stored.reference_number,
                stored.findings,
                stored.observations,
                stored.conclusions,
                stored.recommendations,
                serde_json::to_string(&stored.violations)?,
                stored.compliance_status.as_str(),
                path_text(stored.generated_docx.as_deref()),
                now.to_rfc3339(),
                now.to_rfc3339(),
                stored.date_completed.map(|t| t.to_rfc3339()),
            ],
        )?;
        stored.id = Some(tx.last_insert_rowid());
        tx.commit()?;

        info!(
            id = stored.id,
            reference = %stored.reference_number,
            "Created report"
        );
        Ok(stored)
    }

    /// Save a report's mutable fields.
    ///
    /// # Errors
    ///
    /// Returns not-found if the report has no id or does not exist.
    pub fn update_report(&self, report: &mut InspectionReport) -> Result<()> {
        let id = report
            .id
            .ok_or_else(|| Error::internal("cannot update a report without an id"))?;
        let now = Utc::now();

        let affected = self.conn.execute(
            r"
            UPDATE reports
            SET report_type = ?1, status = ?2, title = ?3, findings = ?4, observations = ?5,
                conclusions = ?6, recommendations = ?7, violations = ?8,
                compliance_status = ?9, generated_docx = ?10, updated_at = ?11,
                date_completed = ?12
            WHERE id = ?13
            ",
            params![
                report.report_type.as_str(),
                report.status.as_str(),
                report.title,
                report.findings,
                report.observations,
                report.conclusions,
                report.recommendations,
                serde_json::to_string(&report.violations)?,
                report.compliance_status.as_str(),
                path_text(report.generated_docx.as_deref()),
                now.to_rfc3339(),
                report.date_completed.map(|t| t.to_rfc3339()),
                id,
            ],
        )?;
        if affected == 0 {
            return Err(Error::not_found("report", id));
        }
        report.updated_at = Some(now);
        Ok(())
    }

    /// Get a report by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_report(&self, id: i64) -> Result<Option<InspectionReport>> {
        let sql = format!("{REPORT_COLUMNS} WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_report)
            .optional()?)
    }

    /// The report of an inspection, if one was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn report_for_inspection(&self, inspection_id: i64) -> Result<Option<InspectionReport>> {
        let sql = format!("{REPORT_COLUMNS} WHERE inspection_id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [inspection_id], Self::row_to_report)
            .optional()?)
    }

    /// Reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_reports(&self, limit: usize) -> Result<Vec<InspectionReport>> {
        let sql = format!("{REPORT_COLUMNS} ORDER BY id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit_i64], Self::row_to_report)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_to_report(row: &Row<'_>) -> rusqlite::Result<InspectionReport> {
        Ok(InspectionReport {
            id: Some(row.get(0)?),
            inspection_id: row.get(1)?,
            report_type: enum_column(row, 2)?,
            status: enum_column(row, 3)?,
            title: row.get(4)?,
            reference_number: row.get(5)?,
            findings: row.get(6)?,
            observations: row.get(7)?,
            conclusions: row.get(8)?,
            recommendations: row.get(9)?,
            violations: json_column(row, 10)?,
            compliance_status: enum_column(row, 11)?,
            generated_docx: row.get::<_, Option<String>>(12)?.map(PathBuf::from),
            created_at: timestamp_column(row, 13)?,
            updated_at: timestamp_column(row, 14)?,
            date_completed: timestamp_column(row, 15)?,
        })
    }

    // === ERP calculations ===

    /// Insert or replace the calculation for a report channel.
    ///
    /// Returns the stored row and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_erp_calculation(
        &self,
        calculation: &ErpCalculation,
    ) -> Result<(ErpCalculation, bool)> {
        let tx = self.write_transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM erp_calculations WHERE report_id = ?1 AND channel_number = ?2",
                params![calculation.report_id, calculation.channel_number],
                |row| row.get(0),
            )
            .optional()?;

        let values: [&dyn ToSql; 11] = [
            &calculation.report_id,
            &calculation.channel_number,
            &calculation.frequency_mhz,
            &calculation.forward_power_w,
            &calculation.antenna_gain_dbd,
            &calculation.losses_db,
            &calculation.erp_dbw,
            &calculation.erp_kw,
            &calculation.authorized_erp_kw,
            &calculation.is_compliant,
            &calculation.excess_power_kw,
        ];

        let id = if let Some(id) = existing {
            tx.execute(
                r"
                UPDATE erp_calculations
                SET frequency_mhz = ?3, forward_power_w = ?4, antenna_gain_dbd = ?5,
                    losses_db = ?6, erp_dbw = ?7, erp_kw = ?8, authorized_erp_kw = ?9,
                    is_compliant = ?10, excess_power_kw = ?11
                WHERE report_id = ?1 AND channel_number = ?2
                ",
                &values[..],
            )?;
            id
        } else {
            tx.execute(
                r"
                INSERT INTO erp_calculations
                    (report_id, channel_number, frequency_mhz, forward_power_w,
                     antenna_gain_dbd, losses_db, erp_dbw, erp_kw, authorized_erp_kw,
                     is_compliant, excess_power_kw)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ",
                &values[..],
            )?;
            tx.last_insert_rowid()
        };
        tx.commit()?;

        let mut stored = calculation.clone();
        stored.id = Some(id);
        Ok((stored, existing.is_none()))
    }

    /// Calculations of a report in channel order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn erp_calculations(&self, report_id: i64) -> Result<Vec<ErpCalculation>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, report_id, channel_number, frequency_mhz, forward_power_w,
                   antenna_gain_dbd, losses_db, erp_dbw, erp_kw, authorized_erp_kw,
                   is_compliant, excess_power_kw
            FROM erp_calculations WHERE report_id = ?1 ORDER BY channel_number, id
            ",
        )?;
        let rows = stmt
            .query_map([report_id], |row| {
                Ok(ErpCalculation {
                    id: Some(row.get(0)?),
                    report_id: row.get(1)?,
                    channel_number: row.get(2)?,
                    frequency_mhz: row.get(3)?,
                    forward_power_w: row.get(4)?,
                    antenna_gain_dbd: row.get(5)?,
                    losses_db: row.get(6)?,
                    erp_dbw: row.get(7)?,
                    erp_kw: row.get(8)?,
                    authorized_erp_kw: row.get(9)?,
                    is_compliant: row.get(10)?,
                    excess_power_kw: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // === Images ===

    /// Insert an image record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_image(&self, image: &ReportImage) -> Result<ReportImage> {
        let now = Utc::now();
        self.conn.execute(
            r"
            INSERT INTO report_images
                (report_id, image_type, file_path, caption, description, position,
                 order_in_section, width_percentage, alignment, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                image.report_id,
                image.category.as_str(),
                image.file_path.to_string_lossy().into_owned(),
                image.caption,
                image.description,
                image.position.as_str(),
                image.order_in_section,
                image.width_percentage,
                image.alignment.as_str(),
                now.to_rfc3339(),
            ],
        )?;

        let mut stored = image.clone();
        stored.id = Some(self.conn.last_insert_rowid());
        stored.uploaded_at = Some(now);
        Ok(stored)
    }

    /// Images of a report, grouped by category in section order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn images_for_report(&self, report_id: i64) -> Result<Vec<ReportImage>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, report_id, image_type, file_path, caption, description, position,
                   order_in_section, width_percentage, alignment, uploaded_at
            FROM report_images WHERE report_id = ?1
            ORDER BY image_type, order_in_section, id
            ",
        )?;
        let rows = stmt
            .query_map([report_id], |row| {
                Ok(ReportImage {
                    id: Some(row.get(0)?),
                    report_id: row.get(1)?,
                    category: enum_column(row, 2)?,
                    file_path: PathBuf::from(row.get::<_, String>(3)?),
                    caption: row.get(4)?,
                    description: row.get(5)?,
                    position: enum_column(row, 6)?,
                    order_in_section: row.get(7)?,
                    width_percentage: row.get(8)?,
                    alignment: enum_column(row, 9)?,
                    uploaded_at: timestamp_column(row, 10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of images of one category on a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_images(&self, report_id: i64, category: ImageCategory) -> Result<u32> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM report_images WHERE report_id = ?1 AND image_type = ?2",
            params![report_id, category.as_str()],
            |row| row.get(0),
        )?)
    }

    // === Statistics ===

    /// Record counts and file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            broadcasters: count("broadcasters")?,
            inspections: count("inspections")?,
            reports: count("reports")?,
            images: count("report_images")?,
            db_size_bytes,
        })
    }
}

const REPORT_COLUMNS: &str = r"
SELECT id, inspection_id, report_type, status, title, reference_number, findings,
       observations, conclusions, recommendations, violations, compliance_status,
       generated_docx, created_at, updated_at, date_completed
FROM reports";

/// Record counts in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Broadcasters stored.
    pub broadcasters: i64,
    /// Inspections stored.
    pub inspections: i64,
    /// Reports stored.
    pub reports: i64,
    /// Report images stored.
    pub images: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn path_text(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

fn conversion_error(
    index: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(index, e))
}

fn enum_column<T: FromStr<Err = Error>>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    text.parse().map_err(|e| conversion_error(index, e))
}

fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(index)?
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_error(index, e))
        })
        .transpose()
}

/// Parse a stored `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns invalid-input for anything else.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| Error::invalid_input(format!("invalid date (expected YYYY-MM-DD): {text}")))
}
