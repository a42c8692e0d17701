//! `SQLite` schema definitions.
//!
//! Inspections keep their form sections in a JSON `data` column; the columns
//! next to it are the ones queried or constrained.

/// Broadcasters.
pub const CREATE_BROADCASTERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS broadcasters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Inspection forms.
pub const CREATE_INSPECTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS inspections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_number TEXT UNIQUE,
    broadcaster_id INTEGER REFERENCES broadcasters(id) ON DELETE SET NULL,
    inspection_date TEXT NOT NULL,
    status TEXT NOT NULL,
    air_status TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT
)
";

/// Reports; one per inspection.
pub const CREATE_REPORTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inspection_id INTEGER NOT NULL REFERENCES inspections(id) ON DELETE CASCADE,
    report_type TEXT NOT NULL,
    status TEXT NOT NULL,
    title TEXT NOT NULL,
    reference_number TEXT NOT NULL UNIQUE,
    findings TEXT NOT NULL DEFAULT '',
    observations TEXT NOT NULL DEFAULT '',
    conclusions TEXT NOT NULL DEFAULT '',
    recommendations TEXT NOT NULL DEFAULT '',
    violations TEXT NOT NULL DEFAULT '[]',
    compliance_status TEXT NOT NULL,
    generated_docx TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    date_completed TEXT
)
";

/// Per-channel ERP calculations.
pub const CREATE_ERP_CALCULATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS erp_calculations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id INTEGER NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    channel_number TEXT NOT NULL,
    frequency_mhz TEXT NOT NULL,
    forward_power_w REAL NOT NULL,
    antenna_gain_dbd REAL NOT NULL,
    losses_db REAL NOT NULL,
    erp_dbw REAL NOT NULL,
    erp_kw REAL NOT NULL,
    authorized_erp_kw REAL NOT NULL,
    is_compliant INTEGER NOT NULL,
    excess_power_kw REAL NOT NULL,
    UNIQUE (report_id, channel_number)
)
";

/// Uploaded report images.
pub const CREATE_REPORT_IMAGES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS report_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id INTEGER NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    image_type TEXT NOT NULL,
    file_path TEXT NOT NULL,
    caption TEXT NOT NULL,
    description TEXT,
    position TEXT NOT NULL,
    order_in_section INTEGER NOT NULL,
    width_percentage INTEGER NOT NULL,
    alignment TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
)
";

/// Reports are looked up by inspection.
pub const CREATE_REPORT_INSPECTION_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_inspection ON reports(inspection_id)
";

/// Images are listed per report in section order.
pub const CREATE_IMAGE_ORDER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_report_images_order
    ON report_images(report_id, image_type, order_in_section)
";

/// Inspections are listed newest first.
pub const CREATE_INSPECTION_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_inspections_date ON inspections(inspection_date DESC)
";

/// Key-value pairs such as the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_BROADCASTERS_TABLE,
    CREATE_INSPECTIONS_TABLE,
    CREATE_REPORTS_TABLE,
    CREATE_ERP_CALCULATIONS_TABLE,
    CREATE_REPORT_IMAGES_TABLE,
    CREATE_REPORT_INSPECTION_INDEX,
    CREATE_IMAGE_ORDER_INDEX,
    CREATE_INSPECTION_DATE_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_numbers_are_unique_columns() {
        assert!(CREATE_REPORTS_TABLE.contains("reference_number TEXT NOT NULL UNIQUE"));
        assert!(CREATE_INSPECTIONS_TABLE.contains("form_number TEXT UNIQUE"));
        assert!(CREATE_ERP_CALCULATIONS_TABLE.contains("UNIQUE (report_id, channel_number)"));
    }
}
