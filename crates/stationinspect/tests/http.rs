//! HTTP API tests against an in-memory database.

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use chrono::NaiveDate;
use serde_json::{json, Value};

use stationinspect::config::{StorageConfig, UploadConfig};
use stationinspect::model::{Inspection, StationType};
use stationinspect::server::{routes, AppState};
use stationinspect::{Config, ReportService, Storage};

const BOUNDARY: &str = "stationinspect-test-boundary";

fn service(dir: &std::path::Path) -> ReportService {
    let config = Config {
        storage: StorageConfig {
            database_path: None,
            media_dir: Some(dir.join("media")),
            output_dir: Some(dir.join("out")),
        },
        ..Config::default()
    };
    ReportService::new(Storage::open_in_memory().unwrap(), config)
}

fn fm_inspection(forward_power: &str) -> Inspection {
    let mut inspection =
        Inspection::new(NaiveDate::from_ymd_opt(2024, 10, 28).unwrap(), "Jane Wanjiru");
    inspection.site.station_type = Some(StationType::Fm);
    inspection.site.transmitting_site_name = Some("Limuru Hill".to_string());
    inspection.transmitter.amplifier.actual_reading = Some(forward_power.to_string());
    inspection.transmitter.amplifier.transmit_frequency = Some("98.4".to_string());
    inspection.tower.has_lightning_protection = true;
    inspection.tower.is_electrically_grounded = true;
    inspection
}

/// Seed an inspection and return its id.
fn seed_inspection(service: &ReportService, forward_power: &str) -> i64 {
    service
        .create_inspection(fm_inspection(forward_power))
        .unwrap()
        .id
        .unwrap()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 2, 0, 0, 0, 0, 0, 0, 0]);
    bytes
}

fn text_part(body: &mut Vec<u8>, name: &str, value: &str) {
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .as_bytes(),
    );
}

fn file_part(body: &mut Vec<u8>, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) {
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
             filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
}

fn multipart_request(body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/reports/bulk_upload/")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($service)))
                .service(routes()),
        )
        .await
    };
}

#[actix_web::test]
async fn test_calculate_erp() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(service(dir.path()));

    let req = test::TestRequest::post()
        .uri("/api/erp-calculations/calculate_erp/")
        .set_json(json!({ "forward_power_w": 3000.0 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert!((body["erp_dbw"].as_f64().unwrap() - 44.27).abs() < 1e-9);
    assert_eq!(body["is_compliant"], json!(false));
    assert!((body["excess_power_kw"].as_f64().unwrap() - 16.738).abs() < 0.01);
}

#[actix_web::test]
async fn test_calculate_erp_rejects_non_positive_power() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(service(dir.path()));

    let req = test::TestRequest::post()
        .uri("/api/erp-calculations/calculate_erp/")
        .set_json(json!({ "forward_power_w": 0.0 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_create_report_from_inspection() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let inspection_id = seed_inspection(&service, "3000");
    let app = app!(service);

    let uri = format!("/api/reports/from-inspection/{inspection_id}/");
    let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["created"], json!(true));
    assert_eq!(body["report"]["reference_number"], json!("CA/FSM/BC/001 Vol. II"));
    assert_eq!(body["report"]["compliance_status"], json!("major_violations"));

    let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let again: Value = test::read_body_json(resp).await;
    assert_eq!(again["created"], json!(false));
    assert_eq!(again["report"]["id"], body["report"]["id"]);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/reports/from-inspection/999/")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_bulk_calculate() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let inspection_id = seed_inspection(&service, "300");
    let report_id = service
        .create_report_from_inspection(inspection_id)
        .unwrap()
        .report
        .id
        .unwrap();
    let app = app!(service);

    let req = test::TestRequest::post()
        .uri("/api/erp-calculations/bulk_calculate/")
        .set_json(json!({ "channels": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/erp-calculations/bulk_calculate/")
        .set_json(json!({
            "report_id": report_id,
            "channels": [
                { "channel_number": "CH.1", "frequency_mhz": "98.4", "forward_power_w": 300.0 },
                { "channel_number": "CH.2", "frequency_mhz": "101.1", "forward_power_w": -5.0 },
            ],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total_calculated"], json!(1));
    assert_eq!(body["total_errors"], json!(1));
    assert_eq!(body["calculations"][0]["created"], json!(false));
    assert_eq!(body["errors"][0]["channel"], json!("CH.2"));
}

#[actix_web::test]
async fn test_bulk_upload_and_requirements() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let inspection_id = seed_inspection(&service, "300");
    let report_id = service
        .create_report_from_inspection(inspection_id)
        .unwrap()
        .report
        .id
        .unwrap();
    let app = app!(service);

    let mut body = Vec::new();
    text_part(&mut body, "report_id", &report_id.to_string());
    file_part(&mut body, "mast", "mast.png", "image/png", &png(800, 600));
    text_part(&mut body, "mast_type", "tower_mast");
    text_part(&mut body, "mast_caption", "Guyed mast");
    file_part(&mut body, "notes", "notes.txt", "text/plain", b"not an image");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let resp = test::call_service(&app, multipart_request(body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let result: Value = test::read_body_json(resp).await;
    assert_eq!(result["total_uploaded"], json!(1));
    assert_eq!(result["total_errors"], json!(1));
    assert_eq!(result["uploaded_images"][0]["type"], json!("tower_mast"));
    assert_eq!(result["uploaded_images"][0]["caption"], json!("Guyed mast"));
    assert_eq!(result["errors"][0]["filename"], json!("notes.txt"));

    let uri = format!("/api/reports/{report_id}/image_requirements/");
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let requirements: Value = test::read_body_json(resp).await;
    let tower = requirements["requirements"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["category"] == json!("tower_mast"))
        .unwrap();
    assert_eq!(tower["count"], json!(1));
    assert_eq!(tower["required"], json!(true));
}

#[actix_web::test]
async fn test_bulk_upload_rejects_oversized_parts() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        uploads: UploadConfig {
            max_file_bytes: 40,
            ..UploadConfig::default()
        },
        ..service(dir.path()).config().clone()
    };
    let service = ReportService::new(Storage::open_in_memory().unwrap(), config);
    let inspection_id = seed_inspection(&service, "300");
    let report_id = service
        .create_report_from_inspection(inspection_id)
        .unwrap()
        .report
        .id
        .unwrap();
    let app = app!(service);

    let mut large = png(8, 8);
    large.resize(4096, 0);
    let mut body = Vec::new();
    text_part(&mut body, "report_id", &report_id.to_string());
    file_part(&mut body, "big", "big.png", "image/png", &large);
    file_part(&mut body, "small", "small.png", "image/png", &png(8, 8));
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let resp = test::call_service(&app, multipart_request(body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let result: Value = test::read_body_json(resp).await;
    assert_eq!(result["total_uploaded"], json!(1));
    assert_eq!(result["total_errors"], json!(1));
    assert_eq!(result["uploaded_images"][0]["filename"], json!("small.png"));
    assert_eq!(result["errors"][0]["filename"], json!("big.png"));
    assert_eq!(
        result["errors"][0]["error"],
        json!("file exceeds the limit of 40 bytes")
    );
}

#[actix_web::test]
async fn test_bulk_upload_rejects_oversized_text_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(service(dir.path()));

    let mut body = Vec::new();
    text_part(&mut body, "report_id", "1");
    text_part(&mut body, "mast_caption", &"x".repeat(70 * 1024));
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let resp = test::call_service(&app, multipart_request(body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_bulk_upload_requires_report_id() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(service(dir.path()));

    let mut body = Vec::new();
    file_part(&mut body, "mast", "mast.png", "image/png", &png(8, 8));
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let resp = test::call_service(&app, multipart_request(body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_generate_and_download() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let inspection_id = seed_inspection(&service, "3000");
    let report_id = service
        .create_report_from_inspection(inspection_id)
        .unwrap()
        .report
        .id
        .unwrap();
    let app = app!(service);

    let download = format!("/api/reports/{report_id}/download_docx/");
    let resp =
        test::call_service(&app, test::TestRequest::get().uri(&download).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/api/reports/{report_id}/generate_documents/"))
        .set_json(json!({ "formats": ["docx", "pdf"], "include_images": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let generated: Value = test::read_body_json(resp).await;
    assert_eq!(generated["success"], json!(true));
    assert_eq!(generated["file_name"], json!("CA_FSM_BC_001 Vol. II.docx"));
    assert_eq!(generated["generation_info"]["formats_generated"], json!(["docx"]));
    assert_eq!(generated["generation_info"]["include_images"], json!(false));

    let resp =
        test::call_service(&app, test::TestRequest::get().uri(&download).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type
        .to_str()
        .unwrap()
        .starts_with("application/vnd.openxmlformats-officedocument"));
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("CA_FSM_BC_001 Vol. II.docx"));

    let bytes = test::read_body(resp).await;
    assert!(bytes.starts_with(b"PK"));
}

#[actix_web::test]
async fn test_generate_rejects_unsupported_formats() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let inspection_id = seed_inspection(&service, "300");
    let report_id = service
        .create_report_from_inspection(inspection_id)
        .unwrap()
        .report
        .id
        .unwrap();
    let app = app!(service);

    let req = test::TestRequest::post()
        .uri(&format!("/api/reports/{report_id}/generate_documents/"))
        .set_json(json!({ "formats": ["pdf"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_analyze_and_validate() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let inspection_id = seed_inspection(&service, "3000");
    let report_id = service
        .create_report_from_inspection(inspection_id)
        .unwrap()
        .report
        .id
        .unwrap();
    let app = app!(service);

    let req = test::TestRequest::post()
        .uri(&format!("/api/reports/{report_id}/analyze_violations/"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: Value = test::read_body_json(resp).await;
    assert_eq!(summary["compliance_status"], json!("major_violations"));
    assert!(summary["violations"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v["type"] == json!("ERP_VIOLATION")));

    let req = test::TestRequest::post()
        .uri("/api/reports/validate/")
        .set_json(json!({ "inspection_id": 999, "report_type": "fm_radio", "title": "X" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let validation: Value = test::read_body_json(resp).await;
    assert_eq!(validation["valid"], json!(false));
    assert_eq!(validation["can_generate"], json!(false));
}
