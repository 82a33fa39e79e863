//! Upload endpoint integration tests.
//!
//! Run with: `cargo test -p imgpress-api --test upload_test`

mod helpers;

use helpers::fixtures::{create_test_png, image_part, upload_form};
use helpers::{setup_test_app, setup_test_app_with};
use axum_test::multipart::MultipartForm;
use imgpress_core::BatchPolicy;

#[tokio::test]
async fn test_upload_converts_every_file() {
    let app = setup_test_app().await;
    let client = app.client();

    let form = upload_form(
        vec![
            ("first.png", create_test_png(40, 30)),
            ("second.png", create_test_png(20, 20)),
        ],
        Some("80"),
        Some("webp"),
    );
    let response = client.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let html = response.text();
    let first = html.find("first.webp").expect("first card missing");
    let second = html.find("second.webp").expect("second card missing");
    assert!(first < second);
    assert!(html.contains("/uploads/first.webp"));
    assert!(html.contains("/download-all"));

    assert_eq!(app.list(app.results_dir()), vec!["first.webp", "second.webp"]);
    assert!(app.list(app.staging_dir()).is_empty());
}

#[tokio::test]
async fn test_upload_defaults_to_webp() {
    let app = setup_test_app().await;

    let form = upload_form(vec![("photo.png", create_test_png(16, 16))], None, None);
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(app.list(app.results_dir()), vec!["photo.webp"]);
}

#[tokio::test]
async fn test_upload_to_jpeg_and_avif() {
    let app = setup_test_app().await;

    for format in ["jpeg", "avif"] {
        let form = upload_form(
            vec![("photo.png", create_test_png(16, 16))],
            Some("60"),
            Some(format),
        );
        let response = app.client().post("/upload").multipart(form).await;
        assert_eq!(response.status_code(), 200, "format {}", format);
    }

    assert_eq!(
        app.list(app.results_dir()),
        vec!["photo.avif", "photo.jpeg"]
    );
}

#[tokio::test]
async fn test_converted_file_is_served() {
    let app = setup_test_app().await;

    let form = upload_form(vec![("served.png", create_test_png(16, 16))], None, None);
    app.client().post("/upload").multipart(form).await;

    let response = app.client().get("/uploads/served.webp").await;
    assert_eq!(response.status_code(), 200);
    let bytes = response.as_bytes();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let app = setup_test_app().await;

    let form = MultipartForm::new().add_text("quality", "80");
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NO_INPUT");
    assert_eq!(body["error"], "No file sent");
}

#[tokio::test]
async fn test_upload_with_only_empty_file_parts_is_rejected() {
    let app = setup_test_app().await;

    let form = MultipartForm::new().add_part("images", image_part("", Vec::new()));
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NO_INPUT");
    assert!(app.list(app.staging_dir()).is_empty());
}

#[tokio::test]
async fn test_non_multipart_upload_is_rejected() {
    let app = setup_test_app().await;

    let response = app.client().post("/upload").text("hello").await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NO_INPUT");
}

#[tokio::test]
async fn test_corrupt_file_fails_batch_and_cleans_staging() {
    let app = setup_test_app().await;

    let form = upload_form(
        vec![
            ("good.png", create_test_png(16, 16)),
            ("broken.png", b"definitely not a png".to_vec()),
        ],
        None,
        None,
    );
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 500);
    let html = response.text();
    assert!(html.contains("<h1>Error</h1>"));
    assert!(!html.contains("broken.png"));
    assert!(app.list(app.staging_dir()).is_empty());
    assert!(!app.results_dir().join("broken.webp").exists());
}

#[tokio::test]
async fn test_partial_success_reports_failed_items() {
    let app = setup_test_app_with(|config| {
        config.batch_policy = BatchPolicy::PartialSuccess;
    })
    .await;

    let form = upload_form(
        vec![
            ("broken.png", b"definitely not a png".to_vec()),
            ("good.png", create_test_png(16, 16)),
        ],
        None,
        None,
    );
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let html = response.text();
    assert!(html.contains("good.webp"));
    assert!(html.contains("<li>broken.png</li>"));
    assert_eq!(app.list(app.results_dir()), vec!["good.webp"]);
    assert!(app.list(app.staging_dir()).is_empty());
}

#[tokio::test]
async fn test_unsupported_format_is_rejected_before_conversion() {
    let app = setup_test_app().await;

    let form = upload_form(
        vec![("photo.png", create_test_png(16, 16))],
        None,
        Some("gif"),
    );
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_FORMAT");
    assert!(app.list(app.results_dir()).is_empty());
    assert!(app.list(app.staging_dir()).is_empty());
}

#[tokio::test]
async fn test_too_many_files_are_rejected() {
    let app = setup_test_app().await;

    let files = (0..4)
        .map(|i| (["a.png", "b.png", "c.png", "d.png"][i], create_test_png(8, 8)))
        .collect();
    let response = app
        .client()
        .post("/upload")
        .multipart(upload_form(files, None, None))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(app.list(app.results_dir()).is_empty());
    assert!(app.list(app.staging_dir()).is_empty());
}

#[tokio::test]
async fn test_oversized_file_is_rejected() {
    let app = setup_test_app().await;

    let oversized = vec![0u8; 1024 * 1024 + 1];
    let form = upload_form(vec![("huge.png", oversized)], None, None);
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 413);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(app.list(app.staging_dir()).is_empty());
}

#[tokio::test]
async fn test_index_page_is_served() {
    let app = setup_test_app().await;

    let response = app.client().get("/").await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("action=\"/upload\""));
}

#[tokio::test]
async fn test_production_errors_hide_details() {
    let app = setup_test_app_with(|config| {
        config.environment = "production".to_string();
    })
    .await;

    let form = MultipartForm::new().add_text("quality", "80");
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NO_INPUT");
    assert!(body.get("details").is_none());
    assert!(body.get("error_type").is_none());
}
