use actix_web::{http::StatusCode, test, web, App};
use book_catalog::api;
use book_catalog::app_state::AppState;
use book_catalog::config::AppConfig;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

const BOUNDARY: &str = "----catalogtestboundary";
const PDF: &[u8] = b"%PDF-1.4\n% test document\n%%EOF";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn content_type() -> (&'static str, String) {
    ("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
}

fn local_state(dir: &Path) -> AppState {
    let mut config = AppConfig::default();
    config.storage.pdf_dir = dir.join("pdfs");
    config.metadata.metadata_path = dir.join("metadata.json");
    AppState::from_config(config).unwrap()
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(api::configure),
        )
        .await
    };
}

macro_rules! upload {
    ($app:expr, $title:expr, $class:expr, $author:expr) => {{
        let body = multipart_body(&[
            Part::Text("title", $title),
            Part::Text("class", $class),
            Part::Text("category", "textbook"),
            Part::Text("author", $author),
            Part::File("pdf", "book.pdf", PDF),
        ]);
        let req = test::TestRequest::post()
            .uri("/api/books/store")
            .insert_header(content_type())
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json: Value = test::read_body_json(resp).await;
        json["data"].clone()
    }};
}

#[actix_web::test]
async fn test_create_show_download_round_trip() {
    let dir = TempDir::new().unwrap();
    let app = init_app!(local_state(dir.path()));

    let book = upload!(app, "Physics", "10", "Ann Lee");
    let id = book["id"].as_str().unwrap().to_string();
    assert_eq!(book["filename"], format!("{}.pdf", id));
    assert!(dir.path().join("pdfs").join(format!("{}.pdf", id)).exists());

    let req = test::TestRequest::get().uri(&format!("/api/books/{}", id)).to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(json["status"], true);
    assert_eq!(json["message"], "Book details retrieved");
    assert_eq!(json["data"], book);

    let req = test::TestRequest::get().uri(&format!("/api/books/{}/download", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/pdf");
    let expected_etag = format!("\"{:x}\"", md5::compute(PDF));
    assert_eq!(resp.headers().get("etag").unwrap().to_str().unwrap(), expected_etag);
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], PDF);
}

#[actix_web::test]
async fn test_list_filters() {
    let app = init_app!(AppState::new_for_testing());

    let tenth = upload!(app, "Chemistry", "10", "Alice Smith");
    let ninth = upload!(app, "Alice in Wonderland", "9", "");
    upload!(app, "Biology", "9", "Bob");

    let req = test::TestRequest::get().uri("/api/books?class=10").to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["data"][0], tenth);

    let req = test::TestRequest::get().uri("/api/books?q=ALICE").to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(json["message"], "Books fetched successfully");
    assert_eq!(json["count"], 2);
    assert_eq!(json["data"][1], ninth);
    assert!(ninth["author"].is_null());

    let req = test::TestRequest::get().uri("/api/books?class=9&q=alice").to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(json["count"], 1);

    let req = test::TestRequest::get().uri("/api/books").to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(json["count"], 3);
}

#[actix_web::test]
async fn test_update_title_only() {
    let app = init_app!(AppState::new_for_testing());
    let book = upload!(app, "Old", "10", "Ann");
    let id = book["id"].as_str().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/books/{}", id))
        .insert_header(content_type())
        .set_payload(multipart_body(&[Part::Text("title", "New")]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["message"], "Book updated successfully");
    assert_eq!(json["data"]["title"], "New");
    for field in ["class", "category", "author", "filename", "id"] {
        assert_eq!(json["data"][field], book[field], "{} changed", field);
    }
}

#[actix_web::test]
async fn test_patch_replaces_pdf_and_clears_author() {
    let dir = TempDir::new().unwrap();
    let app = init_app!(local_state(dir.path()));
    let book = upload!(app, "Atlas", "8", "Ann Lee");
    let id = book["id"].as_str().unwrap();
    let revised: &[u8] = b"%PDF-1.7\n% second edition\n%%EOF";

    let req = test::TestRequest::patch()
        .uri(&format!("/api/books/{}", id))
        .insert_header(content_type())
        .set_payload(multipart_body(&[
            Part::Text("author", ""),
            Part::File("pdf", "second-edition.pdf", revised),
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert!(json["data"]["author"].is_null());
    assert_eq!(json["data"]["filename"], book["filename"]);
    assert_eq!(json["data"]["title"], "Atlas");

    let req = test::TestRequest::get().uri(&format!("/api/books/{}/download", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let expected_etag = format!("\"{:x}\"", md5::compute(revised));
    assert_eq!(resp.headers().get("etag").unwrap().to_str().unwrap(), expected_etag);
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], revised);

    let on_disk: Vec<_> = std::fs::read_dir(dir.path().join("pdfs")).unwrap().collect();
    assert_eq!(on_disk.len(), 1);
}

#[actix_web::test]
async fn test_update_missing_book_is_404() {
    let app = init_app!(AppState::new_for_testing());
    let req = test::TestRequest::put()
        .uri("/api/books/bmissing1")
        .insert_header(content_type())
        .set_payload(multipart_body(&[Part::Text("title", "New")]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], false);
    assert_eq!(json["message"], "Book not found");
    assert!(json["data"].is_null());
}

#[actix_web::test]
async fn test_delete_twice() {
    let dir = TempDir::new().unwrap();
    let app = init_app!(local_state(dir.path()));
    let book = upload!(app, "Temp", "1", "");
    let id = book["id"].as_str().unwrap();

    let req = test::TestRequest::delete().uri(&format!("/api/books/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["message"], "Book deleted successfully");
    assert!(json["data"].is_null());
    assert!(!dir.path().join("pdfs").join(format!("{}.pdf", id)).exists());

    let req = test::TestRequest::delete().uri(&format!("/api/books/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_download_after_external_removal_is_gone() {
    let dir = TempDir::new().unwrap();
    let app = init_app!(local_state(dir.path()));
    let book = upload!(app, "Fragile", "1", "");
    let id = book["id"].as_str().unwrap();

    std::fs::remove_file(dir.path().join("pdfs").join(format!("{}.pdf", id))).unwrap();

    let req = test::TestRequest::get().uri(&format!("/api/books/{}/download", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GONE);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["message"], "File missing");

    let req = test::TestRequest::get().uri("/api/books/bnotthere/download").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_create_validation_errors() {
    let app = init_app!(AppState::new_for_testing());

    let req = test::TestRequest::post()
        .uri("/api/books/store")
        .insert_header(content_type())
        .set_payload(multipart_body(&[
            Part::Text("class", "10"),
            Part::Text("category", "textbook"),
            Part::File("pdf", "book.pdf", PDF),
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["message"], "The title field is required.");

    let req = test::TestRequest::post()
        .uri("/api/books/store")
        .insert_header(content_type())
        .set_payload(multipart_body(&[
            Part::Text("title", "Fake"),
            Part::Text("class", "10"),
            Part::Text("category", "textbook"),
            Part::File("pdf", "book.pdf", b"not a pdf at all"),
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::get().uri("/api/books").to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(json["count"], 0);
}
