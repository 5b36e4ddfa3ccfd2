#[macro_use]
mod common;

use std::path::Path;

use actix_web::test;
use serde_json::{json, Value};

use common::{multipart, sample_png, seed_apartment, seed_user, test_state, Part};
use fixmate::routes::{MAX_PHOTOS_PER_UPLOAD, PHOTO_SIZE_LIMIT};

fn files_in(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

fn upload_request(apartment_id: i64, parts: &[Part<'_>]) -> test::TestRequest {
    let (content_type, body) = multipart(parts);
    test::TestRequest::post()
        .uri(&format!("/api/apartments/{apartment_id}/photos"))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
}

#[actix_web::test]
async fn upload_without_files_is_rejected() {
    let (state, uploads) = test_state();
    let app = test_app!(state);
    let owner = seed_user(&state, "owner", true).await;
    let apt = seed_apartment(&state, owner, "1 Rue", false).await;

    let req = upload_request(apt, &[Part::Text { name: "message", value: "nothing attached" }]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(!uploads.path().join(apt.to_string()).exists());
    assert!(state.repo.list_photos(apt).await.unwrap().is_empty());
}

#[actix_web::test]
async fn upload_review_and_stats_flow() {
    let (state, uploads) = test_state();
    let app = test_app!(state);
    let owner = seed_user(&state, "owner", true).await;
    let apt = seed_apartment(&state, owner, "1 Rue", false).await;
    let png = sample_png();

    let req = upload_request(apt, &[
        Part::File { name: "photos", filename: "kitchen.PNG", bytes: &png },
        Part::File { name: "photos", filename: "bath.png", bytes: &png },
        Part::File { name: "photos", filename: "hall", bytes: &png },
        Part::Text { name: "message", value: "move-in state" },
        Part::Text { name: "userId", value: "42" },
    ]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let photos = body["photos"].as_array().unwrap();
    assert_eq!(photos.len(), 3);
    for p in photos {
        assert_eq!(p["status"], "pending");
        assert_eq!(p["message"], "move-in state");
        assert_eq!(p["uploaded_by"], "42");
        assert!(p["photo_url"].as_str().unwrap().starts_with(&format!("/uploads/{apt}/")));
    }
    assert!(photos[0]["photo_url"].as_str().unwrap().ends_with(".png"));
    assert_eq!(files_in(&uploads.path().join(apt.to_string())), 3);

    // the stored URL serves the bytes back
    let url = photos[0]["photo_url"].as_str().unwrap().to_string();
    let resp = test::call_service(&app, test::TestRequest::get().uri(&url).to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
    assert_eq!(test::read_body(resp).await.as_ref(), png.as_slice());

    let photo_id = photos[1]["id"].as_i64().unwrap();
    let req = test::TestRequest::patch()
        .uri(&format!("/api/apartments/photos/{photo_id}/status"))
        .set_json(json!({"status": "approved", "feedback": "ok", "reviewedBy": "owner"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/api/apartments/{apt}/photos")).to_request()).await;
    assert_eq!(resp.status(), 200);
    let listed: Value = test::read_body_json(resp).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    let reviewed = listed.iter().find(|p| p["id"] == photo_id).unwrap();
    assert_eq!(reviewed["status"], "approved");
    assert_eq!(reviewed["feedback"], "ok");
    assert_eq!(reviewed["reviewed_by"], "owner");
    assert!(reviewed["reviewed_at"].is_string());

    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/api/apartments/{apt}/photos/stats")).to_request()).await;
    assert_eq!(resp.status(), 200);
    let stats: Value = test::read_body_json(resp).await;
    assert_eq!(stats, json!({"pending": 2, "approved": 1, "rejected": 0}));
}

#[actix_web::test]
async fn review_without_feedback_keeps_previous_feedback() {
    let (state, _uploads) = test_state();
    let app = test_app!(state);
    let owner = seed_user(&state, "owner", true).await;
    let apt = seed_apartment(&state, owner, "1 Rue", false).await;
    let png = sample_png();

    let resp = test::call_service(&app, upload_request(apt, &[Part::File { name: "photos", filename: "a.png", bytes: &png }]).to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    let photo_id = body["photos"][0]["id"].as_i64().unwrap();
    // defaults when the form omits them
    assert_eq!(body["photos"][0]["uploaded_by"], "unknown");
    assert_eq!(body["photos"][0]["message"], "");

    for payload in [
        json!({"status": "rejected", "feedback": "blurry"}),
        json!({"status": "approved"}),
    ] {
        let req = test::TestRequest::patch()
            .uri(&format!("/api/apartments/photos/{photo_id}/status"))
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    let photos = state.repo.list_photos(apt).await.unwrap();
    assert_eq!(photos[0].feedback.as_deref(), Some("blurry"));
    assert_eq!(photos[0].reviewed_by.as_deref(), Some("unknown"));
    assert_eq!(photos[0].status.as_str(), "approved");
}

#[actix_web::test]
async fn review_status_is_validated() {
    let (state, _uploads) = test_state();
    let app = test_app!(state);

    for payload in [json!({"status": "pending"}), json!({"status": "maybe"}), json!({})] {
        let req = test::TestRequest::patch()
            .uri("/api/apartments/photos/1/status")
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400, "{payload}");
    }

    // unknown photo is not an error
    let req = test::TestRequest::patch()
        .uri("/api/apartments/photos/987654/status")
        .set_json(json!({"status": "approved"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
}

#[actix_web::test]
async fn upload_to_missing_apartment_leaves_nothing_behind() {
    let (state, uploads) = test_state();
    let app = test_app!(state);
    let png = sample_png();

    let resp = test::call_service(&app, upload_request(7777, &[
        Part::File { name: "photos", filename: "a.png", bytes: &png },
        Part::File { name: "photos", filename: "b.png", bytes: &png },
    ]).to_request()).await;
    assert_eq!(resp.status(), 404);
    assert!(!uploads.path().join("7777").exists());
    assert!(state.repo.list_photos(7777).await.unwrap().is_empty());
}

#[actix_web::test]
async fn oversize_file_is_rejected() {
    let (state, uploads) = test_state();
    let app = test_app!(state);
    let owner = seed_user(&state, "owner", true).await;
    let apt = seed_apartment(&state, owner, "1 Rue", false).await;
    let big = vec![0u8; PHOTO_SIZE_LIMIT + 1];

    let resp = test::call_service(&app, upload_request(apt, &[
        Part::File { name: "photos", filename: "huge.jpg", bytes: &big },
    ]).to_request()).await;
    assert_eq!(resp.status(), 413);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("photo exceeds"));
    assert_eq!(files_in(&uploads.path().join(apt.to_string())), 0);
}

#[actix_web::test]
async fn too_many_files_are_rejected() {
    let (state, uploads) = test_state();
    let app = test_app!(state);
    let owner = seed_user(&state, "owner", true).await;
    let apt = seed_apartment(&state, owner, "1 Rue", false).await;
    let png = sample_png();

    let parts: Vec<Part<'_>> = (0..=MAX_PHOTOS_PER_UPLOAD)
        .map(|_| Part::File { name: "photos", filename: "p.png", bytes: &png })
        .collect();
    let resp = test::call_service(&app, upload_request(apt, &parts).to_request()).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(files_in(&uploads.path().join(apt.to_string())), 0);
    assert!(state.repo.list_photos(apt).await.unwrap().is_empty());
}

#[actix_web::test]
async fn missing_upload_is_not_found() {
    let (state, _uploads) = test_state();
    let app = test_app!(state);

    for uri in ["/uploads/1/1700000000000-1.png", "/uploads/1/..secret"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), 404, "{uri}");
    }
}

#[actix_web::test]
async fn oversize_text_field_names_the_field() {
    let (state, uploads) = test_state();
    let app = test_app!(state);
    let owner = seed_user(&state, "owner", true).await;
    let apt = seed_apartment(&state, owner, "1 Rue", false).await;
    let png = sample_png();
    let long_message = "m".repeat(64 * 1024 + 1);

    let resp = test::call_service(&app, upload_request(apt, &[
        Part::File { name: "photos", filename: "a.png", bytes: &png },
        Part::Text { name: "message", value: &long_message },
    ]).to_request()).await;
    assert_eq!(resp.status(), 413);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "message field is too large");
    assert!(!uploads.path().join(apt.to_string()).exists());
}

#[actix_web::test]
async fn identifiers_wider_than_their_columns_are_rejected() {
    let (state, uploads) = test_state();
    let app = test_app!(state);
    let owner = seed_user(&state, "owner", true).await;
    let apt = seed_apartment(&state, owner, "1 Rue", false).await;
    let png = sample_png();
    let long_id = "u".repeat(101);

    let resp = test::call_service(&app, upload_request(apt, &[
        Part::File { name: "photos", filename: "a.png", bytes: &png },
        Part::Text { name: "userId", value: &long_id },
    ]).to_request()).await;
    assert_eq!(resp.status(), 400);
    assert!(!uploads.path().join(apt.to_string()).exists());

    // exactly at the limit is fine
    let resp = test::call_service(&app, upload_request(apt, &[
        Part::File { name: "photos", filename: "a.png", bytes: &png },
        Part::Text { name: "userId", value: &long_id[..100] },
    ]).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    let photo_id = body["photos"][0]["id"].as_i64().unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/apartments/photos/{photo_id}/status"))
        .set_json(json!({"status": "approved", "reviewedBy": long_id}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let photos = state.repo.list_photos(apt).await.unwrap();
    assert_eq!(photos[0].status.as_str(), "pending");
}
