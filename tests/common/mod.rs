#![allow(dead_code)]

use std::sync::Arc;

use fixmate::auth::TokenKeys;
use fixmate::models::{CheckFlag, Id, NewApartment, NewUser};
use fixmate::repo::inmem::InMemRepo;
use fixmate::storage::FsPhotoStore;
use fixmate::AppState;
use tempfile::TempDir;

pub const SECRET: &[u8] = b"test-secret-must-be-32-bytes-long!!";

/// Fresh in-memory state plus the temp directory backing its photo store.
/// Keep the `TempDir` alive for the duration of the test.
pub fn test_state() -> (AppState, TempDir) {
    let uploads = tempfile::tempdir().unwrap();
    let state = AppState {
        repo: Arc::new(InMemRepo::new()),
        photo_store: Arc::new(FsPhotoStore::new(uploads.path())),
        tokens: Arc::new(TokenKeys::from_secret(SECRET)),
    };
    (state, uploads)
}

/// Build the full route table around a state.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(fixmate::config),
        )
        .await
    };
}

/// Insert a user directly, skipping password hashing.
pub async fn seed_user(state: &AppState, username: &str, is_owner: bool) -> Id {
    state.repo.create_user(NewUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        password_hash: "unused".into(),
        is_owner,
    }).await.unwrap()
}

pub async fn seed_apartment(state: &AppState, owner_id: Id, address: &str, to_check: bool) -> Id {
    state.repo.create_apartment(NewApartment {
        address: address.into(),
        city: "Lyon".into(),
        inventory: None,
        to_check: CheckFlag::new(to_check),
        owner_id,
    }).await.unwrap()
}

pub enum Part<'a> {
    File { name: &'a str, filename: &'a str, bytes: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

pub const BOUNDARY: &str = "FIXMATEBOUNDARY";

/// Returns (content type, body) for a multipart/form-data request.
pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body: Vec<u8> = Vec::new();
    for part in parts {
        match part {
            Part::File { name, filename, bytes } => {
                body.extend_from_slice(format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                ).as_bytes());
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text { name, value } => {
                body.extend_from_slice(format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                ).as_bytes());
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

// Minimal 1x1 PNG (transparent)
pub fn sample_png() -> Vec<u8> {
    vec![
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, // signature
        0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R', 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, b'I',
        b'D', b'A', b'T', 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A,
        0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
    ]
}
