use crate::error::ApiErrorBody;
use crate::models::{Apartment, ApartmentToCheck, CheckFlag, HistoryEntry, Owner, Photo, PhotoStats, PhotoStatus, UserSummary};
use crate::routes;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::status,
        routes::register,
        routes::login,
        routes::me,
        routes::get_apartment,
        routes::list_apartments_by_owner,
        routes::list_apartments_to_check,
        routes::create_apartment,
        routes::toggle_check,
        routes::log_check,
        routes::list_history,
        routes::list_owners,
        routes::link_owner,
        routes::upload_photos,
        routes::list_photos,
        routes::photo_stats,
        routes::review_photo,
    ),
    components(schemas(
        Apartment, ApartmentToCheck, CheckFlag, HistoryEntry, Owner, Photo, PhotoStats, PhotoStatus, UserSummary,
        ApiErrorBody,
        routes::StatusResponse,
        routes::RegisterRequest, routes::RegisterResponse,
        routes::LoginRequest, routes::LoginResponse,
        routes::ApartmentResponse, routes::ApartmentListResponse, routes::ApartmentToCheckListResponse,
        routes::CreateApartmentRequest, routes::CreateApartmentResponse,
        routes::CheckStatusRequest, routes::LogCheckRequest, routes::LogCheckResponse,
        routes::HistoryResponse, routes::OwnersResponse, routes::LinkOwnerRequest,
        routes::UploadResponse, routes::ReviewRequest,
    )),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "apartments", description = "Apartment records and inspection workflow"),
        (name = "users", description = "Owner listing and tenant links"),
        (name = "photos", description = "Photo upload and review"),
    )
)]
pub struct ApiDoc;
