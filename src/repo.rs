use async_trait::async_trait;

use crate::models::*;

pub mod inmem;
pub mod pg;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("invalid: {0}")] Invalid(String),
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> RepoResult<Id>;
    async fn list_owners(&self) -> RepoResult<Vec<Owner>>;
}

#[async_trait]
pub trait ApartmentRepo: Send + Sync {
    async fn get_apartment(&self, id: Id) -> RepoResult<Apartment>;
    async fn list_apartments_by_owner(&self, owner_id: Id) -> RepoResult<Vec<Apartment>>;
    async fn list_apartments_to_check(&self, tenant_id: Id) -> RepoResult<Vec<ApartmentToCheck>>;
    async fn create_apartment(&self, new: NewApartment) -> RepoResult<Id>;
    /// Fails with `NotFound` when no apartment has this id.
    async fn set_check_status(&self, id: Id, flag: CheckFlag) -> RepoResult<()>;
    async fn append_history(&self, new: NewHistoryMessage) -> RepoResult<Id>;
    /// Newest first.
    async fn list_history(&self, apartment_id: Id) -> RepoResult<Vec<HistoryEntry>>;
}

#[async_trait]
pub trait RelationRepo: Send + Sync {
    async fn relation_exists(&self, user_id: Id, related_user_id: Id) -> RepoResult<bool>;
    /// Fails with `Conflict` if the pair is already linked.
    async fn link_users(&self, user_id: Id, related_user_id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PhotoRepo: Send + Sync {
    /// All-or-nothing: either every row is inserted or none is.
    async fn insert_photos(&self, batch: Vec<NewPhoto>) -> RepoResult<Vec<Photo>>;
    /// Newest upload first.
    async fn list_photos(&self, apartment_id: Id) -> RepoResult<Vec<Photo>>;
    async fn photo_stats(&self, apartment_id: Id) -> RepoResult<PhotoStats>;
    /// Returns the number of rows touched (0 or 1).
    async fn review_photo(&self, photo_id: Id, review: PhotoReview) -> RepoResult<u64>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> RepoResult<()>;
}

pub trait Repo: UserRepo + ApartmentRepo + RelationRepo + PhotoRepo + HealthRepo {}

impl<T> Repo for T where T: UserRepo + ApartmentRepo + RelationRepo + PhotoRepo + HealthRepo {}
