//! In-process repository used by the test suites. Applies the same key,
//! uniqueness and foreign-key rules as the Postgres schema.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::*;

#[derive(Clone)]
struct StoredApartment {
    id: Id,
    address: String,
    city: String,
    inventory: Option<String>,
    to_check: CheckFlag,
    owner_id: Id,
    created_at: DateTime<Utc>,
}

impl StoredApartment {
    fn decode(&self) -> Apartment {
        Apartment {
            id: self.id,
            address: self.address.clone(),
            city: self.city.clone(),
            inventory: parse_inventory(self.inventory.as_deref()),
            to_check: self.to_check,
            owner_id: self.owner_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
struct StoredHistory {
    id: Id,
    apartment_id: Id,
    sender_id: Option<Id>,
    message_content: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: HashMap<Id, User>,
    apartments: HashMap<Id, StoredApartment>,
    relations: BTreeSet<(Id, Id)>,
    history: Vec<StoredHistory>,
    photos: HashMap<Id, Photo>,
    next_id: Id,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }
}

/// Mirrors the case-insensitive unique index on `users.email`.
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[derive(Clone, Default)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
}

impl InMemRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for InMemRepo {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let s = self.state.read().await;
        Ok(s.users.values().find(|u| same_email(&u.email, email)).cloned())
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let s = self.state.read().await;
        s.users.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn create_user(&self, new: NewUser) -> RepoResult<Id> {
        let mut s = self.state.write().await;
        if s.users.values().any(|u| same_email(&u.email, &new.email)) {
            return Err(RepoError::Conflict);
        }
        let id = s.next_id();
        s.users.insert(id, User {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_owner: new.is_owner,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_owners(&self) -> RepoResult<Vec<Owner>> {
        let s = self.state.read().await;
        let mut owners: Vec<_> = s.users.values()
            .filter(|u| u.is_owner)
            .map(|u| Owner { id: u.id, username: u.username.clone() })
            .collect();
        owners.sort_by_key(|o| o.id);
        Ok(owners)
    }
}

#[async_trait]
impl ApartmentRepo for InMemRepo {
    async fn get_apartment(&self, id: Id) -> RepoResult<Apartment> {
        let s = self.state.read().await;
        s.apartments.get(&id).map(StoredApartment::decode).ok_or(RepoError::NotFound)
    }

    async fn list_apartments_by_owner(&self, owner_id: Id) -> RepoResult<Vec<Apartment>> {
        let s = self.state.read().await;
        let mut v: Vec<_> = s.apartments.values()
            .filter(|a| a.owner_id == owner_id)
            .map(StoredApartment::decode)
            .collect();
        v.sort_by_key(|a| a.id);
        Ok(v)
    }

    async fn list_apartments_to_check(&self, tenant_id: Id) -> RepoResult<Vec<ApartmentToCheck>> {
        let s = self.state.read().await;
        let mut v: Vec<_> = s.apartments.values()
            .filter(|a| a.to_check.needs_check())
            .filter(|a| s.relations.contains(&(tenant_id, a.owner_id)))
            .filter_map(|a| {
                let owner = s.users.get(&a.owner_id)?;
                Some(ApartmentToCheck {
                    id: a.id,
                    address: a.address.clone(),
                    city: a.city.clone(),
                    to_check: a.to_check,
                    owner_username: owner.username.clone(),
                    owner_id: owner.id,
                })
            })
            .collect();
        v.sort_by_key(|a| a.id);
        Ok(v)
    }

    async fn create_apartment(&self, new: NewApartment) -> RepoResult<Id> {
        let mut s = self.state.write().await;
        if !s.users.contains_key(&new.owner_id) {
            return Err(RepoError::NotFound);
        }
        let id = s.next_id();
        s.apartments.insert(id, StoredApartment {
            id,
            address: new.address,
            city: new.city,
            inventory: serialize_inventory(new.inventory.as_ref()),
            to_check: new.to_check,
            owner_id: new.owner_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn set_check_status(&self, id: Id, flag: CheckFlag) -> RepoResult<()> {
        let mut s = self.state.write().await;
        let apt = s.apartments.get_mut(&id).ok_or(RepoError::NotFound)?;
        apt.to_check = flag;
        Ok(())
    }

    async fn append_history(&self, new: NewHistoryMessage) -> RepoResult<Id> {
        let mut s = self.state.write().await;
        if !s.apartments.contains_key(&new.apartment_id) {
            return Err(RepoError::NotFound);
        }
        if let Some(sender) = new.sender_id {
            if !s.users.contains_key(&sender) { return Err(RepoError::NotFound); }
        }
        let id = s.next_id();
        s.history.push(StoredHistory {
            id,
            apartment_id: new.apartment_id,
            sender_id: new.sender_id,
            message_content: new.message_content,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_history(&self, apartment_id: Id) -> RepoResult<Vec<HistoryEntry>> {
        let s = self.state.read().await;
        let mut v: Vec<_> = s.history.iter()
            .filter(|h| h.apartment_id == apartment_id)
            .map(|h| HistoryEntry {
                id: h.id,
                message_content: h.message_content.clone(),
                created_at: h.created_at,
                sender_username: h.sender_id
                    .and_then(|sid| s.users.get(&sid))
                    .map(|u| u.username.clone()),
            })
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))); // latest first
        Ok(v)
    }
}

#[async_trait]
impl RelationRepo for InMemRepo {
    async fn relation_exists(&self, user_id: Id, related_user_id: Id) -> RepoResult<bool> {
        let s = self.state.read().await;
        Ok(s.relations.contains(&(user_id, related_user_id)))
    }

    async fn link_users(&self, user_id: Id, related_user_id: Id) -> RepoResult<()> {
        let mut s = self.state.write().await;
        if user_id == related_user_id {
            return Err(RepoError::Invalid("a user cannot be linked to itself".into()));
        }
        if !s.users.contains_key(&user_id) || !s.users.contains_key(&related_user_id) {
            return Err(RepoError::NotFound);
        }
        if !s.relations.insert((user_id, related_user_id)) {
            return Err(RepoError::Conflict);
        }
        Ok(())
    }
}

#[async_trait]
impl PhotoRepo for InMemRepo {
    async fn insert_photos(&self, batch: Vec<NewPhoto>) -> RepoResult<Vec<Photo>> {
        let mut s = self.state.write().await;
        // validate the whole batch before touching state
        if batch.iter().any(|p| !s.apartments.contains_key(&p.apartment_id)) {
            return Err(RepoError::NotFound);
        }
        let now = Utc::now();
        let mut created = Vec::with_capacity(batch.len());
        for p in batch {
            let id = s.next_id();
            let photo = Photo {
                id,
                apartment_id: p.apartment_id,
                photo_url: p.photo_url,
                message: Some(p.message),
                status: PhotoStatus::Pending,
                uploaded_at: now,
                uploaded_by: Some(p.uploaded_by),
                reviewed_at: None,
                reviewed_by: None,
                feedback: None,
            };
            s.photos.insert(id, photo.clone());
            created.push(photo);
        }
        Ok(created)
    }

    async fn list_photos(&self, apartment_id: Id) -> RepoResult<Vec<Photo>> {
        let s = self.state.read().await;
        let mut v: Vec<_> = s.photos.values()
            .filter(|p| p.apartment_id == apartment_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        Ok(v)
    }

    async fn photo_stats(&self, apartment_id: Id) -> RepoResult<PhotoStats> {
        let s = self.state.read().await;
        let mut stats = PhotoStats::default();
        for p in s.photos.values().filter(|p| p.apartment_id == apartment_id) {
            match p.status {
                PhotoStatus::Pending => stats.pending += 1,
                PhotoStatus::Approved => stats.approved += 1,
                PhotoStatus::Rejected => stats.rejected += 1,
            }
        }
        Ok(stats)
    }

    async fn review_photo(&self, photo_id: Id, review: PhotoReview) -> RepoResult<u64> {
        let mut s = self.state.write().await;
        let Some(photo) = s.photos.get_mut(&photo_id) else { return Ok(0) };
        photo.status = review.status;
        photo.reviewed_at = Some(Utc::now());
        photo.reviewed_by = Some(review.reviewed_by);
        if let Some(feedback) = review.feedback {
            photo.feedback = Some(feedback);
        }
        Ok(1)
    }
}

#[async_trait]
impl HealthRepo for InMemRepo {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}
