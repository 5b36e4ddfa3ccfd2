use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::*;

#[derive(Clone)]
pub struct PgRepo { pool: Pool<Postgres> }

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }
}

/// Map driver errors onto repository errors by SQLSTATE.
fn db_err(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::RowNotFound = e {
        return RepoError::NotFound;
    }
    if let sqlx::Error::Database(ref db) = e {
        match db.code().as_deref() {
            Some("23505") => return RepoError::Conflict,
            Some("23503") => return RepoError::NotFound,
            Some("23514") => return RepoError::Invalid(db.message().to_string()),
            _ => {}
        }
    }
    tracing::error!(error = %e, "postgres query failed");
    RepoError::Internal(e.to_string())
}

#[derive(sqlx::FromRow)]
struct ApartmentRow {
    id: Id,
    address: String,
    city: String,
    inventory: Option<String>,
    to_check: bool,
    owner_id: Id,
    created_at: DateTime<Utc>,
}

impl From<ApartmentRow> for Apartment {
    fn from(r: ApartmentRow) -> Self {
        Apartment {
            id: r.id,
            address: r.address,
            city: r.city,
            inventory: parse_inventory(r.inventory.as_deref()),
            to_check: CheckFlag::new(r.to_check),
            owner_id: r.owner_id,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ApartmentToCheckRow {
    id: Id,
    address: String,
    city: String,
    to_check: bool,
    owner_username: String,
    owner_id: Id,
}

impl From<ApartmentToCheckRow> for ApartmentToCheck {
    fn from(r: ApartmentToCheckRow) -> Self {
        ApartmentToCheck {
            id: r.id,
            address: r.address,
            city: r.city,
            to_check: CheckFlag::new(r.to_check),
            owner_username: r.owner_username,
            owner_id: r.owner_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PhotoRow {
    id: Id,
    apartment_id: Id,
    photo_url: String,
    message: Option<String>,
    status: String,
    uploaded_at: DateTime<Utc>,
    uploaded_by: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    feedback: Option<String>,
}

impl TryFrom<PhotoRow> for Photo {
    type Error = RepoError;

    fn try_from(r: PhotoRow) -> Result<Self, Self::Error> {
        let status = r.status.parse::<PhotoStatus>().map_err(|e| RepoError::Internal(e.to_string()))?;
        Ok(Photo {
            id: r.id,
            apartment_id: r.apartment_id,
            photo_url: r.photo_url,
            message: r.message,
            status,
            uploaded_at: r.uploaded_at,
            uploaded_by: r.uploaded_by,
            reviewed_at: r.reviewed_at,
            reviewed_by: r.reviewed_by,
            feedback: r.feedback,
        })
    }
}

const APARTMENT_COLUMNS: &str = "id, address, city, inventory, to_check, owner_id, created_at";
const PHOTO_COLUMNS: &str = "id, apartment_id, photo_url, message, status, uploaded_at, uploaded_by, reviewed_at, reviewed_by, feedback";

#[async_trait]
impl UserRepo for PgRepo {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, is_owner, created_at FROM users WHERE lower(email) = lower($1)"
        )
            .bind(email)
            .fetch_optional(&self.pool).await.map_err(db_err)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, is_owner, created_at FROM users WHERE id = $1"
        )
            .bind(id)
            .fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn create_user(&self, new: NewUser) -> RepoResult<Id> {
        let (id,): (Id,) = sqlx::query_as(
            "INSERT INTO users (username, email, password_hash, is_owner) VALUES ($1,$2,$3,$4) RETURNING id"
        )
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.is_owner)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(id)
    }

    async fn list_owners(&self) -> RepoResult<Vec<Owner>> {
        sqlx::query_as::<_, Owner>("SELECT id, username FROM users WHERE is_owner = TRUE ORDER BY id")
            .fetch_all(&self.pool).await.map_err(db_err)
    }
}

#[async_trait]
impl ApartmentRepo for PgRepo {
    async fn get_apartment(&self, id: Id) -> RepoResult<Apartment> {
        let row = sqlx::query_as::<_, ApartmentRow>(&format!("SELECT {APARTMENT_COLUMNS} FROM apartments WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(row.into())
    }

    async fn list_apartments_by_owner(&self, owner_id: Id) -> RepoResult<Vec<Apartment>> {
        let rows = sqlx::query_as::<_, ApartmentRow>(&format!("SELECT {APARTMENT_COLUMNS} FROM apartments WHERE owner_id = $1 ORDER BY id"))
            .bind(owner_id)
            .fetch_all(&self.pool).await.map_err(db_err)?;
        Ok(rows.into_iter().map(Apartment::from).collect())
    }

    async fn list_apartments_to_check(&self, tenant_id: Id) -> RepoResult<Vec<ApartmentToCheck>> {
        let rows = sqlx::query_as::<_, ApartmentToCheckRow>(r#"
            SELECT a.id, a.address, a.city, a.to_check,
                   owner.username AS owner_username, owner.id AS owner_id
            FROM apartments a
            JOIN users owner ON a.owner_id = owner.id
            JOIN user_relations ur ON ur.related_user_id = owner.id
            WHERE ur.user_id = $1 AND a.to_check = TRUE
            ORDER BY a.id
        "#)
            .bind(tenant_id)
            .fetch_all(&self.pool).await.map_err(db_err)?;
        Ok(rows.into_iter().map(ApartmentToCheck::from).collect())
    }

    async fn create_apartment(&self, new: NewApartment) -> RepoResult<Id> {
        let (id,): (Id,) = sqlx::query_as(
            "INSERT INTO apartments (address, city, inventory, to_check, owner_id) VALUES ($1,$2,$3,$4,$5) RETURNING id"
        )
            .bind(&new.address)
            .bind(&new.city)
            .bind(serialize_inventory(new.inventory.as_ref()))
            .bind(new.to_check.needs_check())
            .bind(new.owner_id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(id)
    }

    async fn set_check_status(&self, id: Id, flag: CheckFlag) -> RepoResult<()> {
        let res = sqlx::query("UPDATE apartments SET to_check = $2 WHERE id = $1")
            .bind(id)
            .bind(flag.needs_check())
            .execute(&self.pool).await.map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn append_history(&self, new: NewHistoryMessage) -> RepoResult<Id> {
        let (id,): (Id,) = sqlx::query_as(
            "INSERT INTO history_messages (apartment_id, sender_id, message_content) VALUES ($1,$2,$3) RETURNING id"
        )
            .bind(new.apartment_id)
            .bind(new.sender_id)
            .bind(&new.message_content)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(id)
    }

    async fn list_history(&self, apartment_id: Id) -> RepoResult<Vec<HistoryEntry>> {
        sqlx::query_as::<_, HistoryEntry>(r#"
            SELECT hm.id, hm.message_content, hm.created_at, u.username AS sender_username
            FROM history_messages hm
            LEFT JOIN users u ON hm.sender_id = u.id
            WHERE hm.apartment_id = $1
            ORDER BY hm.created_at DESC, hm.id DESC
        "#)
            .bind(apartment_id)
            .fetch_all(&self.pool).await.map_err(db_err)
    }
}

#[async_trait]
impl RelationRepo for PgRepo {
    async fn relation_exists(&self, user_id: Id, related_user_id: Id) -> RepoResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM user_relations WHERE user_id = $1 AND related_user_id = $2)"
        )
            .bind(user_id)
            .bind(related_user_id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(exists)
    }

    async fn link_users(&self, user_id: Id, related_user_id: Id) -> RepoResult<()> {
        // primary key violation surfaces as Conflict, closing the check-then-insert race
        sqlx::query("INSERT INTO user_relations (user_id, related_user_id) VALUES ($1,$2)")
            .bind(user_id)
            .bind(related_user_id)
            .execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl PhotoRepo for PgRepo {
    async fn insert_photos(&self, batch: Vec<NewPhoto>) -> RepoResult<Vec<Photo>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut created = Vec::with_capacity(batch.len());
        for p in batch {
            let row = sqlx::query_as::<_, PhotoRow>(&format!(
                "INSERT INTO photos (apartment_id, photo_url, message, status, uploaded_by) \
                 VALUES ($1,$2,$3,'pending',$4) RETURNING {PHOTO_COLUMNS}"
            ))
                .bind(p.apartment_id)
                .bind(&p.photo_url)
                .bind(&p.message)
                .bind(&p.uploaded_by)
                .fetch_one(&mut *tx).await.map_err(db_err)?;
            created.push(Photo::try_from(row)?);
        }
        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn list_photos(&self, apartment_id: Id) -> RepoResult<Vec<Photo>> {
        let rows = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE apartment_id = $1 ORDER BY uploaded_at DESC, id DESC"
        ))
            .bind(apartment_id)
            .fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(Photo::try_from).collect()
    }

    async fn photo_stats(&self, apartment_id: Id) -> RepoResult<PhotoStats> {
        let (pending, approved, rejected): (i64, i64, i64) = sqlx::query_as(r#"
            SELECT COUNT(*) FILTER (WHERE status = 'pending'),
                   COUNT(*) FILTER (WHERE status = 'approved'),
                   COUNT(*) FILTER (WHERE status = 'rejected')
            FROM photos
            WHERE apartment_id = $1
        "#)
            .bind(apartment_id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(PhotoStats { pending, approved, rejected })
    }

    async fn review_photo(&self, photo_id: Id, review: PhotoReview) -> RepoResult<u64> {
        let res = sqlx::query(
            "UPDATE photos SET status = $2, reviewed_at = now(), reviewed_by = $3, feedback = COALESCE($4, feedback) WHERE id = $1"
        )
            .bind(photo_id)
            .bind(review.status.as_str())
            .bind(&review.reviewed_by)
            .bind(review.feedback.as_deref())
            .execute(&self.pool).await.map_err(db_err)?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl HealthRepo for PgRepo {
    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }
}
