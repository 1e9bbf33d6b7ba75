use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::users::{self, Role};

pub const DEFAULT_PROFILE_IMAGE: &str = "/user.png";

const PROFILE_CONFLICT: &str = "User name or email already in use";

/// Failures of write paths that callers need to tell apart.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl WriteError {
    /// Unique-index violations that slipped past the pre-check become conflicts.
    pub fn from_write(err: DbErr, conflict: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(conflict.into()),
            _ => Self::Database(err),
        }
    }
}

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image_url: String,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            profile_image_url: model.profile_image_url,
            created_at: model.created_at,
        }
    }
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Self-service profile change. `password_hash` of `None` keeps the current one.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub profile_image_url: String,
}

pub struct UserRepository {
    conn: DatabaseConnection,
    create_lock: Arc<Mutex<()>>,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, create_lock: Arc<Mutex<()>>) -> Self {
        Self { conn, create_lock }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Get user by email together with the stored password hash (sign-in only)
    pub async fn get_credentials_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user credentials")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    /// Check-and-insert under the creation lock and inside one transaction:
    /// an empty table makes the new user an admin.
    pub async fn create_with_bootstrap_role(
        &self,
        new_user: NewUser<'_>,
        default_role: Role,
    ) -> Result<User, WriteError> {
        let _guard = self.create_lock.lock().await;
        let txn = self.conn.begin().await?;

        let taken = users::Entity::find()
            .filter(
                users::Column::Email
                    .eq(new_user.email)
                    .or(users::Column::Name.eq(new_user.name)),
            )
            .one(&txn)
            .await?;
        if let Some(existing) = taken {
            let field = if existing.email == new_user.email {
                "email"
            } else {
                "name"
            };
            return Err(WriteError::Conflict(format!("User {field} already exists")));
        }

        let role = if users::Entity::find().count(&txn).await? == 0 {
            Role::Admin
        } else {
            default_role
        };

        let model = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_user.name.to_string()),
            email: Set(new_user.email.to_string()),
            password_hash: Set(new_user.password_hash.to_string()),
            role: Set(role),
            profile_image_url: Set(DEFAULT_PROFILE_IMAGE.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        }
        .insert(&txn)
        .await
        .map_err(|e| WriteError::from_write(e, "User name or email already exists"))?;

        txn.commit().await?;

        Ok(User::from(model))
    }

    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for role update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        active.role = Set(role);
        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update user role")?;

        Ok(Some(User::from(updated)))
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, WriteError> {
        let Some(user) = users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let clash = users::Entity::find()
            .filter(users::Column::Id.ne(id))
            .filter(
                users::Column::Email
                    .eq(update.email.as_str())
                    .or(users::Column::Name.eq(update.name.as_str())),
            )
            .one(&self.conn)
            .await?;
        if clash.is_some() {
            return Err(WriteError::Conflict(PROFILE_CONFLICT.to_string()));
        }

        let mut active: users::ActiveModel = user.into();
        active.name = Set(update.name);
        active.email = Set(update.email);
        active.profile_image_url = Set(update.profile_image_url);
        if let Some(hash) = update.password_hash {
            active.password_hash = Set(hash);
        }
        let updated = active
            .update(&self.conn)
            .await
            .map_err(|e| WriteError::from_write(e, PROFILE_CONFLICT))?;

        Ok(Some(User::from(updated)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }
}
