use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::entities::users::Role;

pub mod migrator;
pub mod repositories;

pub use crate::entities::settings::Model as SettingRow;
pub use repositories::chat::Chat;
pub use repositories::modelfile::Modelfile;
pub use repositories::user::{DEFAULT_PROFILE_IMAGE, NewUser, ProfileUpdate, User, WriteError};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,

    /// Serializes user creation so the first-user promotion sees a stable count.
    user_create_lock: Arc<Mutex<()>>,
}

fn is_memory_url(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

/// On-disk file behind a sqlite URL; `None` for in-memory databases.
#[must_use]
pub fn database_file(db_url: &str) -> Option<PathBuf> {
    if is_memory_url(db_url) {
        return None;
    }
    let path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty()).then(|| PathBuf::from(path))
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = is_memory_url(db_url);

        if let Some(path) = database_file(db_url) {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !path.exists() {
                std::fs::File::create(&path)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        if in_memory {
            // Every pooled connection to :memory: is a separate database.
            opt.max_connections(1).min_connections(1);
        } else {
            opt.max_connections(max_connections)
                .min_connections(min_connections)
                .idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }
        opt.connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            user_create_lock: Arc::new(Mutex::new(())),
        })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone(), self.user_create_lock.clone())
    }

    fn chat_repo(&self) -> repositories::chat::ChatRepository {
        repositories::chat::ChatRepository::new(self.conn.clone())
    }

    fn modelfile_repo(&self) -> repositories::modelfile::ModelfileRepository {
        repositories::modelfile::ModelfileRepository::new(self.conn.clone())
    }

    fn setting_repo(&self) -> repositories::setting::SettingRepository {
        repositories::setting::SettingRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
        self.user_repo().get_credentials_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    /// Inserts a user. The very first user is always created as admin;
    /// everyone after gets `default_role`.
    pub async fn create_user(
        &self,
        new_user: NewUser<'_>,
        default_role: Role,
    ) -> Result<User, WriteError> {
        self.user_repo()
            .create_with_bootstrap_role(new_user, default_role)
            .await
    }

    pub async fn update_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        self.user_repo().update_role(id, role).await
    }

    pub async fn update_user_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, WriteError> {
        self.user_repo().update_profile(id, update).await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // ========================================================================
    // Chats
    // ========================================================================

    pub async fn list_chats_for_user(&self, user_id: Uuid) -> Result<Vec<Chat>> {
        self.chat_repo().list_by_user(user_id).await
    }

    pub async fn get_chat(&self, id: Uuid) -> Result<Option<Chat>> {
        self.chat_repo().get(id).await
    }

    pub async fn create_chat(&self, user_id: Uuid, title: &str, chat: &str) -> Result<Chat> {
        self.chat_repo().create(user_id, title, chat).await
    }

    pub async fn update_chat(
        &self,
        id: Uuid,
        title: Option<&str>,
        chat: &str,
    ) -> Result<Option<Chat>> {
        self.chat_repo().update(id, title, chat).await
    }

    pub async fn delete_chat(&self, id: Uuid) -> Result<bool> {
        self.chat_repo().delete(id).await
    }

    // ========================================================================
    // Modelfiles
    // ========================================================================

    pub async fn list_modelfiles(&self) -> Result<Vec<Modelfile>> {
        self.modelfile_repo().list_all().await
    }

    pub async fn get_modelfile_by_tag(&self, tag_name: &str) -> Result<Option<Modelfile>> {
        self.modelfile_repo().get_by_tag(tag_name).await
    }

    pub async fn create_modelfile(
        &self,
        user_id: Uuid,
        tag_name: &str,
        modelfile: &str,
    ) -> Result<Modelfile, WriteError> {
        self.modelfile_repo()
            .create(user_id, tag_name, modelfile)
            .await
    }

    pub async fn update_modelfile(
        &self,
        id: Uuid,
        tag_name: &str,
        modelfile: &str,
    ) -> Result<Option<Modelfile>, WriteError> {
        self.modelfile_repo().update(id, tag_name, modelfile).await
    }

    pub async fn delete_modelfile(&self, id: Uuid) -> Result<bool> {
        self.modelfile_repo().delete(id).await
    }

    // ========================================================================
    // Settings rows
    // ========================================================================

    pub async fn get_setting(&self, name: &str) -> Result<Option<SettingRow>> {
        self.setting_repo().get_by_name(name).await
    }

    pub async fn list_settings(&self) -> Result<Vec<SettingRow>> {
        self.setting_repo().list_all().await
    }

    pub async fn insert_setting(
        &self,
        name: &str,
        default_value: &str,
        value: &str,
    ) -> Result<SettingRow> {
        self.setting_repo().insert(name, default_value, value).await
    }

    pub async fn save_setting(&self, row: SettingRow) -> Result<SettingRow> {
        self.setting_repo().save(row).await
    }

    pub async fn update_setting_value(&self, name: &str, value: &str) -> Result<bool> {
        self.setting_repo().update_value(name, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_memory_url() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite:file:test?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite:data/llmos-ui.db"));
    }

    #[test]
    fn test_database_file() {
        assert_eq!(
            database_file("sqlite:data/llmos-ui.db?mode=rwc"),
            Some(PathBuf::from("data/llmos-ui.db"))
        );
        assert_eq!(
            database_file("sqlite:///var/lib/llmos/ui.db"),
            Some(PathBuf::from("/var/lib/llmos/ui.db"))
        );
        assert_eq!(database_file("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn test_connect_in_memory_and_ping() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 0);
        assert!(store.list_settings().await.unwrap().is_empty());
    }
}
