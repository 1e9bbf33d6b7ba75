use crate::entities::{prelude::*, settings};
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

pub struct SettingRepository {
    conn: DatabaseConnection,
}

impl SettingRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<settings::Model>> {
        Settings::find()
            .filter(settings::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .with_context(|| format!("Failed to load setting {name}"))
    }

    pub async fn list_all(&self) -> Result<Vec<settings::Model>> {
        Ok(Settings::find()
            .order_by_asc(settings::Column::Name)
            .all(&self.conn)
            .await?)
    }

    pub async fn insert(&self, name: &str, default_value: &str, value: &str) -> Result<settings::Model> {
        let model = settings::ActiveModel {
            name: Set(name.to_string()),
            default_value: Set(default_value.to_string()),
            value: Set(value.to_string()),
            is_active: Set(true),
            read_only: Set(false),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .with_context(|| format!("Failed to insert setting {name}"))?;

        Ok(model)
    }

    /// Writes every mutable column of `row` back, keyed by its id.
    pub async fn save(&self, row: settings::Model) -> Result<settings::Model> {
        let active = settings::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            default_value: Set(row.default_value),
            value: Set(row.value),
            is_active: Set(row.is_active),
            read_only: Set(row.read_only),
            created_at: Set(row.created_at),
        };

        Ok(active.update(&self.conn).await?)
    }

    /// Returns `false` when no row with that name exists.
    pub async fn update_value(&self, name: &str, value: &str) -> Result<bool> {
        let result = Settings::update_many()
            .col_expr(settings::Column::Value, sea_orm::sea_query::Expr::value(value))
            .filter(settings::Column::Name.eq(name))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Store;

    #[tokio::test]
    async fn insert_save_and_update_value() {
        let store = Store::new("sqlite::memory:").await.unwrap();

        let row = store
            .insert_setting("signup-enabled", "true", "")
            .await
            .unwrap();
        assert!(row.is_active);
        assert!(!row.read_only);

        let mut changed = row.clone();
        changed.default_value = "false".to_string();
        changed.read_only = true;
        let saved = store.save_setting(changed).await.unwrap();
        assert_eq!(saved.default_value, "false");
        assert!(saved.read_only);

        assert!(store.update_setting_value("signup-enabled", "true").await.unwrap());
        assert!(!store.update_setting_value("missing", "x").await.unwrap());

        let reloaded = store.get_setting("signup-enabled").await.unwrap().unwrap();
        assert_eq!(reloaded.value, "true");
        assert_eq!(reloaded.created_at, row.created_at);
    }
}
