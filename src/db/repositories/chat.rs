use crate::entities::{chats, prelude::*};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: Uuid,
    pub title: String,
    pub user_id: Uuid,

    /// Raw JSON document
    pub chat: String,
    pub created_at: String,
}

impl From<chats::Model> for Chat {
    fn from(m: chats::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            user_id: m.user_id,
            chat: m.chat,
            created_at: m.created_at,
        }
    }
}

pub struct ChatRepository {
    conn: DatabaseConnection,
}

impl ChatRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Chat>> {
        let rows = Chats::find()
            .filter(chats::Column::UserId.eq(user_id))
            .order_by_desc(chats::Column::CreatedAt)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Chat::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Chat>> {
        let row = Chats::find_by_id(id).one(&self.conn).await?;
        Ok(row.map(Chat::from))
    }

    pub async fn create(&self, user_id: Uuid, title: &str, chat: &str) -> Result<Chat> {
        let model = chats::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            user_id: Set(user_id),
            chat: Set(chat.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        }
        .insert(&self.conn)
        .await?;

        Ok(Chat::from(model))
    }

    pub async fn update(&self, id: Uuid, title: Option<&str>, chat: &str) -> Result<Option<Chat>> {
        let Some(existing) = Chats::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: chats::ActiveModel = existing.into();
        if let Some(title) = title {
            active.title = Set(title.to_string());
        }
        active.chat = Set(chat.to_string());
        let updated = active.update(&self.conn).await?;

        Ok(Some(Chat::from(updated)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = Chats::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
