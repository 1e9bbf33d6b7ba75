use crate::db::repositories::user::WriteError;
use crate::entities::{modelfiles, prelude::*};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modelfile {
    pub id: Uuid,
    pub tag_name: String,
    pub modelfile: String,
    pub user_id: Uuid,
    pub created_at: String,
}

impl From<modelfiles::Model> for Modelfile {
    fn from(m: modelfiles::Model) -> Self {
        Self {
            id: m.id,
            tag_name: m.tag_name,
            modelfile: m.modelfile,
            user_id: m.user_id,
            created_at: m.created_at,
        }
    }
}

fn tag_conflict(tag_name: &str) -> String {
    format!("Modelfile '{tag_name}' already exists")
}

pub struct ModelfileRepository {
    conn: DatabaseConnection,
}

impl ModelfileRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn tag_taken(&self, tag_name: &str, except: Option<Uuid>) -> Result<bool, WriteError> {
        let mut query = Modelfiles::find().filter(modelfiles::Column::TagName.eq(tag_name));
        if let Some(id) = except {
            query = query.filter(modelfiles::Column::Id.ne(id));
        }
        Ok(query.one(&self.conn).await?.is_some())
    }

    pub async fn list_all(&self) -> Result<Vec<Modelfile>> {
        let rows = Modelfiles::find()
            .order_by_desc(modelfiles::Column::CreatedAt)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Modelfile::from).collect())
    }

    pub async fn get_by_tag(&self, tag_name: &str) -> Result<Option<Modelfile>> {
        let row = Modelfiles::find()
            .filter(modelfiles::Column::TagName.eq(tag_name))
            .one(&self.conn)
            .await?;

        Ok(row.map(Modelfile::from))
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        tag_name: &str,
        modelfile: &str,
    ) -> Result<Modelfile, WriteError> {
        if self.tag_taken(tag_name, None).await? {
            return Err(WriteError::Conflict(tag_conflict(tag_name)));
        }

        let model = modelfiles::ActiveModel {
            id: Set(Uuid::new_v4()),
            tag_name: Set(tag_name.to_string()),
            modelfile: Set(modelfile.to_string()),
            user_id: Set(user_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        }
        .insert(&self.conn)
        .await
        .map_err(|e| WriteError::from_write(e, tag_conflict(tag_name)))?;

        Ok(Modelfile::from(model))
    }

    pub async fn update(
        &self,
        id: Uuid,
        tag_name: &str,
        modelfile: &str,
    ) -> Result<Option<Modelfile>, WriteError> {
        let Some(existing) = Modelfiles::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        if self.tag_taken(tag_name, Some(id)).await? {
            return Err(WriteError::Conflict(tag_conflict(tag_name)));
        }

        let mut active: modelfiles::ActiveModel = existing.into();
        active.tag_name = Set(tag_name.to_string());
        active.modelfile = Set(modelfile.to_string());
        let updated = active
            .update(&self.conn)
            .await
            .map_err(|e| WriteError::from_write(e, tag_conflict(tag_name)))?;

        Ok(Some(Modelfile::from(updated)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = Modelfiles::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
