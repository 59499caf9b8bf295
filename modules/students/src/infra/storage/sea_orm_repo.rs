//! SeaORM-backed repository implementation for the domain port.
//!
//! Generic over `C: ConnectionTrait`, so it runs on a pooled
//! `DatabaseConnection` or inside a transaction alike. Every query filters on
//! `deleted_at IS NULL`; soft-deleted rows are never read or written again.

use anyhow::Context;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};

use crate::contract::model::{NewStudent, Student};
use crate::domain::repo::StudentsRepository;
use crate::infra::storage::entity::{ActiveModel as StudentAM, Column, Entity as StudentEntity};

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmStudentsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmStudentsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> StudentsRepository for SeaOrmStudentsRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_first_by_name(&self, name: &str) -> anyhow::Result<Option<Student>> {
        let found = StudentEntity::find()
            .filter(Column::Name.eq(name))
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::Id)
            .one(&self.conn)
            .await
            .context("find_first_by_name failed")?;
        Ok(found.map(Into::into))
    }

    async fn insert(&self, new_student: NewStudent) -> anyhow::Result<Student> {
        let now = Utc::now();
        let m = StudentAM {
            id: NotSet,
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            name: Set(new_student.name),
        };
        let saved = m.insert(&self.conn).await.context("insert failed")?;
        Ok(saved.into())
    }

    async fn update_name(&self, id: i64, name: &str) -> anyhow::Result<Option<Student>> {
        let res = StudentEntity::update_many()
            .col_expr(Column::Name, Expr::value(name.to_owned()))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await
            .context("update failed")?;
        if res.rows_affected == 0 {
            return Ok(None);
        }

        let updated = StudentEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("reload after update failed")?;
        Ok(updated.map(Into::into))
    }

    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool> {
        let res = StudentEntity::update_many()
            .col_expr(Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await
            .context("soft delete failed")?;
        Ok(res.rows_affected > 0)
    }
}
