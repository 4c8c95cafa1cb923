//! Browse categories. One global row per remote id.

use super::{remote_id, Entity, Filter, FromWire};
use crate::error::Result;
use crate::models::{Category, CategoryScope};
use crate::wire::{primary_image, CategoryData};
use async_trait::async_trait;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

#[derive(FromRow)]
struct CategoryRow {
    key: i64,
    remote_id: String,
    name: String,
    icon_url: Option<String>,
    icon: Option<Vec<u8>>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            key: row.key,
            id: row.remote_id,
            name: row.name,
            icon_url: row.icon_url,
            icon: row.icon,
        }
    }
}

#[async_trait]
impl Entity for Category {
    type Scope = CategoryScope;
    type Relations = ();

    const NAME: &'static str = "category";
    const TABLE: &'static str = "categories";

    fn key(&self) -> i64 {
        self.key
    }

    fn filter(scope: &CategoryScope) -> Filter {
        match scope {
            CategoryScope::All => Filter::all(),
            CategoryScope::Id(id) => Filter::eq("remote_id", id),
        }
    }

    async fn fetch(pool: &SqlitePool, filter: &Filter) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT key, remote_id, name, icon_url, icon FROM categories \
             WHERE {} ORDER BY name ASC, key ASC",
            filter.clause()
        );
        let mut query = sqlx::query_as::<_, CategoryRow>(&sql);
        for value in filter.binds() {
            query = query.bind(value.as_str());
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn persist(pool: &SqlitePool, category: &Self) -> Result<u64> {
        let result = sqlx::query("UPDATE categories SET name = ?, icon_url = ?, icon = ? WHERE key = ?")
            .bind(&category.name)
            .bind(&category.icon_url)
            .bind(&category.icon)
            .bind(category.key)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Categories are global; the scope only affects what is listed.
#[async_trait]
impl FromWire for Category {
    type Data = CategoryData;

    async fn write(
        conn: &mut SqliteConnection,
        _scope: &CategoryScope,
        items: &[CategoryData],
    ) -> Result<Vec<i64>> {
        let mut keys = Vec::with_capacity(items.len());
        for data in items {
            let key = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO categories (remote_id, name, icon_url)
                VALUES (?, ?, ?)
                ON CONFLICT (remote_id) DO UPDATE SET
                    name = COALESCE(NULLIF(excluded.name, ''), categories.name),
                    icon_url = COALESCE(excluded.icon_url, categories.icon_url)
                RETURNING key
                "#,
            )
            .bind(remote_id(data.id.as_deref(), data.name.as_deref()))
            .bind(data.name.as_deref().unwrap_or_default())
            .bind(primary_image(&data.icons))
            .fetch_one(&mut *conn)
            .await?;
            keys.push(key);
        }
        Ok(keys)
    }
}
