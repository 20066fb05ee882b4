use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub city: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub auction_date: Option<OffsetDateTime>,
    pub reserve_price: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PropertyImage {
    pub id: i64,
    pub property_id: Uuid,
    pub image_url: String,
    pub image_order: i32,
}

/// All property ids in id order.
pub async fn list_ids(db: &PgPool) -> anyhow::Result<Vec<Uuid>> {
    let rows = sqlx::query_as::<_, (Uuid,)>(r#"SELECT id FROM properties ORDER BY id"#)
        .fetch_all(db)
        .await
        .context("list property ids")?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Property>> {
    let row = sqlx::query_as::<_, Property>(
        r#"
        SELECT id, title, city, status, auction_date, reserve_price, created_at
        FROM properties
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find property")?;
    Ok(row)
}

pub async fn insert_image(
    db: &PgPool,
    property_id: Uuid,
    image_url: &str,
    image_order: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO property_images (property_id, image_url, image_order)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(property_id)
    .bind(image_url)
    .bind(image_order)
    .execute(db)
    .await
    .context("insert property image")?;
    Ok(())
}

/// Images of one property in display order.
pub async fn images_for(db: &PgPool, property_id: Uuid) -> anyhow::Result<Vec<PropertyImage>> {
    let rows = sqlx::query_as::<_, PropertyImage>(
        r#"
        SELECT id, property_id, image_url, image_order
          FROM property_images
         WHERE property_id = $1
         ORDER BY image_order ASC, id ASC
        "#,
    )
    .bind(property_id)
    .fetch_all(db)
    .await
    .context("list property images")?;
    Ok(rows)
}

pub async fn count_images(db: &PgPool) -> anyhow::Result<i64> {
    let (count,) = sqlx::query_as::<_, (i64,)>(r#"SELECT COUNT(*) FROM property_images"#)
        .fetch_one(db)
        .await
        .context("count property images")?;
    Ok(count)
}
