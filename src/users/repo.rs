use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Role, User};

impl User {
    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, phone, role, is_active,
                   profile_photo, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by (already normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, phone, role, is_active,
                   profile_photo, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
        phone: Option<&str>,
        role: Role,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, phone, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, full_name, phone, role, is_active,
                      profile_photo, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(phone)
        .bind(role.as_str())
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// `phone = None` keeps the stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        full_name: &str,
        phone: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET full_name = $2,
                   phone = COALESCE($3, phone),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, email, password_hash, full_name, phone, role, is_active,
                      profile_photo, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(phone)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_profile_photo(
        db: &PgPool,
        id: Uuid,
        photo_url: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET profile_photo = $2,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, email, password_hash, full_name, phone, role, is_active,
                      profile_photo, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(photo_url)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Returns `false` when no row matched.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns the email of the updated account, if any.
    pub async fn update_password_by_email(
        db: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            UPDATE users
               SET password_hash = $2,
                   updated_at = now()
             WHERE email = $1
            RETURNING email
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(email,)| email))
    }

    pub async fn set_active(db: &PgPool, id: Uuid, is_active: bool) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET is_active = $2,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, email, password_hash, full_name, phone, role, is_active,
                      profile_photo, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_role(db: &PgPool, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET role = $2,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, email, password_hash, full_name, phone, role, is_active,
                      profile_photo, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Newest first. `pattern` is an ILIKE pattern matched against email,
    /// full name and phone.
    pub async fn search(
        db: &PgPool,
        pattern: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, phone, role, is_active,
                   profile_photo, created_at, updated_at
            FROM users
            WHERE $1::text IS NULL
               OR email ILIKE $1
               OR full_name ILIKE $1
               OR phone ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_matching(db: &PgPool, pattern: Option<&str>) -> anyhow::Result<i64> {
        let (total,) = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE $1::text IS NULL
               OR email ILIKE $1
               OR full_name ILIKE $1
               OR phone ILIKE $1
            "#,
        )
        .bind(pattern)
        .fetch_one(db)
        .await?;
        Ok(total)
    }
}
