use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, is_staff, is_superuser, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, is_staff, is_superuser, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn insert(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        name: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, name, is_staff, is_superuser, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(is_staff)
        .bind(is_superuser)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Update name and/or password hash; a `None` leaves the column as is.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1
            RETURNING id, email, password_hash, name, is_staff, is_superuser, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_user_never_contains_the_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "test@mkznd.com".into(),
            password_hash: "argon2-secret".into(),
            name: "Tester".into(),
            is_staff: false,
            is_superuser: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("argon2-secret"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains("test@mkznd.com"));
    }
}
