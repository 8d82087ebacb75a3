//! Contact directory.
//!
//! Users are minted by the external authentication collaborator; this
//! service only mirrors them for the contact list and keeps the mirror in
//! sync when an authenticated identity updates its profile.

use shared::User;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    display_name: String,
    avatar_url: Option<String>,
    bio: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            bio: row.bio,
        }
    }
}

/// Service for listing and mirroring user profiles.
#[derive(Debug, Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    /// Creates a new user service with the given database pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every user except the viewer, for the contact sidebar.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    #[instrument(name = "users.list_contacts", skip(self), err)]
    pub async fn list_contacts(&self, viewer_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, display_name, avatar_url, bio \
             FROM users WHERE id <> $1 ORDER BY display_name ASC",
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Inserts or refreshes the directory row for an authenticated identity.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    #[instrument(name = "users.upsert", skip(self, user), err)]
    pub async fn upsert_user(&self, user: &User) -> Result<User, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, display_name, avatar_url, bio) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
               display_name = EXCLUDED.display_name, \
               avatar_url = EXCLUDED.avatar_url, \
               bio = EXCLUDED.bio \
             RETURNING id, display_name, avatar_url, bio",
        )
        .bind(user.id)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_row_maps_to_model() {
        let row = UserRow {
            id: Uuid::new_v4(),
            display_name: "Alice".into(),
            avatar_url: Some("https://cdn.example/a.png".into()),
            bio: None,
        };
        let id = row.id;

        let user = User::from(row);
        assert_eq!(user.id, id);
        assert_eq!(user.display_name, "Alice");
        assert!(user.bio.is_none());
    }
}
