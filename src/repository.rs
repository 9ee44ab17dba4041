use crate::models::{Todo, TodoWithOwner, UpdateTodoRequest, User, UserSummary, UserWithTodos};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;

/// Repository Trait
///
/// The abstract contract for all persistence operations, so handlers interact
/// with the data layer without knowing the concrete backing store.
///
/// Every method returns `Result<_, sqlx::Error>`: failures propagate to the
/// caller instead of being swallowed, and the error layer maps them onto the
/// HTTP taxonomy.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, sqlx::Error>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    // Uniqueness probe. `exclude` skips a row so a user may keep their own email on update.
    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> Result<bool, sqlx::Error>;
    // Partial update via COALESCE; only supplied columns change.
    async fn update_user(
        &self,
        id: i64,
        name: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;
    // Cascade delete: the user's tokens and todos go in the same transaction.
    async fn delete_user(&self, id: i64) -> Result<bool, sqlx::Error>;
    async fn set_user_role(&self, id: i64, role: &str) -> Result<Option<User>, sqlx::Error>;

    // --- Admin Views ---
    async fn list_users_with_todos(&self) -> Result<Vec<UserWithTodos>, sqlx::Error>;
    async fn get_user_with_todos(&self, id: i64) -> Result<Option<UserWithTodos>, sqlx::Error>;
    async fn list_todos_with_owner(&self) -> Result<Vec<TodoWithOwner>, sqlx::Error>;

    // --- Todos ---
    async fn list_todos_for_user(&self, user_id: i64) -> Result<Vec<Todo>, sqlx::Error>;
    async fn create_todo(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Todo, sqlx::Error>;
    async fn get_todo(&self, id: i64) -> Result<Option<Todo>, sqlx::Error>;
    async fn update_todo(
        &self,
        id: i64,
        req: &UpdateTodoRequest,
    ) -> Result<Option<Todo>, sqlx::Error>;
    async fn delete_todo(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Tokens ---
    async fn insert_token(&self, user_id: i64, token_hash: &str) -> Result<(), sqlx::Error>;
    async fn get_user_by_token(&self, token_hash: &str) -> Result<Option<User>, sqlx::Error>;
    // Idempotent: revoking an already-revoked token is a no-op success.
    async fn revoke_token(&self, token_hash: &str) -> Result<(), sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";
const TODO_COLUMNS: &str = "id, user_id, title, description, completed, created_at, updated_at";

/// Flat row shape for the todos-with-owner JOIN, mapped into the nested
/// `TodoWithOwner` view before it leaves the repository.
#[derive(FromRow)]
struct TodoOwnerRow {
    id: i64,
    user_id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_name: String,
    owner_email: String,
    owner_role: String,
}

impl From<TodoOwnerRow> for TodoWithOwner {
    fn from(row: TodoOwnerRow) -> Self {
        TodoWithOwner {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserSummary {
                id: row.user_id,
                name: row.owner_name,
                email: row.owner_email,
                role: row.owner_role,
            },
        }
    }
}

fn with_todos(user: User, todos: Vec<Todo>) -> UserWithTodos {
    UserWithTodos {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        created_at: user.created_at,
        updated_at: user.updated_at,
        todos,
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role) \
             VALUES ($1, $2, $3, 'user') RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
    }

    /// Partial update: COALESCE keeps any column whose parameter is NULL.
    async fn update_user(
        &self,
        id: i64,
        name: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await
    }

    /// Deletes an account and everything it owns in one transaction, so a
    /// half-deleted user can never be observed.
    async fn delete_user(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM api_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM todos WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_role(&self, id: i64, role: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await
    }

    /// Batched fetch instead of per-user queries: one pass over users, one over
    /// todos, grouped in memory.
    async fn list_users_with_todos(&self) -> Result<Vec<UserWithTodos>, sqlx::Error> {
        let users_sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let users = sqlx::query_as::<_, User>(&users_sql)
            .fetch_all(&self.pool)
            .await?;

        let todos_sql = format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY id");
        let todos = sqlx::query_as::<_, Todo>(&todos_sql)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<Todo>> = HashMap::new();
        for todo in todos {
            grouped.entry(todo.user_id).or_default().push(todo);
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let todos = grouped.remove(&user.id).unwrap_or_default();
                with_todos(user, todos)
            })
            .collect())
    }

    async fn get_user_with_todos(&self, id: i64) -> Result<Option<UserWithTodos>, sqlx::Error> {
        let Some(user) = self.get_user(id).await? else {
            return Ok(None);
        };
        let todos = self.list_todos_for_user(id).await?;
        Ok(Some(with_todos(user, todos)))
    }

    async fn list_todos_with_owner(&self) -> Result<Vec<TodoWithOwner>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TodoOwnerRow>(
            "SELECT t.id, t.user_id, t.title, t.description, t.completed, \
                    t.created_at, t.updated_at, \
                    u.name AS owner_name, u.email AS owner_email, u.role AS owner_role \
             FROM todos t \
             JOIN users u ON u.id = t.user_id \
             ORDER BY t.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TodoWithOwner::from).collect())
    }

    /// Creation order: id ascending.
    async fn list_todos_for_user(&self, user_id: i64) -> Result<Vec<Todo>, sqlx::Error> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE user_id = $1 ORDER BY id");
        sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn create_todo(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Todo, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todos (user_id, title, description) \
             VALUES ($1, $2, $3) RETURNING {TODO_COLUMNS}"
        );
        sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .bind(title)
            .bind(description)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_todo(&self, id: i64) -> Result<Option<Todo>, sqlx::Error> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1");
        sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Partial update; `user_id` is never touched, ownership is immutable.
    async fn update_todo(
        &self,
        id: i64,
        req: &UpdateTodoRequest,
    ) -> Result<Option<Todo>, sqlx::Error> {
        let sql = format!(
            "UPDATE todos \
             SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 completed = COALESCE($4, completed), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {TODO_COLUMNS}"
        );
        sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(req.title.as_deref())
            .bind(req.description.as_deref())
            .bind(req.completed)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_todo(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_token(&self, user_id: i64, token_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO api_tokens (user_id, token_hash) VALUES ($1, $2)")
            .bind(user_id)
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user_by_token(&self, token_hash: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.name, u.email, u.password_hash, u.role, u.created_at, u.updated_at \
             FROM api_tokens t \
             JOIN users u ON u.id = t.user_id \
             WHERE t.token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn revoke_token(&self, token_hash: &str) -> Result<(), sqlx::Error> {
        // rows_affected is intentionally ignored: revoking twice is a no-op.
        sqlx::query("DELETE FROM api_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
