use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use todo_portal::{
    AppConfig, AppState, create_router,
    repository::{PostgresRepository, RepositoryState},
};
use tokio::net::TcpListener;

/// A running application instance bound to an ephemeral port, plus direct
/// database access for seeding and verification.
pub struct TestApp {
    pub address: String,
    pub pool: sqlx::PgPool,
    pub client: reqwest::Client,
}

/// Spawns the application against the database named by `TEST_DATABASE_URL`.
///
/// Returns `None` (and prints a notice) when the variable is unset, so the
/// DB-backed suite degrades to a skip instead of failing on machines without
/// Postgres. The schema is applied idempotently and all tables are truncated,
/// so callers must run under `#[serial]`.
pub async fn spawn_app() -> Option<TestApp> {
    dotenv::dotenv().ok();

    let Ok(db_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping DB-backed test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");

    sqlx::raw_sql(include_str!("../../schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to apply schema");

    sqlx::query("TRUNCATE api_tokens, todos, users RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to truncate tables");

    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;
    let config = AppConfig {
        db_url,
        ..AppConfig::default()
    };

    let state = AppState { repo, config };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Some(TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    })
}

impl TestApp {
    /// Registers an account through the public endpoint and returns (id, token).
    pub async fn register(&self, name: &str, email: &str, password: &str) -> (i64, String) {
        let response = self
            .client
            .post(format!("{}/register", self.address))
            .json(&serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("register request failed");
        assert_eq!(response.status(), 201, "registration should succeed");

        let body: serde_json::Value = response.json().await.unwrap();
        let id = body["user"]["id"].as_i64().expect("user id in response");
        let token = body["token"].as_str().expect("token in response").to_string();
        (id, token)
    }

    /// Escalates an existing account to admin directly in the database
    /// (role assignment over HTTP needs an admin to already exist).
    pub async fn promote_to_admin(&self, user_id: i64) {
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .expect("failed to promote user");
    }

    /// Creates a todo for the given token and returns its id.
    pub async fn create_todo(&self, token: &str, title: &str) -> i64 {
        let response = self
            .client
            .post(format!("{}/todos", self.address))
            .bearer_auth(token)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await
            .expect("create todo request failed");
        assert_eq!(response.status(), 201, "todo creation should succeed");

        let body: serde_json::Value = response.json().await.unwrap();
        body["data"]["id"].as_i64().expect("todo id in response")
    }
}
