#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = test_pool().await;
        let router = choix_resto::build_app(db.clone());
        Self { router, db }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a POST form request.
    pub async fn post_form(&self, uri: &str, body: &str) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.request(req).await
    }

    pub async fn post_empty(&self, uri: &str) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method("POST")
            .body(Body::empty())
            .unwrap();
        self.request(req).await
    }

    /// Insert a cafe directly and return its id.
    pub async fn insert_cafe(&self, name: &str, url: &str, last_visited: Option<&str>) -> i64 {
        insert_cafe(&self.db, name, url, last_visited).await
    }

    pub async fn last_visited(&self, id: i64) -> Option<String> {
        last_visited(&self.db, id).await
    }

    pub async fn cafe_count(&self) -> i64 {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cafes")
            .fetch_one(&self.db)
            .await
            .unwrap();
        count.0
    }
}

/// In-memory SQLite pool with migrations applied.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory SQLite pool");

    choix_resto::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn insert_cafe(db: &SqlitePool, name: &str, url: &str, last_visited: Option<&str>) -> i64 {
    let row: (i64,) =
        sqlx::query_as("INSERT INTO cafes (name, url, last_visited) VALUES (?, ?, ?) RETURNING id")
            .bind(name)
            .bind(url)
            .bind(last_visited)
            .fetch_one(db)
            .await
            .expect("Failed to insert test cafe");
    row.0
}

pub async fn last_visited(db: &SqlitePool, id: i64) -> Option<String> {
    let row: (Option<String>,) = sqlx::query_as("SELECT last_visited FROM cafes WHERE id = ?")
        .bind(id)
        .fetch_one(db)
        .await
        .unwrap();
    row.0
}

/// A `last_visited` value `days` days before now, in storage format.
pub fn days_ago(days: i64) -> String {
    let ts = chrono::Local::now().naive_local() - chrono::Duration::days(days);
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Assert that a response is a redirect to the given location.
pub fn assert_redirect(resp: &Response, expected_location: &str) {
    assert_eq!(
        resp.status(),
        StatusCode::SEE_OTHER,
        "Expected redirect, got {}",
        resp.status()
    );
    let location = resp
        .headers()
        .get("location")
        .expect("Redirect should have location header")
        .to_str()
        .unwrap();
    assert_eq!(location, expected_location);
}
