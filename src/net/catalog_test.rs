use super::*;
use axum::Json;
use axum::Router;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::routing::{get, post, put};
use serde_json::{Value, json};
use std::collections::HashMap;

// =============================================================================
// Fake catalog service
// =============================================================================

fn movie_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "overview": "",
        "poster_path": "/p.jpg",
        "backdrop_path": "/b.jpg",
        "release_date": "2020-01-01",
        "vote_average": 7.5,
        "genre_ids": [28, 12]
    })
}

async fn popular(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let page: u64 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    Json(json!([movie_json(page * 100, "Popular")]))
}

async fn search(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let query = q.get("query").cloned().unwrap_or_default();
    Json(json!([movie_json(1, &query)]))
}

async fn details(Path(id): Path<u64>) -> (AxumStatus, Json<Value>) {
    if id == 550 {
        (AxumStatus::OK, Json(movie_json(550, "Fight Club")))
    } else {
        (AxumStatus::NOT_FOUND, Json(json!({})))
    }
}

async fn watchlist(Path(username): Path<String>, headers: HeaderMap) -> (AxumStatus, Json<Value>) {
    if headers.get("authorization").is_none() {
        return (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "missing token" })));
    }
    (
        AxumStatus::OK,
        Json(json!([{ "id": 1, "username": username, "movieId": "550", "status": "WATCHING" }])),
    )
}

async fn add(Json(mut body): Json<Value>) -> (AxumStatus, Json<Value>) {
    body["id"] = json!(9);
    (AxumStatus::CREATED, Json(body))
}

async fn set_status(
    Path((username, movie_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (AxumStatus, Json<Value>) {
    if movie_id == "missing" {
        return (AxumStatus::NOT_FOUND, Json(json!({})));
    }
    (AxumStatus::OK, Json(json!({ "id": 1, "username": username, "movieId": movie_id, "status": body["status"] })))
}

async fn remove(Path((_username, movie_id)): Path<(String, String)>) -> AxumStatus {
    if movie_id == "boom" { AxumStatus::INTERNAL_SERVER_ERROR } else { AxumStatus::NO_CONTENT }
}

async fn spawn_catalog_service() -> String {
    let app = Router::new()
        .route("/api/movie-catalog/movies/popular", get(popular))
        .route("/api/movie-catalog/movies/search", get(search))
        .route("/api/movie-catalog/movies/{id}", get(details))
        .route("/api/watchlist/movies", post(add))
        .route("/api/watchlist/movies/{username}", get(watchlist))
        .route("/api/watchlist/movies/{username}/{movie_id}", put(set_status).delete(remove))
        .route("/garbage/api/movie-catalog/movies/popular", get(|| async { "not json" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> CatalogClient {
    CatalogClient::new(base, HttpTimeouts::default()).unwrap()
}

// =============================================================================
// movies
// =============================================================================

#[tokio::test]
async fn popular_movies_passes_page() {
    let catalog = client(&spawn_catalog_service().await);
    let movies = catalog.popular_movies(3).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, 300);
    assert_eq!(movies[0].genre_ids, vec![28, 12]);
}

#[tokio::test]
async fn search_movies_encodes_query() {
    let catalog = client(&spawn_catalog_service().await);
    let movies = catalog.search_movies("the matrix & co", 1).await.unwrap();
    assert_eq!(movies[0].title, "the matrix & co");
}

#[tokio::test]
async fn movie_details_found_and_missing() {
    let catalog = client(&spawn_catalog_service().await);
    let found = catalog.movie_details(550).await.unwrap().unwrap();
    assert_eq!(found.movie.title, "Fight Club");
    assert!(found.credits.is_none());
    assert!(catalog.movie_details(1).await.unwrap().is_none());
}

#[tokio::test]
async fn non_json_body_is_parse_error() {
    let base = spawn_catalog_service().await;
    let catalog = client(&format!("{base}/garbage"));
    let err = catalog.popular_movies(1).await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse(_)), "got {err:?}");
}

// =============================================================================
// watchlist
// =============================================================================

#[tokio::test]
async fn watchlist_requires_token() {
    let base = spawn_catalog_service().await;
    let err = client(&base).movie_watchlist("alice").await.unwrap_err();
    assert!(matches!(err, CatalogError::Status { status: 401, .. }), "got {err:?}");

    let entries = client(&base)
        .with_token(Some("tok".into()))
        .movie_watchlist("alice")
        .await
        .unwrap();
    assert_eq!(entries[0].username, "alice");
    assert_eq!(entries[0].status, WatchStatus::Watching);
}

#[tokio::test]
async fn add_to_watchlist_round_trips_entry() {
    let catalog = client(&spawn_catalog_service().await);
    let entry = catalog
        .add_to_watchlist("alice", "603", WatchStatus::PlanToWatch)
        .await
        .unwrap();
    assert_eq!(entry.id, Some(9));
    assert_eq!(entry.movie_id, "603");
    assert_eq!(entry.status, WatchStatus::PlanToWatch);
}

#[tokio::test]
async fn update_watch_status_missing_entry_is_none() {
    let catalog = client(&spawn_catalog_service().await);
    let updated = catalog
        .update_watch_status("alice", "550", WatchStatus::Completed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, WatchStatus::Completed);
    let missing = catalog
        .update_watch_status("alice", "missing", WatchStatus::Dropped)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn remove_from_watchlist_status_handling() {
    let catalog = client(&spawn_catalog_service().await);
    catalog.remove_from_watchlist("alice", "550").await.unwrap();
    let err = catalog.remove_from_watchlist("alice", "boom").await.unwrap_err();
    assert!(matches!(err, CatalogError::Status { status: 500, .. }));
}

#[tokio::test]
async fn watchlist_username_stays_one_path_segment() {
    let catalog = client(&spawn_catalog_service().await).with_token(Some("tok".into()));
    for username in ["bob?x=1", "a/b", "eve#frag"] {
        let entries = catalog.movie_watchlist(username).await.unwrap();
        assert_eq!(entries[0].username, username);
    }
}

#[tokio::test]
async fn watch_status_movie_id_is_encoded() {
    let catalog = client(&spawn_catalog_service().await);
    let updated = catalog
        .update_watch_status("bob?x=1", "55/0", WatchStatus::Watching)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.username, "bob?x=1");
    assert_eq!(updated.movie_id, "55/0");
}

#[test]
fn base_url_with_path_prefix_is_kept() {
    let catalog = client("http://localhost:8082/gateway/");
    let url = catalog.endpoint(WATCHLIST_PATH, &["a b", "1"]);
    assert_eq!(url.as_str(), "http://localhost:8082/gateway/api/watchlist/movies/a%20b/1");
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = CatalogClient::new("not a url", HttpTimeouts::default()).err().unwrap();
    assert!(matches!(err, CatalogError::InvalidBaseUrl(_)), "got {err:?}");
    let err = CatalogClient::new("mailto:someone@example.com", HttpTimeouts::default()).err().unwrap();
    assert!(matches!(err, CatalogError::InvalidBaseUrl(_)), "got {err:?}");
}
