use super::*;

// =============================================================
// Auth payloads
// =============================================================

#[test]
fn token_grant_reads_expires_in_millis() {
    let grant: TokenGrant =
        serde_json::from_str(r#"{"message":"Login successful","token":"t-1","expiresIn":86400000}"#).unwrap();
    assert_eq!(grant.token, "t-1");
    assert_eq!(grant.expires_in_ms, 86_400_000);
    assert_eq!(grant.username, None);
}

#[test]
fn token_grant_without_token_is_rejected() {
    let result = serde_json::from_str::<TokenGrant>(r#"{"expiresIn":1000}"#);
    assert!(result.is_err());
}

#[test]
fn user_envelope_email_is_optional() {
    let env: UserEnvelope =
        serde_json::from_str(r#"{"message":"ok","user":{"username":"alice","role":"USER"}}"#).unwrap();
    assert_eq!(env.user, User { username: "alice".into(), email: None, role: "USER".into() });
}

#[test]
fn profile_update_omits_absent_fields() {
    let update = ProfileUpdate { username: "alice".into(), email: Some("a@x.com".into()), password: None };
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json, serde_json::json!({ "username": "alice", "email": "a@x.com" }));
}

#[test]
fn password_change_body_carries_username_and_password_only() {
    let update = ProfileUpdate { username: "alice".into(), email: None, password: Some("n3w".into()) };
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json, serde_json::json!({ "username": "alice", "password": "n3w" }));
}

#[test]
fn error_body_tolerates_empty_object() {
    let body: ErrorBody = serde_json::from_str("{}").unwrap();
    assert!(body.message.is_none());
}

// =============================================================
// Catalog payloads
// =============================================================

#[test]
fn movie_details_flattens_movie_and_enrichments() {
    let raw = r#"{
        "id": 550,
        "title": "Fight Club",
        "overview": "An insomniac office worker...",
        "poster_path": "/p.jpg",
        "backdrop_path": null,
        "release_date": "1999-10-15",
        "vote_average": 8.4,
        "genre_ids": [18],
        "runtime": 139,
        "trailerUrl": "https://www.youtube.com/watch?v=x",
        "credits": { "cast": [{ "id": 1, "name": "Edward Norton", "character": "Narrator", "profile_path": null }], "crew": [] },
        "similar": { "results": [{ "id": 807, "title": "Se7en", "poster_path": null, "vote_average": 8.3 }] }
    }"#;
    let details: MovieDetails = serde_json::from_str(raw).unwrap();
    assert_eq!(details.movie.id, 550);
    assert_eq!(details.movie.backdrop_path, None);
    assert_eq!(details.runtime, Some(139));
    assert_eq!(details.trailer_url.as_deref(), Some("https://www.youtube.com/watch?v=x"));
    assert_eq!(details.credits.unwrap().cast[0].character, "Narrator");
    assert_eq!(details.similar.unwrap().results[0].title, "Se7en");
}

#[test]
fn watch_status_wire_names() {
    assert_eq!(serde_json::to_string(&WatchStatus::PlanToWatch).unwrap(), "\"PLAN_TO_WATCH\"");
    assert_eq!(WatchStatus::parse("plan-to-watch"), Some(WatchStatus::PlanToWatch));
    assert_eq!(WatchStatus::parse(" completed "), Some(WatchStatus::Completed));
    assert_eq!(WatchStatus::parse("paused"), None);
    assert_eq!(WatchStatus::Dropped.as_str(), "DROPPED");
}

#[test]
fn watchlist_entry_uses_camel_case() {
    let entry: WatchlistEntry = serde_json::from_str(
        r#"{"id":3,"username":"alice","movieId":"550","status":"WATCHING","createdAt":1,"updatedAt":2}"#,
    )
    .unwrap();
    assert_eq!(entry.movie_id, "550");
    assert_eq!(entry.status, WatchStatus::Watching);

    let outgoing = WatchlistEntry {
        id: None,
        username: "alice".into(),
        movie_id: "13".into(),
        status: WatchStatus::PlanToWatch,
        created_at: None,
        updated_at: None,
    };
    let json = serde_json::to_value(&outgoing).unwrap();
    assert_eq!(json, serde_json::json!({ "username": "alice", "movieId": "13", "status": "PLAN_TO_WATCH" }));
}
