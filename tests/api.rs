mod common;

use axum::http::{Method, StatusCode};
use common::{booking_body, user_id_of, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn banner_and_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("Cinema Booking"));

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn second_registration_with_same_email_conflicts() {
    let app = TestApp::new();
    app.register("Alice", "alice@example.com").await;

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({ "name": "Other", "email": "alice@example.com", "password": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn registration_requires_every_field() {
    let app = TestApp::new();
    for body in [
        json!({ "email": "a@example.com", "password": "x" }),
        json!({ "name": "A", "password": "x" }),
        json!({ "name": "A", "email": "a@example.com" }),
        json!({ "name": "", "email": "a@example.com", "password": "x" }),
        json!({ "name": "A", "email": "not-an-email", "password": "x" }),
    ] {
        let (status, resp) = app.post("/auth/register", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
        assert_eq!(resp["success"], false);
    }
    assert_eq!(app.state.store.stats().await.unwrap().users, 0);
}

#[tokio::test]
async fn password_longer_than_72_bytes_is_refused() {
    let app = TestApp::new();
    // 40 characters, 80 bytes
    let password = "é".repeat(40);
    let (status, resp) = app
        .post("/auth/register", None, json!({ "name": "A", "email": "a@example.com", "password": password }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
    assert_eq!(app.state.store.stats().await.unwrap().users, 0);

    let (status, _) = app
        .post("/auth/register", None, json!({ "name": "A", "email": "a@example.com", "password": "a".repeat(72) }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_token_carries_stored_role() {
    let app = TestApp::new();
    let (email, _) = app.register_random().await;

    let body = app.login(&email).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["role"], "user");

    let token = body["token"].as_str().unwrap();
    let claims = cinema_booking::client::token_identity(token).unwrap();
    let stored = app.state.store.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(claims.role, stored.role);
    assert_eq!(claims.id, stored.user_id);
    assert_eq!(body["user"]["id"], stored.user_id);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = TestApp::new();
    let (email, _) = app.register_random().await;

    let (status, body) = app
        .post("/auth/login", None, json!({ "email": email, "password": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = app
        .post("/auth/login", None, json!({ "email": "ghost@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/auth/login", None, json!({ "email": email })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_valid_bearer_token() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/bookings/1", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing authorization header");

    let (status, _) = app.get("/api/bookings/1", Some("garbage")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn alice_books_lists_and_cancels() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;

    app.register("Alice", "alice@example.com").await;
    let login = app.login("alice@example.com").await;
    assert_eq!(login["user"]["role"], "user");
    let token = login["token"].as_str().unwrap();
    let user_id = user_id_of(token);

    let (status, body) = app
        .post("/api/book", Some(token), booking_body(user_id, &catalog, &[3, 4]))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let booking_id = body["booking_id"].as_i64().unwrap();

    let (status, list) = app.get(&format!("/api/bookings/{user_id}"), Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    let entry = &list[0];
    assert_eq!(entry["booking_id"], booking_id);
    assert_eq!(entry["seats"], json!([3, 4]));
    assert_eq!(entry["show_id"], catalog.show_id);
    assert_eq!(entry["theatre_id"], catalog.theatre_id);
    assert_eq!(entry["tmdb_id"], catalog.tmdb_id);
    assert_eq!(entry["theatre_name"], "Lumiere");
    assert_eq!(entry["theatre_city"], "Almaty");
    assert_eq!(entry["movie_title"], "Fight Club");
    assert!(entry["show_time"].is_string());

    let (status, body) = app.delete(&format!("/api/book/{booking_id}"), Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, list) = app.get(&format!("/api/bookings/{user_id}"), Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn booking_with_a_missing_field_writes_nothing() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;
    let (_, token) = app.register_random().await;
    let user_id = user_id_of(&token);

    for field in ["user_id", "tmdb_id", "theatre_id", "show_id", "selected_seats"] {
        let mut body = booking_body(user_id, &catalog, &[1]);
        body.as_object_mut().unwrap().remove(field);
        let (status, resp) = app.post("/api/book", Some(&token), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "without {field}: {resp}");
    }

    let (status, _) = app
        .post("/api/book", Some(&token), booking_body(user_id, &catalog, &[]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut extra = booking_body(user_id, &catalog, &[1]);
    extra["price"] = json!(0);
    let (status, _) = app.post("/api/book", Some(&token), extra).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.state.store.list_bookings().await.unwrap().is_empty());
    assert!(app.state.store.claimed_seats(catalog.show_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn seats_must_exist_in_the_hall() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;
    let (_, token) = app.register_random().await;
    let user_id = user_id_of(&token);

    for seats in [vec![0], vec![26], vec![2, 2]] {
        let (status, _) = app
            .post("/api/book", Some(&token), booking_body(user_id, &catalog, &seats))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{seats:?}");
    }
}

#[tokio::test]
async fn booking_checks_show_and_theatre() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;
    let (_, token) = app.register_random().await;
    let user_id = user_id_of(&token);

    let mut body = booking_body(user_id, &catalog, &[1]);
    body["show_id"] = json!(9999);
    let (status, _) = app.post("/api/book", Some(&token), body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut body = booking_body(user_id, &catalog, &[1]);
    body["theatre_id"] = json!(9999);
    let (status, _) = app.post("/api/book", Some(&token), body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut body = booking_body(user_id, &catalog, &[1]);
    body["tmdb_id"] = json!(13);
    let (status, _) = app.post("/api/book", Some(&token), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn users_cannot_act_for_each_other() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;
    let (_, alice) = app.register_random().await;
    let (_, bob) = app.register_random().await;
    let alice_id = user_id_of(&alice);

    let (status, _) = app
        .post("/api/book", Some(&bob), booking_body(alice_id, &catalog, &[1]))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app
        .post("/api/book", Some(&alice), booking_body(alice_id, &catalog, &[1]))
        .await;
    let booking_id = body["booking_id"].as_i64().unwrap();

    let (status, _) = app.get(&format!("/api/bookings/{alice_id}"), Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/api/book/{booking_id}"), Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.state.store.find_booking(booking_id).await.unwrap().is_some());

    // admin may
    let admin = app.admin_token().await;
    let (status, list) = app.get(&format!("/api/bookings/{alice_id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (status, _) = app.delete(&format!("/api/book/{booking_id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_unknown_booking_is_not_found() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;
    let (_, token) = app.register_random().await;
    let user_id = user_id_of(&token);

    let (status, body) = app.delete("/api/book/424242", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let mut ids = Vec::new();
    for seats in [[1, 2], [3, 4]] {
        let (_, body) = app
            .post("/api/book", Some(&token), booking_body(user_id, &catalog, &seats))
            .await;
        ids.push(body["booking_id"].as_i64().unwrap());
    }

    let (status, _) = app.delete(&format!("/api/book/{}", ids[0]), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.get(&format!("/api/bookings/{user_id}"), Some(&token)).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["booking_id"], ids[1]);

    let (status, _) = app.delete(&format!("/api/book/{}", ids[0]), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn taken_seats_conflict_and_are_released_on_cancel() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;
    let (_, alice) = app.register_random().await;
    let (_, bob) = app.register_random().await;

    let (status, body) = app
        .post("/api/book", Some(&alice), booking_body(user_id_of(&alice), &catalog, &[5, 6]))
        .await;
    assert_eq!(status, StatusCode::OK);
    let booking_id = body["booking_id"].as_i64().unwrap();

    let (status, body) = app
        .post("/api/book", Some(&bob), booking_body(user_id_of(&bob), &catalog, &[6, 7]))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Seats already booked: 6");

    // seat 7 was not claimed by the failed request
    let (status, seats) = app.get(&format!("/api/shows/{}/seats", catalog.show_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seats["booked"], json!([5, 6]));
    assert_eq!(seats["capacity"], 25);

    app.delete(&format!("/api/book/{booking_id}"), Some(&alice)).await;
    let (status, _) = app
        .post("/api/book", Some(&bob), booking_body(user_id_of(&bob), &catalog, &[6, 7]))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn concurrent_bookings_of_one_seat_have_one_winner() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;
    let (_, alice) = app.register_random().await;
    let (_, bob) = app.register_random().await;

    let (a, b) = tokio::join!(
        app.post("/api/book", Some(&alice), booking_body(user_id_of(&alice), &catalog, &[10, 11])),
        app.post("/api/book", Some(&bob), booking_body(user_id_of(&bob), &catalog, &[11, 12])),
    );

    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(app.state.store.list_bookings().await.unwrap().len(), 1);
}

#[tokio::test]
async fn many_concurrent_bookings_never_double_claim() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;

    let mut tokens = Vec::new();
    for _ in 0..8 {
        tokens.push(app.register_random().await.1);
    }

    let attempts = tokens.iter().map(|token| {
        app.post("/api/book", Some(token), booking_body(user_id_of(token), &catalog, &[1]))
    });
    let results = futures::future::join_all(attempts).await;

    let winners = results.iter().filter(|(status, _)| *status == StatusCode::OK).count();
    let losers = results.iter().filter(|(status, _)| *status == StatusCode::CONFLICT).count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new();
    let (_, token) = app.register_random().await;
    let user_id = user_id_of(&token);

    let (status, _) = app.get(&format!("/api/bookings/{user_id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.request(Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.get(&format!("/api/bookings/{user_id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Token has been revoked");
}

#[tokio::test]
async fn catalog_lists_shows_per_theatre_and_movie() {
    let app = TestApp::new();
    let catalog = app.seed_catalog().await;

    let (status, theatres) = app.get("/api/theatres", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(theatres[0]["theatre_id"], catalog.theatre_id);

    let (status, shows) = app
        .get(&format!("/api/theatres/shows/{}?tmdb_id=550", catalog.theatre_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shows.as_array().unwrap().len(), 1);
    assert_eq!(shows[0]["show_id"], catalog.show_id);

    let (_, shows) = app
        .get(&format!("/api/theatres/shows/{}?tmdb_id=13", catalog.theatre_id), None)
        .await;
    assert_eq!(shows, json!([]));

    let (status, _) = app.get("/api/theatres/shows/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/shows/9999/seats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
