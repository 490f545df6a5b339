use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::post,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceExt;

use rsvp_api::mailer::{Email, Mailer};
use rsvp_api::{AppState, AppStateInner, router};
use rsvp_db::Database;

/// What the relay saw: the `Authorization` header and the JSON body.
type Delivery = (Option<String>, Value);

/// Local stand-in for the mail relay, answering every `POST /send` with `status`.
async fn spawn_relay(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Delivery>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/send",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let _ = tx.send((auth, body));
                status
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/send"), rx)
}

/// An endpoint nothing listens on.
async fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/send")
}

fn relay(endpoint: String) -> Mailer {
    Mailer::relay(endpoint, "relay-key".into(), "RSVP <noreply@example.com>".into()).unwrap()
}

fn email() -> Email {
    Email {
        to: "ada@example.com".into(),
        subject: "Your RSVP for our wedding".into(),
        body_html: "<p>Hi Ada,</p>".into(),
    }
}

async fn next_delivery(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Delivery {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("relay received nothing")
        .unwrap()
}

#[tokio::test]
async fn relay_posts_message_with_bearer_key() {
    let (endpoint, mut rx) = spawn_relay(StatusCode::ACCEPTED).await;

    relay(endpoint).send(&email()).await.unwrap();

    let (auth, body) = next_delivery(&mut rx).await;
    assert_eq!(auth.as_deref(), Some("Bearer relay-key"));
    assert_eq!(
        body,
        json!({
            "from": "RSVP <noreply@example.com>",
            "to": "ada@example.com",
            "subject": "Your RSVP for our wedding",
            "html": "<p>Hi Ada,</p>"
        })
    );
}

#[tokio::test]
async fn relay_error_status_is_an_error() {
    let (endpoint, mut rx) = spawn_relay(StatusCode::INTERNAL_SERVER_ERROR).await;

    assert!(relay(endpoint).send(&email()).await.is_err());
    next_delivery(&mut rx).await;
}

#[tokio::test]
async fn unreachable_relay_is_an_error() {
    assert!(relay(closed_endpoint().await).send(&email()).await.is_err());
}

// -- Through the API --

fn app_with(mailer: Mailer) -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
        token_ttl_days: 1,
        admin_emails: vec![],
        editor_emails: vec![],
        mailer,
    });
    (router(state.clone()), state)
}

async fn post_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Registers Ada and submits her RSVP, returning the RSVP response.
async fn submit_rsvp(app: &Router) -> (StatusCode, Value) {
    let (status, body) = post_json(
        app,
        "/auth/register",
        None,
        json!({"name": "Ada", "email": "ada@example.com", "password": "correct horse"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();
    let token = body["data"]["token"].as_str().unwrap().to_string();

    post_json(
        app,
        "/rsvp",
        Some(&token),
        json!({"userId": user_id, "attending": true, "allergies": "nuts"}),
    )
    .await
}

#[tokio::test]
async fn rsvp_sends_confirmation_to_the_guest() {
    let (endpoint, mut rx) = spawn_relay(StatusCode::OK).await;
    let (app, _state) = app_with(relay(endpoint));

    let (status, _) = submit_rsvp(&app).await;
    assert_eq!(status, StatusCode::OK);

    let (auth, body) = next_delivery(&mut rx).await;
    assert_eq!(auth.as_deref(), Some("Bearer relay-key"));
    assert_eq!(body["to"], "ada@example.com");
    assert_eq!(body["subject"], "Your RSVP for our wedding");
    assert!(body["html"].as_str().unwrap().contains("nuts"));
}

#[tokio::test]
async fn rsvp_succeeds_when_relay_is_down() {
    let (app, state) = app_with(relay(closed_endpoint().await));

    let (status, body) = submit_rsvp(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["attending"], true);

    let user_id = body["data"]["userId"].as_str().unwrap().to_string();
    assert!(state.db.get_rsvp_by_user(&user_id).unwrap().is_some());
}
