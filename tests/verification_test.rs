mod common;

use serde_json::Value;
use townhall::notifications::{Notification, NotificationLinks};
use townhall::services::user::UserService;

/// Path of a freshly signed verification link, relative to `/api/v1`.
fn signed_verify_path(app: &common::TestApp, user_id: i32, email: &str) -> String {
    let link = NotificationLinks::from_config(&app.config)
        .verification_url(user_id, email, chrono::Utc::now().timestamp())
        .unwrap();
    link.split_once("/api/v1").unwrap().1.to_string()
}

#[tokio::test]
async fn unverified_user_gets_exactly_one_notification() {
    let mut app = common::spawn_app().await;
    let address = format!("{}@townhall.test", common::unique("verify"));
    let user = common::create_user(&app.db, &address).await;

    let resp = app
        .client
        .post(app.url("/email/verification-notification"))
        .json(&serde_json::json!({ "email": address }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["success"].as_bool().unwrap());

    let queued = app.queue.try_recv().expect("notification queued");
    assert_eq!(queued.notification, Notification::VerifyEmail);
    assert_eq!(queued.user_id, user.id);
    assert_eq!(queued.email, address);
    assert!(app.queue.try_recv().is_err());
}

#[tokio::test]
async fn verified_and_unknown_addresses_get_same_answer_without_mail() {
    let mut app = common::spawn_app().await;
    let address = format!("{}@townhall.test", common::unique("verified"));
    let user = common::create_user(&app.db, &address).await;
    common::mark_verified(&app.db, user.id).await;

    let verified: Value = app
        .client
        .post(app.url("/email/verification-notification"))
        .json(&serde_json::json!({ "email": address }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let unknown: Value = app
        .client
        .post(app.url("/email/verification-notification"))
        .json(&serde_json::json!({ "email": "nobody@townhall.test" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(verified, unknown);
    assert!(app.queue.try_recv().is_err());
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/email/verification-notification"))
        .json(&serde_json::json!({ "email": "not an email" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn signed_link_verifies_email() {
    let app = common::spawn_app().await;
    let address = format!("{}@townhall.test", common::unique("verifylink"));
    let user = common::create_user(&app.db, &address).await;

    let resp = app
        .client
        .get(app.url(&signed_verify_path(&app, user.id, &address)))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let stored = UserService::new(app.db.clone()).get_by_id(user.id).await.unwrap();
    assert!(stored.has_verified_email());
}

#[tokio::test]
async fn tampered_link_is_rejected() {
    let app = common::spawn_app().await;
    let address = format!("{}@townhall.test", common::unique("tampered"));
    let user = common::create_user(&app.db, &address).await;
    let other = common::create_user(
        &app.db,
        &format!("{}@townhall.test", common::unique("other")),
    )
    .await;

    // Signed for `user`, replayed against `other`.
    let path = signed_verify_path(&app, user.id, &address).replacen(
        &format!("/verify/{}/", user.id),
        &format!("/verify/{}/", other.id),
        1,
    );
    let resp = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    // Signed for an address the account no longer has.
    let stale = signed_verify_path(&app, user.id, "previous@townhall.test");
    let resp = app.client.get(app.url(&stale)).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    let service = UserService::new(app.db.clone());
    assert!(!service.get_by_id(user.id).await.unwrap().has_verified_email());
    assert!(!service.get_by_id(other.id).await.unwrap().has_verified_email());
}
