//! Submission Tests
//!
//! Content gate at the HTTP boundary, duplicate interpretations, replies,
//! owner deletion and listings.

mod common;

use axum::http::StatusCode;
use common::{interpretation_text, parse_id, TestApp};
use serde_json::json;

// ===========================================================================
// Interpretations
// ===========================================================================

#[tokio::test]
async fn too_short_interpretation_is_rejected() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let path = format!("/verses/{}/interpretations", app.genesis_1_1.id);

    let resp = app
        .post_json(&path, json!({ "text": "Too short" }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "text is too short");

    let eleven = "one two three four five six seven eight nine ten eleven";
    let resp = app
        .post_json(&path, json!({ "text": eleven }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let twelve = "one two three four five six seven eight nine ten eleven twelve";
    let resp = app
        .post_json(&path, json!({ "text": twelve }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["interpretation"]["body"], twelve);
    assert_eq!(body["interpretation"]["visibility"], "visible");
    assert_eq!(body["counts"]["upvote_count"], 0);
    assert_eq!(body["counts"]["reply_count"], 0);
}

#[tokio::test]
async fn script_is_rejected_regardless_of_content() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let path = format!("/verses/{}/interpretations", app.genesis_1_1.id);

    let text = format!("{} <script>alert(1)</script>", interpretation_text());
    let resp = app
        .post_json(&path, json!({ "text": text }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "text contains markup or forbidden content");

    let text = format!("{}; DROP TABLE verses", interpretation_text());
    let resp = app
        .post_json(&path, json!({ "text": text }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    assert!(app.interpretation_ids_for(app.genesis_1_1.id).await.is_empty());
}

#[tokio::test]
async fn markup_is_stripped_from_stored_body() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let text = format!("<p>{}</p>", interpretation_text());
    let resp = app
        .post_json(
            &format!("/verses/{}/interpretations", app.genesis_1_1.id),
            json!({ "text": text }),
            Some(&author.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["interpretation"]["body"], interpretation_text());
}

#[tokio::test]
async fn one_visible_interpretation_per_author_and_verse() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let verse_id = app.genesis_1_1.id;
    let path = format!("/verses/{}/interpretations", verse_id);

    let first = app
        .create_interpretation(&author, verse_id, &interpretation_text())
        .await;

    // Checked before the text is validated.
    let resp = app
        .post_json(&path, json!({ "text": "short" }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app
        .post_json(
            &path,
            json!({ "text": interpretation_text() }),
            Some(&author.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(
        resp.error_message(),
        "you already have an interpretation on this verse"
    );

    // Other verses and other authors are unaffected.
    app.create_interpretation(&author, app.john_3_16.id, &interpretation_text())
        .await;
    app.create_interpretation(&app.user(), verse_id, &interpretation_text())
        .await;

    let resp = app
        .delete(&format!("/interpretations/{}", first), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let second = app
        .create_interpretation(&author, verse_id, &interpretation_text())
        .await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn resubmission_allowed_after_moderation_hides_the_first() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let verse_id = app.genesis_1_1.id;

    let first = app
        .create_interpretation(&author, verse_id, &interpretation_text())
        .await;
    let resp = app
        .flag_times(&format!("/interpretations/{}/flag", first), 10)
        .await;
    assert_eq!(resp.json()["visibility"], "hidden");

    let resp = app
        .post_json(
            &format!("/verses/{}/interpretations", verse_id),
            json!({ "text": interpretation_text() }),
            Some(&author.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let second = parse_id(&resp.json()["interpretation"]["id"]);
    assert_ne!(first, second);
    assert_eq!(app.interpretation_ids_for(verse_id).await, vec![second]);
}

#[tokio::test]
async fn interpretation_on_unknown_verse_is_not_found() {
    let app = TestApp::spawn().await;
    let resp = app
        .post_json(
            &format!("/verses/{}/interpretations", uuid::Uuid::new_v4()),
            json!({ "text": interpretation_text() }),
            Some(&app.user().token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "verse not found");
}

#[tokio::test]
async fn anonymous_submission_is_rejected() {
    let app = TestApp::spawn().await;
    let resp = app
        .post_json(
            &format!("/verses/{}/interpretations", app.genesis_1_1.id),
            json!({ "text": interpretation_text() }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ===========================================================================
// Owner deletion
// ===========================================================================

#[tokio::test]
async fn only_the_author_can_delete() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let stranger = app.user();
    let verse_id = app.genesis_1_1.id;
    let id = app
        .create_interpretation(&author, verse_id, &interpretation_text())
        .await;

    let resp = app
        .delete(&format!("/interpretations/{}", id), Some(&stranger.token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(app.interpretation_ids_for(verse_id).await, vec![id]);

    let resp = app
        .delete(&format!("/interpretations/{}", id), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert!(app.interpretation_ids_for(verse_id).await.is_empty());

    let resp = app
        .delete(&format!("/interpretations/{}", id), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_reply_updates_parent_reply_count() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let replier = app.user();
    let interpretation_id = app
        .create_interpretation(&author, app.genesis_1_1.id, &interpretation_text())
        .await;
    let reply_id = app.create_reply(&replier, interpretation_id).await;
    let counts_path = format!("/interpretations/{}/counts", interpretation_id);

    assert_eq!(app.get(&counts_path, None).await.json()["reply_count"], 1);

    let resp = app
        .delete(&format!("/replies/{}", reply_id), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .delete(&format!("/replies/{}", reply_id), Some(&replier.token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&counts_path, None).await.json()["reply_count"], 0);
    assert!(app.reply_ids_for(interpretation_id).await.is_empty());
}

// ===========================================================================
// Replies
// ===========================================================================

#[tokio::test]
async fn reply_creation_bumps_parent_reply_count() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let interpretation_id = app
        .create_interpretation(&author, app.genesis_1_1.id, &interpretation_text())
        .await;

    let resp = app
        .post_json(
            &format!("/interpretations/{}/replies", interpretation_id),
            json!({ "text": "Beautifully put" }),
            Some(&app.user().token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["reply"]["verse_id"], app.genesis_1_1.id.to_string());
    assert_eq!(body["parent_counts"]["reply_count"], 1);
    assert!(body["counts"].get("reply_count").is_none());

    let second = app.create_reply(&author, interpretation_id).await;
    let ids = app.reply_ids_for(interpretation_id).await;
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&second));
}

#[tokio::test]
async fn reply_text_is_gated() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let interpretation_id = app
        .create_interpretation(&author, app.genesis_1_1.id, &interpretation_text())
        .await;
    let path = format!("/interpretations/{}/replies", interpretation_id);

    let resp = app
        .post_json(&path, json!({ "text": "   " }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(&path, json!({ "text": "it's \"quoted\"" }), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    assert!(app.reply_ids_for(interpretation_id).await.is_empty());
}

#[tokio::test]
async fn reply_to_hidden_interpretation_is_not_found() {
    let app = TestApp::spawn().await;
    let author = app.user();
    let interpretation_id = app
        .create_interpretation(&author, app.genesis_1_1.id, &interpretation_text())
        .await;
    app.delete(
        &format!("/interpretations/{}", interpretation_id),
        Some(&author.token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/interpretations/{}/replies", interpretation_id),
            json!({ "text": "Anyone here" }),
            Some(&app.user().token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Listings
// ===========================================================================

#[tokio::test]
async fn interpretations_paginate_newest_first() {
    let app = TestApp::spawn().await;
    let verse_id = app.genesis_1_1.id;
    let mut created = Vec::new();
    for _ in 0..5 {
        created.push(
            app.create_interpretation(&app.user(), verse_id, &interpretation_text())
                .await,
        );
    }

    let mut seen = Vec::new();
    let mut path = format!("/verses/{}/interpretations?limit=2", verse_id);
    loop {
        let resp = app.get(&path, None).await;
        assert_eq!(resp.status, StatusCode::OK);
        let body = resp.json();
        for item in body["items"].as_array().unwrap() {
            assert_eq!(item["counts"]["upvote_count"], 0);
            seen.push(parse_id(&item["id"]));
        }
        match body["next_cursor"].as_str() {
            Some(cursor) => {
                path = format!(
                    "/verses/{}/interpretations?limit=2&cursor={}",
                    verse_id, cursor
                );
            }
            None => break,
        }
    }
    assert_eq!(seen.len(), created.len());
    created.sort();
    seen.sort();
    assert_eq!(seen, created);
}

#[tokio::test]
async fn listing_rejects_bad_limits_and_cursors() {
    let app = TestApp::spawn().await;
    let verse_id = app.genesis_1_1.id;

    let resp = app
        .get(&format!("/verses/{}/interpretations?limit=0", verse_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .get(
            &format!("/verses/{}/interpretations?cursor=yesterday", verse_id),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid cursor");

    let resp = app
        .get(
            &format!("/verses/{}/interpretations", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verse_lookup_by_coordinate() {
    let app = TestApp::spawn().await;

    let resp = app
        .get("/verses/lookup?book=Song%20of%20Songs&chapter=1&verse=2", None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["id"], app.song_1[1].id.to_string());

    let resp = app
        .get("/verses/lookup?book=Exodus&chapter=1&verse=1", None)
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
}
