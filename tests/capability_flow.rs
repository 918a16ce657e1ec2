//! Integration tests for capability share links.
//!
//! Each scenario runs a real gate against stub provider and archive
//! servers on loopback ports and drives it over plain HTTP.

mod common;

use chrono::{Duration, Utc};
use common::gate::session_cookie;
use common::{TestGate, TestIdp, TestUpstream};

async fn spawn_stack() -> (TestIdp, TestUpstream, TestGate) {
    let idp = TestIdp::spawn().await;
    let upstream = TestUpstream::spawn().await;
    let gate = TestGate::spawn(&idp, &upstream).await;
    (idp, upstream, gate)
}

#[tokio::test]
async fn test_album_link_reaches_the_album() {
    let (_idp, upstream, gate) = spawn_stack().await;

    let url = gate.mint_link("nmasse", "2020-05");
    let response = gate.get_url(&url).await;

    assert_eq!(response.status().as_u16(), 200);
    // The capability flow never touches sessions.
    assert!(session_cookie(&response).is_none());
    assert_eq!(response.text().await.unwrap(), "archive /album/2020-05/");

    let seen = upstream.last_request();
    assert_eq!(seen.path_and_query, "/album/2020-05/");
    assert_eq!(seen.identity.as_deref(), Some("Capability:nmasse"));
}

#[tokio::test]
async fn test_link_opens_files_inside_the_album() {
    let (_idp, upstream, gate) = spawn_stack().await;

    let url = format!("{}photo.jpg?size=large", gate.mint_link("nmasse", "2020-05"));
    let response = gate.get_url(&url).await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        upstream.last_request().path_and_query,
        "/album/2020-05/photo.jpg?size=large"
    );
}

#[tokio::test]
async fn test_link_does_not_open_other_albums() {
    let (_idp, upstream, gate) = spawn_stack().await;

    let url = gate
        .mint_link("nmasse", "2020-05")
        .replace("/album/2020-05/", "/album/2020-06/");
    let response = gate.get_url(&url).await;

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid Token");
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_scoped_link_is_not_a_global_link() {
    let (_idp, upstream, gate) = spawn_stack().await;

    // Stripping the album segment must not widen a scoped token's reach.
    let url = gate
        .mint_link("nmasse", "2020-05")
        .replace("/album/2020-05/", "/album/");
    let response = gate.get_url(&url).await;

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid Token");
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_global_link_opens_any_album() {
    let (_idp, upstream, gate) = spawn_stack().await;

    let base = gate.mint_link("nmasse", "");
    assert!(base.ends_with("/album/"));

    let response = gate.get_url(&base).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(upstream.last_request().path_and_query, "/album/");

    let response = gate.get_url(&format!("{base}2021-07/")).await;
    assert_eq!(response.status().as_u16(), 200);
    let seen = upstream.last_request();
    assert_eq!(seen.path_and_query, "/album/2021-07/");
    assert_eq!(seen.identity.as_deref(), Some("Capability:nmasse"));
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let (_idp, upstream, gate) = spawn_stack().await;

    let response = gate.get("/s/nmasse/not!!base64/album/2020-05/").await;

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid Token");
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_link_expires_after_its_window() {
    let (_idp, upstream, gate) = spawn_stack().await;

    let url = gate.mint_link_at("nmasse", "2020-05", Utc::now() - Duration::days(20));
    let response = gate.get_url(&url).await;

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid Token");
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_link_holds_inside_its_window() {
    let (_idp, upstream, gate) = spawn_stack().await;

    let url = gate.mint_link_at("nmasse", "2020-05", Utc::now() - Duration::days(10));
    let response = gate.get_url(&url).await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(upstream.last_request().path_and_query, "/album/2020-05/");
}

#[tokio::test]
async fn test_global_window_is_shorter() {
    let (_idp, upstream, gate) = spawn_stack().await;

    // Ten days old: a scoped token of that age would still hold, but a
    // global token used on a scoped path is outside its seven day window.
    let url = gate.mint_link_at("nmasse", "", Utc::now() - Duration::days(10));
    let response = gate.get_url(&format!("{url}2021-07/")).await;

    assert_eq!(response.status().as_u16(), 400);
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_token_with_reserved_characters_survives_routing() {
    let (_idp, upstream, gate) = spawn_stack().await;

    // Standard base64 tokens can contain '/' and '+'. Mint until one
    // does; the link must keep it inside a single path segment.
    let minted = (0..128)
        .map(|i| {
            let subject = format!("user{i}");
            let url = gate.mint_link(&subject, "2020-05");
            (subject, url)
        })
        .find(|(_, url)| url.contains("%2F") || url.contains("%2B"));
    let (subject, url) = minted.expect("no minted token carried a reserved character");

    let response = gate.get_url(&url).await;
    assert_eq!(response.status().as_u16(), 200);

    let seen = upstream.last_request();
    assert_eq!(seen.path_and_query, "/album/2020-05/");
    assert_eq!(
        seen.identity.as_deref(),
        Some(format!("Capability:{subject}").as_str())
    );
}

#[tokio::test]
async fn test_truncated_link_is_rejected() {
    let (_idp, upstream, gate) = spawn_stack().await;

    // A link missing its token segment must not fall through to the
    // upstream.
    let response = gate.get("/s/nmasse/").await;

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid Token");
    assert!(upstream.requests().is_empty());
}
