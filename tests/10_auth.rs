mod common;

use anyhow::Result;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;

use common::TestServer;
use storefront_admin_api::auth::{generate_jwt, Claims};

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client().get(server.url("/health")).send().await?;
    let (status, body) = TestServer::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "ok");

    let res = server.client().get(server.url("/")).send().await?;
    let (status, body) = TestServer::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn missing_or_malformed_header_is_401() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client().get(server.url("/categories")).send().await?;
    let (status, body) = TestServer::read(res).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Authentication required");
    assert_eq!(body["data"], Value::Null);

    let res = server
        .client()
        .get(server.url("/products"))
        .header("Authorization", "Token abc")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client()
        .get(server.url("/posters"))
        .header("Authorization", "Bearer ")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unverifiable_token_is_403() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client()
        .get(server.url("/categories"))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;
    let (status, body) = TestServer::read(res).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized");

    let mut foreign = server.config.security.clone();
    foreign.jwt_secret = "someone-else".into();
    let token = generate_jwt(&Claims::new("x".into(), "x@y.z".into(), true, None), &foreign)?;
    let res = server
        .client()
        .get(server.url("/categories"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_403_and_valid_token_passes() -> Result<()> {
    let server = TestServer::spawn().await?;

    let mut claims = Claims::new("u".into(), "u@shop.test".into(), false, Some(1));
    claims.exp = Some(Utc::now().timestamp() - 60);
    let expired = generate_jwt(&claims, &server.config.security)?;
    let res = server
        .client()
        .get(server.url("/products"))
        .bearer_auth(expired)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (status, body) = server.get("/products").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn user_reads_do_not_need_a_token_but_writes_do() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client().get(server.url("/users")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client().delete(server.url("/users/some-id")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
