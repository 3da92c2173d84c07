mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create(server: &common::TestServer, auth: &str, body: Value) -> Result<Value> {
    let res = server
        .client
        .post(server.url("/"))
        .header("Authorization", auth)
        .json(&body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(res.json::<Value>().await?)
}

#[tokio::test]
async fn create_forces_owner_to_caller() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (owner, auth) = server.user("owner").await?;
    let (victim, _) = server.user("victim").await?;

    let created = create(
        &server,
        &auth,
        json!({ "type": "beach", "title": "Sea view", "currentOwner": victim.to_string() }),
    )
    .await?;

    assert_eq!(created["currentOwner"], json!(owner.to_string()));
    assert_eq!(created["title"], "Sea view");
    assert_eq!(created["featured"], false);
    assert_eq!(created["bookmarkedUsers"], json!([]));

    let id = created["_id"].as_str().unwrap().to_string();
    let stored = server.client.get(server.url(&format!("/find/{}", id))).send().await?.json::<Value>().await?;
    assert_eq!(stored["currentOwner"]["_id"], json!(owner.to_string()));
    Ok(())
}

#[tokio::test]
async fn create_validates_payload() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (_, auth) = server.user("owner").await?;

    let res = server
        .client
        .post(server.url("/"))
        .header("Authorization", &auth)
        .json(&json!({ "type": "desert" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.json::<Value>().await?["error"].is_string());

    let res = server
        .client
        .post(server.url("/"))
        .header("Authorization", &auth)
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn get_by_id_embeds_owner_without_password() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (_, auth) = server.user("carol").await?;
    let created = create(&server, &auth, json!({ "type": "village", "price": 1200 })).await?;
    let id = created["_id"].as_str().unwrap();

    let res = server.client.get(server.url(&format!("/find/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["currentOwner"]["username"], "carol");
    assert!(body["currentOwner"].get("password").is_none());
    assert!(!body.to_string().contains("s3cret-password"));
    Ok(())
}

#[tokio::test]
async fn get_by_unknown_id_is_not_found() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    for id in [uuid::Uuid::new_v4().to_string(), "not-an-id".to_string()] {
        let res = server.client.get(server.url(&format!("/find/{}", id))).send().await?;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.json::<Value>().await?, json!({ "error": "Property not found" }));
    }
    Ok(())
}

#[tokio::test]
async fn non_owner_cannot_update_or_delete() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (_, owner_auth) = server.user("owner").await?;
    let (_, other_auth) = server.user("other").await?;
    let created = create(&server, &owner_auth, json!({ "type": "mountain", "price": 100 })).await?;
    let path = format!("/{}", created["_id"].as_str().unwrap());

    let res = server
        .client
        .put(server.url(&path))
        .header("Authorization", &other_auth)
        .json(&json!({ "price": 1 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "error": "You are not allowed to update other people's properties" })
    );

    let res = server.client.delete(server.url(&path)).header("Authorization", &other_auth).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "error": "You are not allowed to delete other people's properties" })
    );

    let stored = server
        .client
        .get(server.url(&format!("/find{}", path)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(stored["price"], 100);
    Ok(())
}

#[tokio::test]
async fn owner_updates_partially_then_deletes() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (_, auth) = server.user("owner").await?;
    let created = create(&server, &auth, json!({ "type": "beach", "title": "Hut", "price": 100 })).await?;
    let id = created["_id"].as_str().unwrap().to_string();

    let res = server
        .client
        .put(server.url(&format!("/{}", id)))
        .header("Authorization", &auth)
        .json(&json!({ "price": 150, "featured": true }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = res.json::<Value>().await?;
    assert_eq!(updated["price"], 150);
    assert_eq!(updated["featured"], true);
    assert_eq!(updated["title"], "Hut");
    assert_eq!(updated["_id"], json!(id));

    let res = server
        .client
        .delete(server.url(&format!("/{}", id)))
        .header("Authorization", &auth)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({ "msg": "Successfully deleted property" }));

    let res = server.client.get(server.url(&format!("/find/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn update_of_missing_property_is_not_found() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (_, auth) = server.user("owner").await?;

    let res = server
        .client
        .put(server.url(&format!("/{}", uuid::Uuid::new_v4())))
        .header("Authorization", &auth)
        .json(&json!({ "price": 1 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
