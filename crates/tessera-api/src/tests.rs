use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tessera_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use super::api_router;

async fn make_app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn call(
  app: &Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn id_of(v: &Value) -> i64 { v["id"].as_i64().unwrap() }

// ── Pieces and composition ──────────────────────────────────────────────────

#[tokio::test]
async fn about_this_system_over_http() {
  let app = make_app().await;

  let (s, tax) = call(&app, "POST", "/taxonomies", Some(json!({"name": "Technology"}))).await;
  assert_eq!(s, StatusCode::CREATED);
  let (_, go) = call(
    &app,
    "POST",
    "/tags",
    Some(json!({"taxonomy_id": id_of(&tax), "value": "Go"})),
  )
  .await;

  let (s, piece) = call(
    &app,
    "POST",
    "/pieces",
    Some(json!({"class": "page", "title": "About This System"})),
  )
  .await;
  assert_eq!(s, StatusCode::CREATED);
  assert_eq!(piece["status"], "draft");
  let piece_id = id_of(&piece);

  let (_, heading) = call(
    &app,
    "POST",
    "/contlets",
    Some(json!({"variant": "heading", "text": "Core Philosophy", "level": 1})),
  )
  .await;
  let (_, para) = call(
    &app,
    "POST",
    "/contlets",
    Some(json!({"variant": "paragraph", "text": "Everything is an entity."})),
  )
  .await;

  let uri = format!("/pieces/{piece_id}/contlets");
  let (s, placed) = call(
    &app,
    "POST",
    &uri,
    Some(json!({"contlet_id": id_of(&heading), "placement": {"mode": "at", "sort_key": 100}})),
  )
  .await;
  assert_eq!(s, StatusCode::CREATED);
  assert_eq!(placed["sort_key"], 100);
  let (_, placed) = call(&app, "POST", &uri, Some(json!({"contlet_id": id_of(&para)}))).await;
  assert_eq!(placed["sort_key"], 200);

  let (s, _) = call(
    &app,
    "POST",
    &format!("/entities/{piece_id}/tags"),
    Some(json!({"tag_id": id_of(&go)})),
  )
  .await;
  assert_eq!(s, StatusCode::NO_CONTENT);

  let (s, full) = call(&app, "GET", &format!("/pieces/{piece_id}"), None).await;
  assert_eq!(s, StatusCode::OK);
  assert_eq!(full["piece"]["title"], "About This System");
  assert_eq!(full["contlets"][0]["variant"], "heading");
  assert_eq!(full["contlets"][0]["level"], 1);
  assert_eq!(full["contlets"][1]["variant"], "paragraph");
  assert_eq!(full["tags"][0]["value"], "Go");

  let (_, records) = call(&app, "GET", &uri, None).await;
  assert_eq!(records[0]["sort_key"], 100);
  assert_eq!(records[0]["text_content"], "Core Philosophy");
  assert_eq!(records[1]["level"], Value::Null);

  let (_, listing) = call(&app, "GET", "/tags", None).await;
  assert_eq!(listing[0]["taxonomy_name"], "Technology");
}

#[tokio::test]
async fn missing_piece_is_404_with_kind() {
  let app = make_app().await;
  let (s, body) = call(&app, "GET", "/pieces/42", None).await;
  assert_eq!(s, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");
  assert!(body["error"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn attached_contlet_delete_is_409_until_detached() {
  let app = make_app().await;
  let (_, piece) =
    call(&app, "POST", "/pieces", Some(json!({"class": "page", "title": "t"}))).await;
  let (_, para) =
    call(&app, "POST", "/contlets", Some(json!({"variant": "paragraph", "text": "x"}))).await;
  let (pid, cid) = (id_of(&piece), id_of(&para));

  call(&app, "POST", &format!("/pieces/{pid}/contlets"), Some(json!({"contlet_id": cid}))).await;

  let (s, body) = call(&app, "DELETE", &format!("/contlets/{cid}"), None).await;
  assert_eq!(s, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "restricted_delete");

  let (s, _) = call(&app, "DELETE", &format!("/pieces/{pid}/contlets/{cid}"), None).await;
  assert_eq!(s, StatusCode::NO_CONTENT);
  let (s, _) = call(&app, "DELETE", &format!("/contlets/{cid}"), None).await;
  assert_eq!(s, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn bad_heading_level_is_400() {
  let app = make_app().await;
  let (s, body) = call(
    &app,
    "POST",
    "/contlets",
    Some(json!({"variant": "heading", "text": "h", "level": 9})),
  )
  .await;
  assert_eq!(s, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "invalid_argument");
}

#[tokio::test]
async fn contlet_update_switches_variant() {
  let app = make_app().await;
  let (_, c) =
    call(&app, "POST", "/contlets", Some(json!({"variant": "paragraph", "text": "x"}))).await;
  let uri = format!("/contlets/{}", id_of(&c));
  let (s, updated) = call(
    &app,
    "PUT",
    &uri,
    Some(json!({"variant": "image", "src": "/a.png", "alt_text": null, "width": 10, "height": null})),
  )
  .await;
  assert_eq!(s, StatusCode::OK);
  assert_eq!(updated["variant"], "image");

  let (_, listed) = call(&app, "GET", "/contlets", None).await;
  assert_eq!(listed[0]["preview"], "/a.png");
}

// ── Tags ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn untag_reports_whether_removed() {
  let app = make_app().await;
  let (_, tax) = call(&app, "POST", "/taxonomies", Some(json!({"name": "Topic"}))).await;
  let (_, tag) = call(
    &app,
    "POST",
    "/tags",
    Some(json!({"taxonomy_id": id_of(&tax), "value": "Rust"})),
  )
  .await;
  let (_, piece) =
    call(&app, "POST", "/pieces", Some(json!({"class": "page", "title": "t"}))).await;
  let (pid, tid) = (id_of(&piece), id_of(&tag));

  call(&app, "POST", &format!("/entities/{pid}/tags"), Some(json!({"tag_id": tid}))).await;
  let (_, ids) = call(&app, "GET", &format!("/tags/{tid}/entities"), None).await;
  assert_eq!(ids, json!([pid]));

  let uri = format!("/entities/{pid}/tags/{tid}");
  let (_, first) = call(&app, "DELETE", &uri, None).await;
  let (_, second) = call(&app, "DELETE", &uri, None).await;
  assert_eq!(first["removed"], true);
  assert_eq!(second["removed"], false);
}

// ── Graph ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_link_is_409_and_unlink_frees_it() {
  let app = make_app().await;
  call(&app, "POST", "/link-classes", Some(json!({"name": "related_to", "symmetric_link": "related_to"}))).await;
  let (_, a) = call(&app, "POST", "/pieces", Some(json!({"class": "page", "title": "a"}))).await;
  let (_, b) = call(&app, "POST", "/pieces", Some(json!({"class": "page", "title": "b"}))).await;
  let edge = json!({"subject": id_of(&a), "link_type": "related_to", "object": id_of(&b)});

  let (s, _) = call(&app, "POST", "/relationships", Some(edge.clone())).await;
  assert_eq!(s, StatusCode::CREATED);
  let (s, body) = call(&app, "POST", "/relationships", Some(edge.clone())).await;
  assert_eq!(s, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "conflict");

  let (_, out) = call(
    &app,
    "GET",
    &format!("/entities/{}/neighbors?direction=outgoing", id_of(&a)),
    None,
  )
  .await;
  assert_eq!(out[0]["other"], id_of(&b));
  assert_eq!(out[0]["counterpart"], "related_to");
  let (_, incoming) = call(
    &app,
    "GET",
    &format!("/entities/{}/neighbors?direction=incoming", id_of(&a)),
    None,
  )
  .await;
  assert_eq!(incoming, json!([]));

  let (s, _) = call(&app, "DELETE", "/relationships", Some(edge.clone())).await;
  assert_eq!(s, StatusCode::NO_CONTENT);
  let (s, _) = call(&app, "POST", "/relationships", Some(edge)).await;
  assert_eq!(s, StatusCode::CREATED);
}

#[tokio::test]
async fn releasing_an_entity_removes_it() {
  let app = make_app().await;
  let (_, piece) =
    call(&app, "POST", "/pieces", Some(json!({"class": "page", "title": "t"}))).await;
  let uri = format!("/entities/{}", id_of(&piece));
  let (s, _) = call(&app, "DELETE", &uri, None).await;
  assert_eq!(s, StatusCode::NO_CONTENT);
  let (s, _) = call(&app, "DELETE", &uri, None).await;
  assert_eq!(s, StatusCode::NOT_FOUND);
}

// ── Schema and generic records ───────────────────────────────────────────────

#[tokio::test]
async fn injected_column_name_is_400() {
  let app = make_app().await;
  let change = json!([{
    "action": "add",
    "field": "name; DROP TABLE x",
    "column_type": {"kind": "semantic", "name": "Single Line of Text"}
  }]);
  let (s, body) = call(&app, "POST", "/schema/content_piece", Some(change)).await;
  assert_eq!(s, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "invalid_identifier");
}

#[tokio::test]
async fn added_column_is_usable_through_class_routes() {
  let app = make_app().await;
  let change = json!([{
    "action": "add",
    "field": "subtitle",
    "column_type": {"kind": "semantic", "name": "Single Line of Text"}
  }]);
  let (s, plan) = call(&app, "POST", "/schema/content_piece", Some(change)).await;
  assert_eq!(s, StatusCode::OK);
  assert_eq!(plan["clauses"][0]["definition"], "\"subtitle\" VARCHAR(255) NULL");

  let (_, tables) = call(&app, "GET", "/schema", None).await;
  let piece_table = tables
    .as_array()
    .unwrap()
    .iter()
    .find(|t| t["table"] == "content_piece")
    .unwrap();
  assert!(
    piece_table["columns"]
      .as_array()
      .unwrap()
      .iter()
      .any(|c| c["field"] == "subtitle")
  );

  let (_, piece) =
    call(&app, "POST", "/pieces", Some(json!({"class": "page", "title": "t"}))).await;
  let uri = format!("/classes/content_piece/{}", id_of(&piece));
  let (s, _) = call(&app, "PUT", &uri, Some(json!({"subtitle": "A tour"}))).await;
  assert_eq!(s, StatusCode::NO_CONTENT);
  let (_, record) = call(&app, "GET", &uri, None).await;
  assert_eq!(record["subtitle"], "A tour");
  assert_eq!(record["title"], "t");
}

#[tokio::test]
async fn semantic_type_labels_are_listed() {
  let app = make_app().await;
  let (s, labels) = call(&app, "GET", "/schema/types", None).await;
  assert_eq!(s, StatusCode::OK);
  assert!(labels.as_array().unwrap().contains(&json!("Single Line of Text")));
}
