//! In-process mock of the Earth REST API
//!
//! Serves the same routes as the real service over a loopback port, keeps
//! entities in memory and can be told to reject or stall deletions.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use earth_common::{EntityKind, API_PREFIX};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Default)]
pub struct MockDb {
    rows: HashMap<EntityKind, Vec<Value>>,
    pub reject_deletes: HashSet<String>,
    pub delete_delay: Option<Duration>,
}

impl MockDb {
    fn live(&self, kind: EntityKind) -> &[Value] {
        self.rows.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    fn position(&self, kind: EntityKind, uuid: &str) -> Option<usize> {
        self.live(kind)
            .iter()
            .position(|row| row.get("uuid").and_then(Value::as_str) == Some(uuid))
    }
}

pub type SharedDb = Arc<RwLock<MockDb>>;

pub struct MockApi {
    pub base_url: String,
    pub db: SharedDb,
}

impl MockApi {
    pub async fn start() -> Self {
        let db = SharedDb::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock API");
        let addr = listener.local_addr().expect("mock API address");

        let app = router(db.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock API server");
        });

        Self {
            base_url: format!("http://{}", addr),
            db,
        }
    }

    pub async fn live(&self, kind: EntityKind) -> Vec<Value> {
        self.db.read().await.live(kind).to_vec()
    }

    pub async fn reject_delete(&self, uuid: &str) {
        self.db.write().await.reject_deletes.insert(uuid.to_string());
    }

    pub async fn allow_deletes(&self) {
        self.db.write().await.reject_deletes.clear();
    }

    pub async fn stall_deletes(&self, delay: Duration) {
        self.db.write().await.delete_delay = Some(delay);
    }

    /// Overwrite one field of a stored row, bypassing the API
    pub async fn set_field(&self, kind: EntityKind, uuid: &str, field: &str, value: Value) {
        let mut db = self.db.write().await;
        if let Some(index) = db.position(kind, uuid) {
            if let Some(rows) = db.rows.get_mut(&kind) {
                rows[index][field] = value;
            }
        }
    }
}

fn router(db: SharedDb) -> Router {
    let mut router = Router::new().route(&format!("{}/ping", API_PREFIX), get(ping));

    for kind in EntityKind::ALL {
        router = router
            .route(
                &kind.list_path(),
                get(move |State(db): State<SharedDb>| async move { list(kind, db).await }),
            )
            .route(
                &kind.create_path(),
                post(
                    move |State(db): State<SharedDb>, Json(body): Json<Value>| async move {
                        create(kind, db, body).await
                    },
                ),
            )
            .route(
                &kind.update_path(),
                put(
                    move |State(db): State<SharedDb>, Json(body): Json<Value>| async move {
                        update(kind, db, body).await
                    },
                ),
            )
            .route(
                &kind.delete_path(),
                delete(
                    move |State(db): State<SharedDb>, Query(query): Query<DeleteQuery>| async move {
                        remove(kind, db, query).await
                    },
                ),
            );
    }

    router.with_state(db)
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(Value::String(message)))
}

async fn ping() -> Json<Value> {
    Json(json!("empty string"))
}

async fn list(kind: EntityKind, db: SharedDb) -> Json<Value> {
    Json(Value::Array(db.read().await.live(kind).to_vec()))
}

/// Reject payloads the real server's validation would reject
fn validate(kind: EntityKind, db: &MockDb, body: &Value) -> Result<(), (StatusCode, Json<Value>)> {
    let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
    if name.is_empty() {
        return Err(bad_request(format!("Invalid {} name", kind)));
    }
    for parent in kind.parents() {
        let uuid = body
            .get(parent.reference_field())
            .and_then(Value::as_str)
            .unwrap_or_default();
        if db.position(*parent, uuid).is_none() {
            return Err(bad_request(format!("Invalid {} uuid", parent)));
        }
    }
    Ok(())
}

/// Countries are stored without the informational continent back-reference
fn normalize(kind: EntityKind, row: &mut Value) {
    if kind == EntityKind::Country {
        if let Some(details) = row.get_mut("details").and_then(Value::as_object_mut) {
            details.remove("continent");
        }
    }
}

async fn create(kind: EntityKind, db: SharedDb, body: Value) -> ApiResult {
    let mut db = db.write().await;
    validate(kind, &db, &body)?;

    let mut row = body;
    let now = chrono::Utc::now().to_rfc3339();
    row["uuid"] = json!(uuid::Uuid::new_v4().to_string());
    row["created"] = json!(now);
    row["updated"] = json!(now);
    normalize(kind, &mut row);

    db.rows.entry(kind).or_default().push(row.clone());
    Ok(Json(row))
}

async fn update(kind: EntityKind, db: SharedDb, body: Value) -> ApiResult {
    let mut db = db.write().await;
    let uuid = body
        .get("uuid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let index = db
        .position(kind, &uuid)
        .ok_or_else(|| bad_request("Invalid uuid".to_string()))?;
    validate(kind, &db, &body)?;

    let rows = db.rows.entry(kind).or_default();
    let created = rows[index]["created"].clone();
    let mut row = rows[index].clone();
    if let (Some(target), Some(patch)) = (row.as_object_mut(), body.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
    row["uuid"] = json!(uuid);
    row["created"] = created;
    row["updated"] = json!(chrono::Utc::now().to_rfc3339());
    normalize(kind, &mut row);

    rows[index] = row.clone();
    Ok(Json(row))
}

#[derive(Deserialize)]
struct DeleteQuery {
    #[serde(default)]
    uuid: String,
}

async fn remove(kind: EntityKind, db: SharedDb, query: DeleteQuery) -> ApiResult {
    let delay = db.read().await.delete_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut db = db.write().await;
    if db.reject_deletes.contains(&query.uuid) {
        return Err(bad_request(format!("delete rejected for {}", query.uuid)));
    }
    let index = db
        .position(kind, &query.uuid)
        .ok_or_else(|| bad_request(format!("no such {}", kind)))?;
    if let Some(rows) = db.rows.get_mut(&kind) {
        rows.remove(index);
    }
    Ok(Json(json!("")))
}
