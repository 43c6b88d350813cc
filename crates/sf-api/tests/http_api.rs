use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sf_api::{ApiClient, ApiConfig, ApiError};
use sf_core::types::{ProjectId, StageType, VersionId, VersionSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct StageRecord {
    id: i64,
    content: String,
    status: &'static str,
}

#[derive(Debug, Clone)]
struct VersionRecord {
    id: i64,
    stage_id: i64,
    version_number: i64,
    content: String,
    source: &'static str,
    label: Option<String>,
}

/// In-memory stand-in for the stage/version backend, mirroring its observed
/// behavior: manual version on content change, newest-first version lists,
/// pre-restore snapshot on restore.
#[derive(Default)]
struct Backend {
    stages: HashMap<String, StageRecord>,
    versions: Vec<VersionRecord>,
    next_id: i64,
}

impl Backend {
    fn seed_stage(&mut self, stage_type: &str, content: &str) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        self.stages.insert(
            stage_type.to_string(),
            StageRecord {
                id,
                content: content.to_string(),
                status: if content.is_empty() {
                    "unlocked"
                } else {
                    "in_progress"
                },
            },
        );
        id
    }

    fn push_version(&mut self, stage_id: i64, content: &str, source: &'static str) -> i64 {
        self.next_id += 1;
        let number = self
            .versions
            .iter()
            .filter(|version| version.stage_id == stage_id)
            .map(|version| version.version_number)
            .max()
            .unwrap_or(0)
            + 1;
        self.versions.push(VersionRecord {
            id: self.next_id,
            stage_id,
            version_number: number,
            content: content.to_string(),
            source,
            label: None,
        });
        self.next_id
    }
}

type Shared = Arc<Mutex<Backend>>;

fn stage_json(stage_type: &str, record: &StageRecord) -> Value {
    let now = Utc::now().to_rfc3339();
    json!({
        "id": record.id,
        "project_id": 1,
        "stage_type": stage_type,
        "status": record.status,
        "content": record.content,
        "created_at": now,
        "updated_at": now,
    })
}

fn version_json(record: &VersionRecord) -> Value {
    json!({
        "id": record.id,
        "stage_id": record.stage_id,
        "version_number": record.version_number,
        "content": record.content,
        "source": record.source,
        "label": record.label,
        "created_at": Utc::now().to_rfc3339(),
    })
}

async fn get_stage(
    State(state): State<Shared>,
    Path((_project, stage_type)): Path<(i64, String)>,
) -> impl IntoResponse {
    let backend = state.lock().unwrap();
    match backend.stages.get(&stage_type) {
        Some(record) => Json(stage_json(&stage_type, record)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Stage not found"})),
        )
            .into_response(),
    }
}

async fn put_stage(
    State(state): State<Shared>,
    Path((_project, stage_type)): Path<(i64, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let content = body["content"].as_str().unwrap_or_default().to_string();
    let mut backend = state.lock().unwrap();
    let Some(record) = backend.stages.get(&stage_type).cloned() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Stage not found"})),
        )
            .into_response();
    };
    if record.content != content {
        backend.push_version(record.id, &content, "manual");
    }
    let status = if content.is_empty() {
        "unlocked"
    } else {
        "in_progress"
    };
    let updated = StageRecord {
        id: record.id,
        content,
        status,
    };
    backend.stages.insert(stage_type.clone(), updated.clone());
    Json(stage_json(&stage_type, &updated)).into_response()
}

async fn restore_stage(
    State(state): State<Shared>,
    Path((_project, stage_type)): Path<(i64, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let version_id = body["version_id"].as_i64().unwrap_or_default();
    let mut backend = state.lock().unwrap();
    let Some(record) = backend.stages.get(&stage_type).cloned() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Stage not found"})),
        )
            .into_response();
    };
    let Some(snapshot) = backend
        .versions
        .iter()
        .find(|version| version.id == version_id)
        .cloned()
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Version not found"})),
        )
            .into_response();
    };
    backend.push_version(record.id, &record.content, "manual");
    let updated = StageRecord {
        id: record.id,
        content: snapshot.content,
        status: record.status,
    };
    backend.stages.insert(stage_type.clone(), updated.clone());
    Json(stage_json(&stage_type, &updated)).into_response()
}

async fn list_versions(
    State(state): State<Shared>,
    Path((_project, stage_type)): Path<(i64, String)>,
) -> impl IntoResponse {
    let backend = state.lock().unwrap();
    let Some(record) = backend.stages.get(&stage_type) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Stage not found"})),
        )
            .into_response();
    };
    let mut versions: Vec<&VersionRecord> = backend
        .versions
        .iter()
        .filter(|version| version.stage_id == record.id)
        .collect();
    // newest first, as the real backend serves them
    versions.sort_by_key(|version| std::cmp::Reverse(version.version_number));
    let items: Vec<Value> = versions.iter().map(|version| version_json(version)).collect();
    Json(json!({"items": items, "total": items.len()})).into_response()
}

async fn rename_version(
    State(state): State<Shared>,
    Path((_project, _stage_type, version_id)): Path<(i64, String, i64)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut backend = state.lock().unwrap();
    match backend
        .versions
        .iter_mut()
        .find(|version| version.id == version_id)
    {
        Some(version) => {
            version.label = body["label"].as_str().map(str::to_string);
            Json(json!({"message": "ok"})).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Version not found"})),
        )
            .into_response(),
    }
}

async fn delete_version(
    State(state): State<Shared>,
    Path((_project, _stage_type, version_id)): Path<(i64, String, i64)>,
) -> impl IntoResponse {
    let mut backend = state.lock().unwrap();
    let before = backend.versions.len();
    backend.versions.retain(|version| version.id != version_id);
    if backend.versions.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Version not found"})),
        )
            .into_response();
    }
    Json(json!({"message": "ok"})).into_response()
}

async fn spawn_backend(backend: Backend) -> (ApiClient, Shared) {
    let shared: Shared = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route(
            "/projects/{project}/stages/{stage_type}",
            get(get_stage).put(put_stage),
        )
        .route(
            "/projects/{project}/stages/{stage_type}/restore",
            axum::routing::post(restore_stage),
        )
        .route(
            "/projects/{project}/stages/{stage_type}/versions",
            get(list_versions),
        )
        .route(
            "/projects/{project}/stages/{stage_type}/versions/{version_id}",
            axum::routing::put(rename_version).delete(delete_version),
        )
        .with_state(Arc::clone(&shared));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = ApiClient::new(ApiConfig::new(format!("http://{addr}")));
    (client, shared)
}

const PROJECT: ProjectId = ProjectId(1);

#[tokio::test]
async fn update_then_get_round_trips_content() {
    let mut backend = Backend::default();
    backend.seed_stage("idea", "");
    let (client, _state) = spawn_backend(backend).await;

    let updated = client
        .stages()
        .update(PROJECT, StageType::Idea, "a spark of something")
        .await
        .unwrap();
    assert_eq!(updated.content, "a spark of something");

    let fetched = client.stages().get(PROJECT, StageType::Idea).await.unwrap();
    assert_eq!(fetched.content, "a spark of something");
    assert_eq!(fetched.stage_type, StageType::Idea);
}

#[tokio::test]
async fn version_list_is_normalized_to_ascending_order() {
    let mut backend = Backend::default();
    let stage_id = backend.seed_stage("story", "v3");
    backend.push_version(stage_id, "v1", "manual");
    backend.push_version(stage_id, "v2", "ai");
    backend.push_version(stage_id, "v3", "manual");
    let (client, _state) = spawn_backend(backend).await;

    let versions = client
        .versions()
        .list(PROJECT, StageType::Story)
        .await
        .unwrap();
    let numbers: Vec<i64> = versions.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(versions[1].source, VersionSource::Ai);
}

#[tokio::test]
async fn restore_keeps_restored_and_later_versions() {
    let mut backend = Backend::default();
    let stage_id = backend.seed_stage("story", "third draft");
    backend.push_version(stage_id, "first draft", "manual");
    backend.push_version(stage_id, "second draft", "manual");
    backend.push_version(stage_id, "third draft", "manual");
    let (client, _state) = spawn_backend(backend).await;

    let versions = client
        .versions()
        .list(PROJECT, StageType::Story)
        .await
        .unwrap();
    let first = versions[0].clone();
    assert_eq!(first.content, "first draft");

    let restored = client
        .stages()
        .restore(PROJECT, StageType::Story, first.id)
        .await
        .unwrap();
    assert_eq!(restored.content, "first draft");

    let after = client
        .versions()
        .list(PROJECT, StageType::Story)
        .await
        .unwrap();
    // nothing deleted, and the pre-restore content got its own snapshot
    assert!(after.iter().any(|v| v.id == first.id));
    assert!(after.iter().any(|v| v.content == "second draft"));
    assert!(after.iter().any(|v| v.content == "third draft"));
    assert_eq!(after.len(), versions.len() + 1);
}

#[tokio::test]
async fn rename_persists_and_delete_removes() {
    let mut backend = Backend::default();
    let stage_id = backend.seed_stage("script", "take two");
    backend.push_version(stage_id, "take one", "manual");
    backend.push_version(stage_id, "take two", "manual");
    let (client, _state) = spawn_backend(backend).await;

    let versions = client
        .versions()
        .list(PROJECT, StageType::Script)
        .await
        .unwrap();
    let target = versions[0].id;

    client
        .versions()
        .rename(PROJECT, StageType::Script, target, "keeper")
        .await
        .unwrap();
    let renamed = client
        .versions()
        .list(PROJECT, StageType::Script)
        .await
        .unwrap();
    assert_eq!(
        renamed.iter().find(|v| v.id == target).unwrap().label.as_deref(),
        Some("keeper")
    );

    client
        .versions()
        .delete(PROJECT, StageType::Script, target)
        .await
        .unwrap();
    let remaining = client
        .versions()
        .list(PROJECT, StageType::Script)
        .await
        .unwrap();
    assert!(remaining.iter().all(|v| v.id != target));
}

#[tokio::test]
async fn empty_label_is_rejected_before_any_request() {
    // Unroutable endpoint: if validation did not short-circuit, the call
    // would surface a transport error instead.
    let client = ApiClient::new(ApiConfig::new("http://127.0.0.1:1"));
    let result = client
        .versions()
        .rename(PROJECT, StageType::Idea, VersionId(1), "   ")
        .await;
    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[tokio::test]
async fn missing_stage_maps_to_not_found() {
    let (client, _state) = spawn_backend(Backend::default()).await;
    let result = client.stages().get(PROJECT, StageType::Scene).await;
    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn server_error_surfaces_detail_message() {
    let app = Router::new().route(
        "/projects/{project}/stages/{stage_type}",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "model exploded"})),
            )
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ApiClient::new(ApiConfig::new(format!("http://{addr}")));
    let result = client.stages().get(PROJECT, StageType::Idea).await;
    match result {
        Err(ApiError::Server { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "model exploded");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_all_skips_absent_stages() {
    let mut backend = Backend::default();
    backend.seed_stage("idea", "spark");
    backend.seed_stage("story", "arc");
    let (client, _state) = spawn_backend(backend).await;

    let stages = client.stages().fetch_all(PROJECT).await.unwrap();
    assert_eq!(stages.len(), 2);
    assert!(stages.contains_key(&StageType::Idea));
    assert!(stages.contains_key(&StageType::Story));
    assert!(!stages.contains_key(&StageType::Scene));
}
