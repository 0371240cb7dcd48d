use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::server::{AppState, JsonResult, RouteError};
use crate::constants::{
    MSG_CREATE_FAILED, MSG_DELETE_FAILED, MSG_DELETED, MSG_LIST_FAILED, MSG_UPDATE_FAILED,
};
use crate::db::prelude::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[instrument(skip(state))]
pub async fn list_matches(State(state): State<Arc<AppState>>) -> JsonResult<Vec<Match>> {
    let matches = state
        .store
        .list_all()
        .await
        .map_err(RouteError::store(MSG_LIST_FAILED))?;

    tracing::debug!(count = matches.len(), "listed matches");
    Ok(Json(matches))
}

#[instrument(skip(state, payload))]
pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MatchPayload>,
) -> Result<(StatusCode, Json<Match>), RouteError> {
    let fields = payload.validate()?.into_fields();
    let created = state
        .store
        .insert(fields)
        .await
        .map_err(RouteError::store(MSG_CREATE_FAILED))?;

    tracing::info!(id = created.id, date = %created.date, "match created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Optional fields left out of the payload keep their stored values.
///
/// Without strict existence checking an update aimed at a missing id still answers 200,
/// echoing the submitted fields under that id.
#[instrument(skip(state, payload))]
pub async fn update_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<MatchPayload>,
) -> JsonResult<Match> {
    let changes = payload.validate()?;
    let updated = state
        .store
        .update(id, changes.clone())
        .await
        .map_err(RouteError::store(MSG_UPDATE_FAILED))?;

    match updated {
        Some(m) => {
            tracing::info!(id, "match updated");
            Ok(Json(m))
        }
        None if state.strict_existence_checking => Err(RouteError::NotFound(id)),
        None => {
            tracing::warn!(id, "update matched no row");
            Ok(Json(Match::from_fields(id, changes.into_fields())))
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> JsonResult<MessageResponse> {
    let deleted = state
        .store
        .delete(id)
        .await
        .map_err(RouteError::store(MSG_DELETE_FAILED))?;

    if !deleted {
        if state.strict_existence_checking {
            return Err(RouteError::NotFound(id));
        }
        tracing::warn!(id, "delete matched no row");
    }

    Ok(Json(MessageResponse {
        message: MSG_DELETED.to_string(),
    }))
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use http::Request;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tower_http::cors::CorsLayer;

    use super::*;
    use crate::api::server::router;
    use crate::db::sql::SqlStore;

    async fn app(strict: bool) -> Router {
        let store = SqlStore::in_memory().await.unwrap();
        router(
            Arc::new(AppState {
                store: Arc::new(store),
                strict_existence_checking: strict,
            }),
            CorsLayer::permissive(),
        )
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            // extractor rejections come back as plain text
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, value)
    }

    fn decode<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    async fn create(app: &Router, payload: Value) -> (StatusCode, Value) {
        send(app, "POST", "/api/matches", Some(payload)).await
    }

    fn body(date: &str, club: &str, team: &str) -> Value {
        json!({
            "date": date,
            "time": "",
            "club": club,
            "team": team,
            "result": "",
            "status": "Pendiente"
        })
    }

    #[tokio::test]
    async fn test_create_assigns_new_ids() {
        let app = app(false).await;

        let (status, first) = create(&app, body("2024-01-01", "Norte", "A/B")).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, second) = create(&app, body("2024-01-02", "Sur", "C/D")).await;

        let (first, second): (Match, Match) = (decode(first), decode(second));
        assert_ne!(first.id, second.id);
        assert_eq!(first.club, "Norte");
        assert!(first.time.is_none());
        assert!(first.result.is_none());
    }

    #[tokio::test]
    async fn test_create_missing_club_persists_nothing() {
        let app = app(false).await;

        let (status, err) = send(
            &app,
            "POST",
            "/api/matches",
            Some(json!({ "date": "2024-01-01", "team": "X" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"], "missing required field(s): club");

        let (_, list) = send(&app, "GET", "/api/matches", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_status_defaults_to_pending() {
        let app = app(false).await;

        let (_, created) = send(
            &app,
            "POST",
            "/api/matches",
            Some(json!({ "date": "2024-01-01", "club": "c", "team": "t" })),
        )
        .await;

        assert_eq!(created["status"], "Pendiente");
    }

    #[tokio::test]
    async fn test_update_then_list_keeps_id() {
        let app = app(false).await;
        let (_, created) = create(&app, body("2024-01-01", "c", "t")).await;
        let created: Match = decode(created);

        let mut changed = body("2024-01-08", "Club Nuevo", "t");
        changed["result"] = json!("6-2 6-1");
        changed["status"] = json!("Won");
        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/matches/{}", created.id),
            Some(changed),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, list) = send(&app, "GET", "/api/matches", None).await;
        let list: Vec<Match> = decode(list);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0], decode::<Match>(updated));
        assert_eq!(list[0].id, created.id);
        assert_eq!(list[0].club, "Club Nuevo");
        assert_eq!(list[0].status, MatchStatus::Won);
    }

    #[tokio::test]
    async fn test_update_validates_like_create() {
        let app = app(false).await;
        let (status, _) = send(
            &app,
            "PUT",
            "/api/matches/1",
            Some(json!({ "date": "", "club": "c", "team": "t" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_unsent_fields() {
        let app = app(false).await;
        let (_, created) = create(
            &app,
            json!({
                "date": "2024-01-01",
                "time": "10:00",
                "club": "c",
                "team": "t",
                "result": "6-4 6-3",
                "status": "Ganado"
            }),
        )
        .await;
        let created: Match = decode(created);

        let uri = format!("/api/matches/{}", created.id);
        let partial = json!({ "date": "2024-01-02", "club": "c", "team": "t" });
        let (status, updated) = send(&app, "PUT", &uri, Some(partial)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["date"], "2024-01-02");
        assert_eq!(updated["time"], "10:00");
        assert_eq!(updated["result"], "6-4 6-3");
        assert_eq!(updated["status"], "Ganado");

        let clearing = json!({ "date": "2024-01-02", "club": "c", "team": "t", "result": null });
        let (_, updated) = send(&app, "PUT", &uri, Some(clearing)).await;
        assert_eq!(updated["result"], Value::Null);
        assert_eq!(updated["time"], "10:00");
    }

    #[tokio::test]
    async fn test_unknown_status_is_a_validation_error() {
        let app = app(false).await;

        let (status, err) = create(
            &app,
            json!({ "date": "2024-01-01", "club": "c", "team": "t", "status": "Drawn" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err,
            json!({ "error": "unknown status 'Drawn', expected Pendiente, Ganado or Perdido" })
        );

        let (_, list) = send(&app, "GET", "/api/matches", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_text_fields_are_trimmed() {
        let app = app(false).await;
        let (_, created) = create(&app, body(" 2024-01-01 ", " Norte ", " Ana/Eva ")).await;

        assert_eq!(created["date"], "2024-01-01");
        assert_eq!(created["club"], "Norte");
        assert_eq!(created["team"], "Ana/Eva");
    }

    #[tokio::test]
    async fn test_delete_then_list_omits_id() {
        let app = app(false).await;
        let (_, a) = create(&app, body("2024-01-01", "c", "t")).await;
        let (_, b) = create(&app, body("2024-02-01", "c", "t")).await;
        let (a, b): (Match, Match) = (decode(a), decode(b));

        let (status, msg) = send(&app, "DELETE", &format!("/api/matches/{}", a.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(msg["message"], MSG_DELETED);

        let (_, list) = send(&app, "GET", "/api/matches", None).await;
        let ids: Vec<i64> = decode::<Vec<Match>>(list).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![b.id]);
    }

    #[tokio::test]
    async fn test_list_is_date_descending() {
        let app = app(false).await;
        for date in ["2024-06-15", "2024-01-01", "2024-12-31"] {
            create(&app, body(date, "c", "t")).await;
        }

        let (_, list) = send(&app, "GET", "/api/matches", None).await;
        let dates: Vec<String> = decode::<Vec<Match>>(list).into_iter().map(|m| m.date).collect();
        assert_eq!(dates, ["2024-12-31", "2024-06-15", "2024-01-01"]);
    }

    #[tokio::test]
    async fn test_lax_mode_reports_success_for_missing_ids() {
        let app = app(false).await;

        let payload = Some(body("2024-01-01", "c", "t"));
        let (status, echoed) = send(&app, "PUT", "/api/matches/42", payload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(echoed["id"], 42);
        assert_eq!(echoed["club"], "c");

        let (status, _) = send(&app, "DELETE", "/api/matches/42", None).await;
        assert_eq!(status, StatusCode::OK);

        // the echo must not have created anything
        let (_, list) = send(&app, "GET", "/api/matches", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_strict_mode_reports_missing_ids() {
        let app = app(true).await;

        let payload = Some(body("2024-01-01", "c", "t"));
        let (status, err) = send(&app, "PUT", "/api/matches/42", payload).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["error"], "match 42 not found");

        let (status, _) = send(&app, "DELETE", "/api/matches/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_rejected() {
        let app = app(false).await;
        let (status, _) = send(&app, "DELETE", "/api/matches/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    struct BrokenStore;

    #[async_trait]
    impl MatchStore for BrokenStore {
        async fn list_all(&self) -> StoreResult<Vec<Match>> {
            Err(StoreError::SqlxError(sqlx::Error::PoolTimedOut))
        }

        async fn insert(&self, _: MatchFields) -> StoreResult<Match> {
            Err(StoreError::SqlxError(sqlx::Error::PoolTimedOut))
        }

        async fn update(&self, _: i64, _: MatchChanges) -> StoreResult<Option<Match>> {
            Err(StoreError::SqlxError(sqlx::Error::PoolTimedOut))
        }

        async fn delete(&self, _: i64) -> StoreResult<bool> {
            Err(StoreError::SqlxError(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn test_store_failures_map_to_generic_500s() {
        let app = router(
            Arc::new(AppState {
                store: Arc::new(BrokenStore),
                strict_existence_checking: false,
            }),
            CorsLayer::permissive(),
        );

        let cases = [
            ("GET", "/api/matches", None, MSG_LIST_FAILED),
            ("POST", "/api/matches", Some(body("2024-01-01", "c", "t")), MSG_CREATE_FAILED),
            ("PUT", "/api/matches/1", Some(body("2024-01-01", "c", "t")), MSG_UPDATE_FAILED),
            ("DELETE", "/api/matches/1", None, MSG_DELETE_FAILED),
        ];

        for (method, uri, payload, message) in cases {
            let (status, err) = send(&app, method, uri, payload).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");
            assert_eq!(err, json!({ "error": message }));
        }
    }

    #[tokio::test]
    async fn test_health_probe() {
        let app = app(false).await;
        let (status, body) = send(&app, "GET", "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
    }
}
