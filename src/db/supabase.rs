use async_trait::async_trait;
use http::header::{AUTHORIZATION, InvalidHeaderValue};
use http::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::constants::MATCHES_TABLE;
use crate::db::models::{Match, MatchChanges, MatchFields, MatchStatus};
use crate::db::{MatchStore, StoreError, StoreResult};

const PREFER_REPRESENTATION: &str = "return=representation";

/// Store backed by a hosted Supabase project, spoken to through its PostgREST interface.
///
/// The `matches` table must already exist on the remote side.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    table_url: String,
}

/// Rows coming back from PostgREST may carry a null status when written by other clients.
#[derive(Debug, Deserialize)]
struct RemoteRow {
    id: i64,
    date: String,
    time: Option<String>,
    club: String,
    team: String,
    result: Option<String>,
    status: Option<MatchStatus>,
}

impl From<RemoteRow> for Match {
    fn from(row: RemoteRow) -> Self {
        Self {
            id: row.id,
            date: row.date,
            time: row.time.filter(|t| !t.is_empty()),
            club: row.club,
            team: row.team,
            result: row.result.filter(|r| !r.is_empty()),
            status: row.status.unwrap_or_default(),
        }
    }
}

impl SupabaseStore {
    pub fn new(project_url: &str, api_key: &str) -> StoreResult<Self> {
        let headers =
            auth_headers(api_key).map_err(|_| StoreError::InvalidSetting("SUPABASE_ANON_KEY"))?;
        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            table_url: format!(
                "{}/rest/v1/{MATCHES_TABLE}",
                project_url.trim_end_matches('/')
            ),
        })
    }

    fn row_url(&self, id: i64) -> String {
        format!("{}?id=eq.{id}", self.table_url)
    }

    /// Checks the status of a PostgREST response and decodes its JSON body.
    async fn read<T>(res: reqwest::Response) -> StoreResult<T>
    where
        T: DeserializeOwned,
    {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(code = %status, body = %body, "non-success response from remote store");
            return Err(StoreError::Remote { status, body });
        }

        Ok(res.json::<T>().await?)
    }
}

fn auth_headers(api_key: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert("apikey", HeaderValue::from_str(api_key)?);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))?,
    );

    Ok(headers)
}

#[async_trait]
impl MatchStore for SupabaseStore {
    #[instrument(skip(self))]
    async fn list_all(&self) -> StoreResult<Vec<Match>> {
        let res = self
            .client
            .get(&self.table_url)
            .query(&[("select", "*"), ("order", "date.desc,id.desc")])
            .send()
            .await?;

        let rows = Self::read::<Vec<RemoteRow>>(res).await?;
        Ok(rows.into_iter().map(Match::from).collect())
    }

    #[instrument(skip(self, fields), fields(date = %fields.date))]
    async fn insert(&self, fields: MatchFields) -> StoreResult<Match> {
        let res = self
            .client
            .post(&self.table_url)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&[&fields])
            .send()
            .await?;

        Self::read::<Vec<RemoteRow>>(res)
            .await?
            .into_iter()
            .next()
            .map(Match::from)
            .ok_or(StoreError::EmptyRepresentation)
    }

    /// Unsent optional fields are left out of the body, so PostgREST keeps their stored values.
    #[instrument(skip(self, changes))]
    async fn update(&self, id: i64, changes: MatchChanges) -> StoreResult<Option<Match>> {
        let res = self
            .client
            .patch(self.row_url(id))
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&changes)
            .send()
            .await?;

        let rows = Self::read::<Vec<RemoteRow>>(res).await?;
        Ok(rows.into_iter().next().map(Match::from))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let res = self
            .client
            .delete(self.row_url(id))
            .header("Prefer", PREFER_REPRESENTATION)
            .send()
            .await?;

        let rows = Self::read::<Vec<serde_json::Value>>(res).await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn row(id: i64, date: &str) -> serde_json::Value {
        json!({
            "id": id,
            "date": date,
            "time": null,
            "club": "Litoral",
            "team": "Ana/Eva",
            "result": "",
            "status": null
        })
    }

    #[tokio::test]
    async fn test_list_sends_order_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/matches"))
            .and(query_param("order", "date.desc,id.desc"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([row(2, "2024-05-01"), row(1, "2024-01-01")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "anon-key").unwrap();
        let matches = store.list_all().await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, 2);
        assert_eq!(matches[0].status, MatchStatus::Pending);
        assert!(matches[0].result.is_none());
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let server = MockServer::start().await;
        let fields = MatchFields {
            date: "2024-05-01".into(),
            time: Some("19:00".into()),
            club: "Litoral".into(),
            team: "Ana/Eva".into(),
            result: None,
            status: MatchStatus::Won,
        };

        Mock::given(method("POST"))
            .and(path("/rest/v1/matches"))
            .and(header("prefer", PREFER_REPRESENTATION))
            .and(body_json(json!([{
                "date": "2024-05-01",
                "time": "19:00",
                "club": "Litoral",
                "team": "Ana/Eva",
                "result": null,
                "status": "Ganado"
            }])))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": 7,
                "date": "2024-05-01",
                "time": "19:00",
                "club": "Litoral",
                "team": "Ana/Eva",
                "result": null,
                "status": "Ganado"
            }])))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "anon-key").unwrap();
        let created = store.insert(fields.clone()).await.unwrap();

        assert_eq!(created, Match::from_fields(7, fields));
    }

    #[tokio::test]
    async fn test_update_sends_only_given_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/matches"))
            .and(query_param("id", "eq.7"))
            .and(body_json(json!({
                "date": "2024-05-02",
                "club": "Litoral",
                "team": "Ana/Eva",
                "result": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(7, "2024-05-02")])))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "anon-key").unwrap();
        let changes = MatchChanges {
            date: "2024-05-02".into(),
            time: None,
            club: "Litoral".into(),
            team: "Ana/Eva".into(),
            result: Some(None),
            status: None,
        };

        let updated = store.update(7, changes).await.unwrap().unwrap();
        assert_eq!(updated.id, 7);
    }

    #[tokio::test]
    async fn test_update_and_delete_of_missing_row() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/matches"))
            .and(query_param("id", "eq.99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/matches"))
            .and(query_param("id", "eq.99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "anon-key").unwrap();
        let changes = MatchChanges {
            date: "2024-05-01".into(),
            time: None,
            club: "c".into(),
            team: "t".into(),
            result: None,
            status: Some(MatchStatus::Pending),
        };

        assert!(store.update(99, changes).await.unwrap().is_none());
        assert!(!store.delete(99).await.unwrap());
    }

    #[tokio::test]
    async fn test_remote_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "wrong").unwrap();
        let err = store.list_all().await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Remote { status, ref body } if status == 401 && body == "invalid api key"
        ));
    }
}
