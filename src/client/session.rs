use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::instrument;

use crate::client::http::ApiClient;
use crate::client::state::{Action, Command, UiState};

/// Current wall-clock time, used for proximity ordering and "this month".
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Drives a [`UiState`], performing the requests it asks for against the API.
#[derive(Debug)]
pub struct Session {
    api: ApiClient,
    pub state: UiState,
}

impl Session {
    pub fn new(api: ApiClient, today: NaiveDate) -> Self {
        Self {
            api,
            state: UiState::new(today),
        }
    }

    /// Initial fetch; the banner is set if it fails.
    pub async fn load(&mut self) -> Result<(), String> {
        let command = self.state.start();
        self.run(Some(command)).await
    }

    /// Applies `action` and performs every follow-up request until the state settles.
    ///
    /// Returns the banner if the action or one of its requests failed.
    #[instrument(skip(self))]
    pub async fn dispatch(&mut self, action: Action) -> Result<(), String> {
        self.state.banner = None;
        let next = self.state.update(action);
        self.run(next).await
    }

    async fn run(&mut self, mut next: Option<Command>) -> Result<(), String> {
        while let Some(command) = next {
            let outcome = self.perform(command).await;
            next = self.state.update(outcome);
        }

        match self.state.banner.take() {
            Some(banner) => Err(banner),
            None => Ok(()),
        }
    }

    async fn perform(&self, command: Command) -> Action {
        tracing::debug!(?command, "performing request");
        match command {
            Command::Fetch => Action::Fetched {
                result: self.api.list().await.map_err(|e| e.to_string()),
                now: local_now(),
            },
            Command::Create(payload) => {
                Action::Saved(self.api.create(&payload).await.map_err(|e| e.to_string()))
            }
            Command::Update(id, payload) => Action::Saved(
                self.api
                    .update(id, &payload)
                    .await
                    .map_err(|e| e.to_string()),
            ),
            Command::Remove(id) => {
                Action::Deleted(self.api.delete(id).await.map_err(|e| e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::state::UiMode;
    use crate::constants::MSG_FETCH_BANNER;

    fn stored(id: i64, date: &str) -> serde_json::Value {
        json!({
            "id": id,
            "date": date,
            "time": null,
            "club": "Litoral",
            "team": "Ana/Eva",
            "result": null,
            "status": "Pendiente"
        })
    }

    fn session(server: &MockServer) -> Session {
        Session::new(ApiClient::new(&server.uri()), local_now().date())
    }

    #[tokio::test]
    async fn test_load_populates_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([stored(2, "2024-06-15"), stored(1, "2024-06-01")])),
            )
            .mount(&server)
            .await;

        let mut session = session(&server);
        session.load().await.unwrap();

        assert_eq!(session.state.matches.len(), 2);
        assert!(!session.state.loading);
    }

    #[tokio::test]
    async fn test_load_failure_reports_banner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "error": "failed to fetch matches" })),
            )
            .mount(&server)
            .await;

        let mut session = session(&server);
        assert_eq!(session.load().await.unwrap_err(), MSG_FETCH_BANNER);
        assert!(session.state.matches.is_empty());
    }

    #[tokio::test]
    async fn test_delete_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([stored(4, "2024-06-15")])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/matches/4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "message": "match deleted" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session(&server);
        session.load().await.unwrap();
        session.dispatch(Action::EditMatch(4)).await.unwrap();
        session.dispatch(Action::Delete(4)).await.unwrap();

        assert!(session.state.matches.is_empty());
        assert_eq!(session.state.mode, UiMode::Idle);
    }

    #[tokio::test]
    async fn test_rejected_save_keeps_form() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([stored(4, "2024-06-15")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/matches/4"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "error": "failed to update match" })),
            )
            .mount(&server)
            .await;

        let mut session = session(&server);
        session.load().await.unwrap();
        session.dispatch(Action::EditMatch(4)).await.unwrap();

        let err = session.dispatch(Action::Submit).await.unwrap_err();
        assert!(err.starts_with("failed to update match"));
        assert_eq!(session.state.mode, UiMode::FormOpen { editing: Some(4) });
    }
}
