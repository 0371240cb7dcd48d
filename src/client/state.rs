//! Client UI state.
//!
//! The whole UI is one [`UiState`] value. Every user action or request outcome goes through
//! [`UiState::update`], which mutates the state and may ask the driver to perform a request by
//! returning a [`Command`]. The driver feeds the request's outcome back in as another action.

use chrono::{NaiveDate, NaiveDateTime};

use crate::client::views::{self, MonthlyStats};
use crate::constants::MSG_FETCH_BANNER;
use crate::db::models::{Match, MatchPayload, MatchStatus};

/// Which panel is showing. Exactly one at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UiMode {
    #[default]
    Idle,
    FormOpen {
        editing: Option<i64>,
    },
    CalendarOpen,
    StatsOpen,
}

/// Form draft; text fields hold what the user typed, empty meaning "no value".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchForm {
    pub date: String,
    pub time: String,
    pub club: String,
    pub team: String,
    pub result: String,
    pub status: MatchStatus,
}

impl MatchForm {
    /// Empty form dated `today`.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            date: today.to_string(),
            time: String::new(),
            club: String::new(),
            team: String::new(),
            result: String::new(),
            status: MatchStatus::Pending,
        }
    }

    pub fn from_match(m: &Match) -> Self {
        Self {
            date: m.date.clone(),
            time: m.time.clone().unwrap_or_default(),
            club: m.club.clone(),
            team: m.team.clone(),
            result: m.result.clone().unwrap_or_default(),
            status: m.status,
        }
    }

    /// Full payload; an empty optional field is sent as cleared.
    pub fn to_payload(&self) -> MatchPayload {
        fn given(s: &str) -> Option<String> {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }

        MatchPayload {
            date: given(&self.date),
            time: Some(given(&self.time)),
            club: given(&self.club),
            team: given(&self.team),
            result: Some(given(&self.result)),
            status: Some(self.status.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    OpenNewForm,
    EditMatch(i64),
    EditDraft(MatchForm),
    CloseModal,
    OpenCalendar,
    OpenStats,
    ShiftMonth(i32),
    Submit,
    Delete(i64),
    Fetched {
        result: Result<Vec<Match>, String>,
        now: NaiveDateTime,
    },
    Saved(Result<Match, String>),
    Deleted(Result<String, String>),
}

/// A request the driver should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fetch,
    Create(MatchPayload),
    Update(i64, MatchPayload),
    Remove(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// Sorted by proximity to the moment of the last successful fetch.
    pub matches: Vec<Match>,
    pub mode: UiMode,
    pub draft: MatchForm,
    /// First day of the month the calendar shows.
    pub calendar_cursor: NaiveDate,
    pub banner: Option<String>,
    pub loading: bool,
    pub today: NaiveDate,
}

impl UiState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            matches: Vec::new(),
            mode: UiMode::Idle,
            draft: MatchForm::blank(today),
            calendar_cursor: views::first_of_month(today),
            banner: None,
            loading: false,
            today,
        }
    }

    /// Initial load.
    pub fn start(&mut self) -> Command {
        self.loading = true;
        Command::Fetch
    }

    pub fn stats(&self) -> MonthlyStats {
        views::monthly_stats(&self.matches, self.today)
    }

    pub fn update(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::OpenNewForm => {
                self.draft = MatchForm::blank(self.today);
                self.mode = UiMode::FormOpen { editing: None };
                None
            }

            Action::EditMatch(id) => {
                match self.matches.iter().find(|m| m.id == id) {
                    Some(m) => {
                        self.draft = MatchForm::from_match(m);
                        self.mode = UiMode::FormOpen { editing: Some(id) };
                    }
                    None => self.banner = Some(format!("match {id} not found")),
                }
                None
            }

            Action::EditDraft(form) => {
                if matches!(self.mode, UiMode::FormOpen { .. }) {
                    self.draft = form;
                }
                None
            }

            Action::CloseModal => {
                self.close_modal();
                None
            }

            Action::OpenCalendar => {
                self.mode = UiMode::CalendarOpen;
                None
            }

            Action::OpenStats => {
                self.mode = UiMode::StatsOpen;
                None
            }

            Action::ShiftMonth(offset) => {
                self.calendar_cursor = views::shift_month(self.calendar_cursor, offset);
                None
            }

            Action::Submit => {
                let UiMode::FormOpen { editing } = self.mode else {
                    return None;
                };

                let payload = self.draft.to_payload();
                // same checks the server runs; reported before any request is made
                if let Err(e) = payload.clone().validate() {
                    self.banner = Some(e.to_string());
                    return None;
                }

                self.loading = true;
                Some(match editing {
                    Some(id) => Command::Update(id, payload),
                    None => Command::Create(payload),
                })
            }

            Action::Delete(id) => {
                self.loading = true;
                Some(Command::Remove(id))
            }

            Action::Fetched { result, now } => {
                self.loading = false;
                match result {
                    Ok(matches) => {
                        self.matches = views::sort_by_proximity(matches, now);
                        self.today = now.date();
                        self.banner = None;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "fetch failed, keeping previous list");
                        self.banner = Some(MSG_FETCH_BANNER.to_string());
                    }
                }
                None
            }

            Action::Saved(Err(e)) | Action::Deleted(Err(e)) => {
                self.loading = false;
                self.banner = Some(e);
                None
            }

            Action::Saved(Ok(_)) | Action::Deleted(Ok(_)) => {
                self.close_modal();
                self.loading = true;
                Some(Command::Fetch)
            }
        }
    }

    fn close_modal(&mut self) {
        self.mode = UiMode::Idle;
        self.draft = MatchForm::blank(self.today);
    }
}
