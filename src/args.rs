use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::client::state::MatchForm;
use crate::db::models::MatchStatus;

#[derive(Parser, Debug)]
#[command(version, about = "Track padel matches: API server and terminal client")]
pub struct Cli {
    /// Base URL of the match API (defaults to MATCHLOG_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Runs the API server when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the REST API
    Serve {
        /// Overrides SERVER_API_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List matches, closest to now first
    List,

    /// Record a new match
    Add(MatchArgs),

    /// Change an existing match; omitted fields keep their value
    Edit {
        id: i64,

        #[command(flatten)]
        fields: MatchArgs,
    },

    /// Delete a match
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Total matches and matches this month
    Stats,

    /// Month grid with match days marked
    Calendar {
        /// Month to show as YYYY-MM; defaults to the current month
        #[arg(short, long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct MatchArgs {
    /// YYYY-MM-DD
    #[arg(short, long)]
    pub date: Option<String>,

    /// HH:MM; pass "" to clear
    #[arg(short, long)]
    pub time: Option<String>,

    #[arg(short, long)]
    pub club: Option<String>,

    /// Partner and/or rivals
    #[arg(short = 'm', long)]
    pub team: Option<String>,

    /// Score, e.g. "6-3 6-4"; pass "" to clear
    #[arg(short, long)]
    pub result: Option<String>,

    /// Pendiente/Ganado/Perdido (or Pending/Won/Lost)
    #[arg(short, long, value_parser = parse_status)]
    pub status: Option<MatchStatus>,
}

impl MatchArgs {
    /// Overlays the given fields onto a form draft.
    pub fn apply(self, mut form: MatchForm) -> MatchForm {
        if let Some(date) = self.date {
            form.date = date;
        }
        if let Some(time) = self.time {
            form.time = time;
        }
        if let Some(club) = self.club {
            form.club = club;
        }
        if let Some(team) = self.team {
            form.team = team;
        }
        if let Some(result) = self.result {
            form.result = result;
        }
        if let Some(status) = self.status {
            form.status = status;
        }
        form
    }
}

fn parse_status(raw: &str) -> Result<MatchStatus, String> {
    raw.parse().map_err(|_| {
        format!("unknown status '{raw}', expected Pendiente, Ganado or Perdido")
    })
}

fn parse_month(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map_err(|_| format!("invalid month '{raw}', expected YYYY-MM"))
}
