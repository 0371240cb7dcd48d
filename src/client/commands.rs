//! Terminal front end: one function per subcommand, each returning the text to print.

use std::io::{BufRead, Write};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::args::MatchArgs;
use crate::client::render;
use crate::client::session::Session;
use crate::client::state::Action;

pub type CommandResult<T> = core::result::Result<T, CommandErr>;

#[derive(Debug, Error)]
pub enum CommandErr {
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<String> for CommandErr {
    fn from(banner: String) -> Self {
        CommandErr::Rejected(banner)
    }
}

pub async fn list(session: &mut Session) -> CommandResult<String> {
    session.load().await?;
    Ok(render::match_table(&session.state.matches))
}

pub async fn add(session: &mut Session, fields: MatchArgs) -> CommandResult<String> {
    session.load().await?;
    session.dispatch(Action::OpenNewForm).await?;
    submit(session, fields).await?;

    Ok(format!("match saved\n\n{}", render::match_table(&session.state.matches)))
}

pub async fn edit(session: &mut Session, id: i64, fields: MatchArgs) -> CommandResult<String> {
    session.load().await?;
    session.dispatch(Action::EditMatch(id)).await?;
    submit(session, fields).await?;

    Ok(format!("match {id} updated\n\n{}", render::match_table(&session.state.matches)))
}

async fn submit(session: &mut Session, fields: MatchArgs) -> CommandResult<()> {
    let draft = fields.apply(session.state.draft.clone());
    session.dispatch(Action::EditDraft(draft)).await?;
    session.dispatch(Action::Submit).await?;
    Ok(())
}

/// Deletes after a y/N prompt on stdin, unless `confirmed`.
pub async fn delete(session: &mut Session, id: i64, confirmed: bool) -> CommandResult<String> {
    if !confirmed && !confirm(&format!("delete match {id}?"))? {
        return Ok("cancelled\n".to_string());
    }

    session.dispatch(Action::Delete(id)).await?;
    Ok(format!("match {id} deleted\n"))
}

pub async fn stats(session: &mut Session) -> CommandResult<String> {
    session.load().await?;
    session.dispatch(Action::OpenStats).await?;
    Ok(render::stats(&session.state.stats()))
}

pub async fn calendar(session: &mut Session, month: Option<NaiveDate>) -> CommandResult<String> {
    session.load().await?;
    session.dispatch(Action::OpenCalendar).await?;
    if let Some(month) = month {
        let offset = month_index(month) - month_index(session.state.calendar_cursor);
        session.dispatch(Action::ShiftMonth(offset)).await?;
    }

    let state = &session.state;
    Ok(render::calendar(state.calendar_cursor, state.today, &state.matches))
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn confirm(prompt: &str) -> std::io::Result<bool> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{prompt} [y/N] ")?;
    stdout.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
