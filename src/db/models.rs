use core::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::db::StoreError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of a match. Serialized with the labels the web client has always used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    #[default]
    #[serde(rename = "Pendiente", alias = "Pending")]
    Pending,
    #[serde(rename = "Ganado", alias = "Won")]
    Won,
    #[serde(rename = "Perdido", alias = "Lost")]
    Lost,
}

impl MatchStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "Pendiente",
            MatchStatus::Won => "Ganado",
            MatchStatus::Lost => "Perdido",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pendiente" | "Pending" => Ok(MatchStatus::Pending),
            "Ganado" | "Won" => Ok(MatchStatus::Won),
            "Perdido" | "Lost" => Ok(MatchStatus::Lost),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// A stored match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub date: String,
    pub time: Option<String>,
    pub club: String,
    pub team: String,
    pub result: Option<String>,
    #[serde(default)]
    pub status: MatchStatus,
}

impl Match {
    /// Builds a record from an id and the fields submitted for it.
    pub fn from_fields(id: i64, fields: MatchFields) -> Self {
        Self {
            id,
            date: fields.date,
            time: fields.time,
            club: fields.club,
            team: fields.team,
            result: fields.result,
            status: fields.status,
        }
    }

    /// Kick-off moment; a missing time counts as midnight. `None` if the date or time is not
    /// parseable.
    pub fn kickoff(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()?;
        let time = match self.time.as_deref() {
            Some(t) => parse_time(t)?,
            None => NaiveTime::MIN,
        };

        Some(date.and_time(time))
    }

    pub fn naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

/// Everything but the id: what gets written on insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchFields {
    pub date: String,
    pub time: Option<String>,
    pub club: String,
    pub team: String,
    pub result: Option<String>,
    pub status: MatchStatus,
}

/// Request body for create and update. Every field is optional here so that missing required
/// fields can be reported as a validation failure rather than a deserialization one.
///
/// `time` and `result` tell an absent key (`None`, keep what is stored) apart from an explicit
/// `null` or blank value (`Some(None)`, clear it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPayload {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub club: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub team: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Option<String>>,
    /// Kept as text so an unknown label is reported by [`MatchPayload::validate`].
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<String>,
}

impl MatchPayload {
    /// Checks required fields, formats and the status label.
    pub fn validate(self) -> Result<MatchChanges, ValidationError> {
        let missing: Vec<&'static str> = [
            ("date", self.date.is_none()),
            ("club", self.club.is_none()),
            ("team", self.team.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(date), Some(club), Some(team)) = (self.date, self.club, self.team) else {
            return Err(ValidationError::MissingFields(missing));
        };

        if NaiveDate::parse_from_str(&date, DATE_FORMAT).is_err() {
            return Err(ValidationError::InvalidDate(date));
        }

        if let Some(Some(t)) = &self.time
            && parse_time(t).is_none()
        {
            return Err(ValidationError::InvalidTime(t.clone()));
        }

        let status = self
            .status
            .map(|s| s.parse().map_err(|_| ValidationError::InvalidStatus(s)))
            .transpose()?;

        Ok(MatchChanges {
            date,
            time: self.time,
            club,
            team,
            result: self.result,
            status,
        })
    }
}

/// A validated write. `None` in `time`, `result` or `status` means the caller did not send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchChanges {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<Option<String>>,
    pub club: String,
    pub team: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MatchStatus>,
}

impl MatchChanges {
    /// The record to insert: unsent optional fields are empty and the status is pending.
    pub fn into_fields(self) -> MatchFields {
        MatchFields {
            date: self.date,
            time: self.time.flatten(),
            club: self.club,
            team: self.team,
            result: self.result.flatten(),
            status: self.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("unknown status '{0}', expected Pendiente, Ganado or Perdido")]
    InvalidStatus(String),
}

/// Row shape shared by the SQL backends; `status` is stored as its label.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchRow {
    pub id: i64,
    pub date: String,
    pub time: Option<String>,
    pub club: String,
    pub team: String,
    pub result: Option<String>,
    pub status: String,
}

impl TryFrom<MatchRow> for Match {
    type Error = StoreError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            status: row.status.parse()?,
            date: row.date,
            time: row.time,
            club: row.club,
            team: row.team,
            result: row.result,
        })
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Trims strings and treats `""` (and whitespace) the same as an absent value.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Only called when the key is present; `null` and blank become `Some(None)`.
fn present_blank_as_none<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(deserializer).map(Some)
}
