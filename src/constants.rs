pub const SERVER_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://matches.db?mode=rwc";
pub const DEFAULT_CORS_ORIGINS: &str = "*";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

pub const DEFAULT_SERVICE_NAME: &str = "matchlog-api";
pub const DEFAULT_TRACER_NAME: &str = "matchlog-tracer";
pub const DEFAULT_LOG_FILTER: &str = "matchlog=debug,tower_http=debug,axum=debug,sqlx=info,info";

pub const MATCHES_ROUTE: &str = "/api/matches";
pub const MATCH_BY_ID_ROUTE: &str = "/api/matches/{id}";
pub const MATCHES_TABLE: &str = "matches";

// generic messages returned to callers on store failure; details only go to the log
pub const MSG_LIST_FAILED: &str = "failed to fetch matches";
pub const MSG_CREATE_FAILED: &str = "failed to save match";
pub const MSG_UPDATE_FAILED: &str = "failed to update match";
pub const MSG_DELETE_FAILED: &str = "failed to delete match";
pub const MSG_DELETED: &str = "match deleted";
pub const MSG_FETCH_BANNER: &str = "Could not load matches. Please try again.";

/// 6 weeks of 7 days
pub const CALENDAR_CELLS: usize = 42;
