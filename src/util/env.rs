//! Process configuration read from the environment (and an optional `.env` file).
//!
//! Values are deserialized straight into [`Config`] through a small serde deserializer in the
//! style of the [`envy`] crate, so field renames and defaults are driven by the usual derive
//! attributes.
//!
//! [`envy`]: https://github.com/softprops/envy

use std::ffi::OsString;
use std::sync::LazyLock;

use serde::Deserialize;
use serde::de::value::MapDeserializer;
use serde::de::{self, IntoDeserializer};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_CORS_ORIGINS, DEFAULT_DATABASE_URL, DEFAULT_SERVICE_NAME,
    DEFAULT_TRACER_NAME, SERVER_PORT,
};

static CONFIG: LazyLock<OnceCell<Config>> = LazyLock::new(OnceCell::new);

/// Returns the process-wide configuration, reading the environment on first use.
pub async fn config() -> EnvResult<&'static Config> {
    CONFIG.get_or_try_init(|| async { Config::new() }).await
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    #[serde(default)]
    pub store_backend: Backend,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    #[serde(default = "default_port")]
    pub server_api_port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_allow_origins: String,
    /// `strict-existence-checking`: when set, updates and deletes aimed at a missing id are
    /// answered with 404 instead of being reported as successful.
    #[serde(default)]
    pub strict_existence_checking: bool,
    pub otel_exporter_otlp_endpoint: Option<String>,
    #[serde(default = "default_service_name")]
    pub api_service_name: String,
    #[serde(default = "default_tracer_name")]
    pub api_tracer_name: String,
    #[serde(default = "default_api_url")]
    pub matchlog_api_url: String,
}

impl Config {
    pub fn new() -> EnvResult<Self> {
        // a missing .env file is fine, the process environment still applies
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(e.into());
        }

        Ok(from_iter::<_, Config>(utf8_vars(std::env::vars_os()))?)
    }
}

/// Which [`MatchStore`](crate::db::MatchStore) implementation backs the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Postgres,
    Supabase,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

const fn default_port() -> u16 {
    SERVER_PORT
}

fn default_cors_origins() -> String {
    DEFAULT_CORS_ORIGINS.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_tracer_name() -> String {
    DEFAULT_TRACER_NAME.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

// ---
//  Deserializer implementation
// ---

/// A single variable's value, kept alongside its name for error messages.
struct Value {
    name: String,
    raw: String,
}

/// A variable's name, used as the struct field identifier.
struct Name(String);

impl<'de> IntoDeserializer<'de, EnvDeserializeError> for Value {
    type Deserializer = Self;
    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

impl<'de> IntoDeserializer<'de, EnvDeserializeError> for Name {
    type Deserializer = Self;
    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

macro_rules! parse_primitive {
    ($($ty:ident => $method:ident,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, EnvDeserializeError>
            where
                V: de::Visitor<'de>,
            {
                match self.raw.trim().parse::<$ty>() {
                    Ok(val) => val.into_deserializer().$method(visitor),
                    Err(e) => Err(EnvDeserializeError::Parse {
                        name: self.name,
                        value: self.raw,
                        reason: e.to_string(),
                    }),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = EnvDeserializeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.raw.into_deserializer().deserialize_any(visitor)
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => visitor.visit_bool(true),
            "" | "0" | "false" | "off" | "no" => visitor.visit_bool(false),
            _ => Err(EnvDeserializeError::Parse {
                name: self.name,
                value: self.raw,
                reason: String::from("expected one of true/false, on/off, yes/no, 1/0"),
            }),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        if self.raw.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_enum<V>(
        self,
        _: &'static str,
        _: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_enum(self.raw.trim().to_ascii_lowercase().into_deserializer())
    }

    fn deserialize_newtype_struct<V>(
        self,
        _: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    parse_primitive! {
        u8 => deserialize_u8,
        u16 => deserialize_u16,
        u32 => deserialize_u32,
        u64 => deserialize_u64,
        i8 => deserialize_i8,
        i16 => deserialize_i16,
        i32 => deserialize_i32,
        i64 => deserialize_i64,
        f32 => deserialize_f32,
        f64 => deserialize_f64,
    }

    serde::forward_to_deserialize_any! {
        char str string unit bytes byte_buf map seq
        unit_struct tuple_struct identifier tuple
        ignored_any struct
    }
}

impl<'de> de::Deserializer<'de> for Name {
    type Error = EnvDeserializeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.0.into_deserializer().deserialize_any(visitor)
    }

    serde::forward_to_deserialize_any! {
        char str string unit seq option bytes byte_buf map newtype_struct
        unit_struct tuple_struct identifier tuple ignored_any
        bool u8 u16 u32 u64 i8 i16 i32 i64 f32 f64 enum struct
    }
}

/// Drops pairs whose name or value is not valid UTF-8; no config field can be read from them.
fn utf8_vars<Iter>(iter: Iter) -> impl Iterator<Item = (String, String)>
where
    Iter: IntoIterator<Item = (OsString, OsString)>,
{
    iter.into_iter()
        .filter_map(|(name, raw)| Some((name.into_string().ok()?, raw.into_string().ok()?)))
}

/// Deserializes `T` from `(NAME, value)` pairs; unknown names are ignored by the derive.
pub fn from_iter<Iter, T>(iter: Iter) -> Result<T, EnvDeserializeError>
where
    T: de::DeserializeOwned,
    Iter: IntoIterator<Item = (String, String)>,
{
    let pairs = iter
        .into_iter()
        .map(|(name, raw)| (Name(name.clone()), Value { name, raw }));

    T::deserialize(MapDeserializer::new(pairs))
}

impl de::Error for EnvDeserializeError {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        EnvDeserializeError::Custom(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        EnvDeserializeError::MissingValue(field.into())
    }
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error(transparent)]
    Dotenvy(#[from] dotenvy::Error),

    #[error(transparent)]
    DeserializationError(#[from] EnvDeserializeError),
}

#[derive(Debug, Error)]
pub enum EnvDeserializeError {
    #[error("env deserialization error: {0}")]
    Custom(String),

    #[error("missing environment variable {0}")]
    MissingValue(String),

    #[error("{name}={value:?}: {reason}")]
    Parse {
        name: String,
        value: String,
        reason: String,
    },
}
