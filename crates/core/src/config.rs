use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, rejecting values that do not parse.
fn profiled_env_parse<T>(profile: &str, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match profiled_env_opt(profile, key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub source: SourceConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub extraction: ExtractionConfig,
    pub geocoder: GeocoderConfig,
    pub postgres: PostgresConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ANTIRADAR_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("ANTIRADAR_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Ok(Self {
            profile: p.to_string(),
            source: SourceConfig::from_env_profiled(p)?,
            llm: LlmConfig::from_env_profiled(p)?,
            ollama: OllamaConfig::from_env_profiled(p),
            extraction: ExtractionConfig::from_env_profiled(p),
            geocoder: GeocoderConfig::from_env_profiled(p)?,
            postgres: PostgresConfig::from_env_profiled(p)?,
        })
    }

    /// Check that every setting the pipeline cannot run without is present.
    ///
    /// `needs_store` is false for dry runs, which never touch PostgreSQL.
    pub fn validate(&self, needs_store: bool) -> Result<(), ConfigError> {
        if self.source.gateway_url.is_none() {
            return Err(ConfigError::Missing("SOURCE_GATEWAY_URL"));
        }
        if self.source.credentials_path.is_none() {
            return Err(ConfigError::Missing("SOURCE_CREDENTIALS_PATH"));
        }
        if !self.llm.is_configured() {
            return Err(match self.llm.provider.as_str() {
                "openai" | "openrouter" => ConfigError::Missing("OPENAI_API_KEY"),
                other => ConfigError::Invalid {
                    key: "LLM_PROVIDER",
                    reason: format!("unknown provider '{}'", other),
                },
            });
        }
        if self.geocoder.default_town.trim().is_empty() {
            return Err(ConfigError::Missing("DEFAULT_TOWN"));
        }
        if needs_store && !self.postgres.is_configured() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  source:      gateway={}",
            self.source.gateway_url.as_deref().unwrap_or("(none)")
        );
        tracing::info!("  llm:         provider={}, model={}", self.llm.provider, self.llm.model_name(&self.ollama));
        tracing::info!("  extraction:  prompt={}", self.extraction.prompt_path.display());
        tracing::info!(
            "  geocoder:    url={}, region={}, default_town={}",
            self.geocoder.nominatim_url, self.geocoder.region, self.geocoder.default_town
        );
        tracing::info!("  postgres:    host={}, db={}", self.postgres.host, self.postgres.database);
    }
}

// ── Message source ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// WebSocket endpoint of the chat gateway.
    pub gateway_url: Option<String>,
    /// JSON cookie jar holding the session credentials.
    pub credentials_path: Option<PathBuf>,
    pub handshake_timeout_secs: u64,
}

impl SourceConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            gateway_url: profiled_env_opt(p, "SOURCE_GATEWAY_URL"),
            credentials_path: profiled_env_opt(p, "SOURCE_CREDENTIALS_PATH").map(PathBuf::from),
            handshake_timeout_secs: profiled_env_parse(p, "SOURCE_HANDSHAKE_TIMEOUT_SECS", 10)?,
        })
    }
}

// ── LLM (OpenAI-compatible / Ollama) ──────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" (any OpenAI-compatible endpoint, OpenRouter by default) or "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "openai").to_lowercase(),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY")
                .or_else(|| profiled_env_opt(p, "OPEN_ROUTER_API")),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "google/gemini-2.5-pro-exp-03-25:free"),
            openai_base_url: profiled_env_or(p, "OPENAI_BASE_URL", "https://openrouter.ai/api"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.1)?,
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 512)?,
            timeout_secs: profiled_env_parse(p, "LLM_TIMEOUT_SECS", 60)?,
        })
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" | "openrouter" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }

    fn model_name<'a>(&'a self, ollama: &'a OllamaConfig) -> &'a str {
        match self.provider.as_str() {
            "ollama" => &ollama.model,
            _ => &self.openai_model,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2"),
        }
    }
}

// ── Extraction prompt ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub prompt_path: PathBuf,
}

impl ExtractionConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            prompt_path: PathBuf::from(profiled_env_or(
                p,
                "EXTRACTION_PROMPT_PATH",
                "prompts/extract-location.md",
            )),
        }
    }

    /// Read the instruction prompt, failing eagerly if it is missing or blank.
    pub fn load_prompt(&self) -> Result<String, ConfigError> {
        load_prompt(&self.prompt_path)
    }
}

fn load_prompt(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key: "EXTRACTION_PROMPT_PATH",
            reason: format!("prompt file {} is empty", path.display()),
        });
    }
    Ok(content)
}

// ── Geocoder (Nominatim) ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub nominatim_url: String,
    pub user_agent: String,
    /// Appended to composite addresses to disambiguate common street names.
    pub region: String,
    /// Town recorded when extraction yields none.
    pub default_town: String,
    pub timeout_secs: u64,
}

impl GeocoderConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            nominatim_url: profiled_env_or(p, "NOMINATIM_URL", "https://nominatim.openstreetmap.org"),
            user_agent: profiled_env_or(p, "GEOCODER_USER_AGENT", "Antiradar"),
            region: profiled_env_or(p, "GENERAL_LOCATION", "Lubuskie, Poland"),
            default_town: profiled_env_or(p, "DEFAULT_TOWN", "Zielona Góra"),
            timeout_secs: profiled_env_parse(p, "GEOCODER_TIMEOUT_SECS", 10)?,
        })
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            url: profiled_env_opt(p, "DATABASE_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_parse(p, "PG_PORT", 5432)?,
            database: profiled_env_or(p, "PG_DATABASE", "antiradar"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_parse(p, "PG_MAX_CONNECTIONS", 5)?,
        })
    }

    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}
