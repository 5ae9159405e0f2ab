//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or an explicit path), then applies
//! `COURSEBOT_BIND` and `COURSEBOT_LOG_LEVEL` env overrides. The provider API
//! key is only ever read from the environment.

use std::{env, fs, path::Path};

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::error::AppError;
use crate::logger;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the axum listener binds to.
    pub bind: String,
    /// Common prefix for all content and question routes (`""` or `/name`).
    pub path_prefix: String,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Upper bound on generated tokens per answer.
    pub max_tokens: u32,
    /// TCP connect timeout. The streamed body itself is never timed out.
    pub connect_timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`, `"groq"`).
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Validated level from `server.log_level` or `COURSEBOT_LOG_LEVEL`.
    pub log_level: LevelFilter,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` (or `GROQ_API_KEY`) — `None` for keyless
    /// local models. Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_path_prefix")]
    path_prefix: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    cors_origins: Vec<String>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path_prefix: default_path_prefix(),
            log_level: default_log_level(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_top_p")]
    top_p: f32,
    #[serde(default = "default_openai_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_openai_connect_timeout_seconds")]
    connect_timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            top_p: default_openai_top_p(),
            max_tokens: default_openai_max_tokens(),
            connect_timeout_seconds: default_openai_connect_timeout_seconds(),
        }
    }
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }
fn default_path_prefix() -> String { "/chatbot".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_openai_api_base_url() -> String { "https://api.groq.com/openai/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "llama-3.1-70b-versatile".to_string() }
fn default_openai_temperature() -> f32 { 0.5 }
fn default_openai_top_p() -> f32 { 1.0 }
fn default_openai_max_tokens() -> u32 { 1024 }
fn default_openai_connect_timeout_seconds() -> u64 { 10 }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from the given path, or `config/default.toml`, then apply
/// env-var overrides. Without an explicit path and without the default file,
/// built-in defaults are used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let bind_override = env::var("COURSEBOT_BIND").ok();
    let log_level_override = env::var("COURSEBOT_LOG_LEVEL").ok();

    let path = match config_path {
        Some(p) => Path::new(p),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Path::new(DEFAULT_CONFIG_PATH),
        None => {
            return resolve(
                RawConfig::default(),
                bind_override.as_deref(),
                log_level_override.as_deref(),
            );
        }
    };

    load_from(path, bind_override.as_deref(), log_level_override.as_deref())
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, bind_override, log_level_override)
}

fn resolve(
    parsed: RawConfig,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let s = parsed.server;
    let o = parsed.llm.openai;

    if o.max_tokens == 0 {
        return Err(AppError::Config("llm.openai.max_tokens must be greater than zero".into()));
    }
    let log_level = logger::parse_level(log_level_override.unwrap_or(&s.log_level))
        .map_err(|e| AppError::Config(format!("server.log_level: {e}")))?;

    Ok(Config {
        log_level,
        server: ServerConfig {
            bind: bind_override.unwrap_or(&s.bind).to_string(),
            path_prefix: normalize_prefix(&s.path_prefix),
            cors_origins: s.cors_origins,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: o.api_base_url,
                model: o.model,
                temperature: o.temperature,
                top_p: o.top_p,
                max_tokens: o.max_tokens,
                connect_timeout_seconds: o.connect_timeout_seconds,
            },
        },
        llm_api_key: env::var("LLM_API_KEY")
            .or_else(|_| env::var("GROQ_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty()),
    })
}

/// Normalise a route prefix to either `""` or `/segment[/segment…]` with no
/// trailing slash.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for tests — dummy LLM, no API keys, no external calls.
impl Config {
    pub fn test_default() -> Self {
        Self {
            log_level: LevelFilter::INFO,
            server: ServerConfig {
                bind: "127.0.0.1:0".into(),
                path_prefix: default_path_prefix(),
                cors_origins: Vec::new(),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    top_p: 1.0,
                    max_tokens: 16,
                    connect_timeout_seconds: 1,
                },
            },
            llm_api_key: None,
        }
    }
}
