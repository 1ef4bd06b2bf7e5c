use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub max_overflow: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated origin whitelist.
    pub allowed_origins: String,
}

impl WebConfig {
    pub fn origins_list(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "remote" or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

/// Bounds applied by the validator and the executor.
#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    pub timeout_seconds: u64,
    pub max_result_rows: usize,
    pub max_query_length: usize,
    pub max_retries: u32,
    pub default_limit: u64,
    pub max_limit: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub debug: bool,
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub query: QueryConfig,
    pub prompts_dir: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl AppConfig {
    /// Defaults → optional config file → environment → CLI flags, each layer
    /// overriding the previous one.
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("debug", false)?
            .set_default("database.url", "nl-teller.db")?
            .set_default("database.pool_size", 5)?
            .set_default("database.max_overflow", 10)?
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 8000)?
            .set_default("web.allowed_origins", "http://localhost:3000")?
            .set_default("llm.backend", "remote")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.api_url", "https://api.openai.com/v1/chat/completions")?
            .set_default("query.timeout_seconds", 30)?
            .set_default("query.max_result_rows", 1000)?
            .set_default("query.max_query_length", 5000)?
            .set_default("query.max_retries", 2)?
            .set_default("query.default_limit", 100)?
            .set_default("query.max_limit", 1000)?
            .set_default("prompts_dir", "prompts")?;

        if let Some(config_path) = &args.config {
            builder = builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = ["config.toml", "config/config.toml", "/etc/nl-teller/config.toml"];
            for location in default_locations {
                if Path::new(location).exists() {
                    builder = builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        builder = builder
            .set_override_option("debug", env_var("DEBUG"))?
            .set_override_option("database.url", env_var("DATABASE_URL"))?
            .set_override_option("database.pool_size", env_var("DB_POOL_SIZE"))?
            .set_override_option("database.max_overflow", env_var("DB_MAX_OVERFLOW"))?
            .set_override_option("web.host", env_var("HOST"))?
            .set_override_option("web.port", env_var("PORT"))?
            .set_override_option("web.allowed_origins", env_var("ALLOWED_ORIGINS"))?
            .set_override_option("llm.backend", env_var("LLM_BACKEND"))?
            .set_override_option("llm.model", env_var("LLM_MODEL"))?
            .set_override_option("llm.api_key", env_var("LLM_API_KEY"))?
            .set_override_option("llm.api_url", env_var("LLM_API_URL"))?
            .set_override_option("query.timeout_seconds", env_var("QUERY_TIMEOUT_SECONDS"))?
            .set_override_option("query.max_result_rows", env_var("MAX_RESULT_ROWS"))?
            .set_override_option("query.max_query_length", env_var("MAX_QUERY_LENGTH"))?
            .set_override_option("query.max_retries", env_var("MAX_RETRIES"))?
            .set_override_option("query.default_limit", env_var("DEFAULT_LIMIT"))?
            .set_override_option("query.max_limit", env_var("MAX_LIMIT"))?
            .set_override_option("prompts_dir", env_var("PROMPTS_DIR"))?;

        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }

        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_list_splits_and_trims() {
        let web = WebConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: "http://localhost:3000, https://bank.example.com ,".to_string(),
        };
        assert_eq!(
            web.origins_list(),
            vec!["http://localhost:3000", "https://bank.example.com"]
        );
    }
}
