//! Runtime configuration for chat-relay.
//!
//! Configuration is loaded from a JSON file; every section has defaults so a
//! partial (or missing) file works. The upstream API key itself never lives
//! here, only the name of the environment variable that holds it.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::tools::ToolDefinition;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-relay", about = "Streaming chat relay for OpenAI-compatible APIs")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "relay.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides `server.listen`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    pub log_json: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream completion provider.
    pub upstream: UpstreamConfig,

    /// Tools advertised to the model.
    pub tools: ToolsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8000").
    pub listen: String,

    /// Attach a permissive CORS layer (for UIs served from another origin).
    pub allow_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
            allow_cors: false,
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API, without `/chat/completions`.
    pub base_url: String,

    /// Model requested for every completion.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Ask the provider to append a usage-only chunk to the stream.
    pub include_usage: bool,

    /// Connection establishment timeout in seconds (0 = none).
    pub connect_timeout_secs: u64,

    /// Longest silence tolerated between reads of a response, in seconds
    /// (0 = none). Long generations are fine as long as chunks keep coming.
    pub idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            include_usage: true,
            connect_timeout_secs: 10,
            idle_timeout_secs: 120,
        }
    }
}

/// Tool registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Register the built-in `get_current_weather` tool.
    pub builtin_weather: bool,

    /// Base URL of the Open-Meteo forecast API.
    pub weather_base_url: String,

    /// Extra tool definitions forwarded to the model. They have no local
    /// executor, so calls to them are streamed to the client only.
    pub extra: Vec<ToolDefinition>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            builtin_weather: true,
            weather_base_url: "https://api.open-meteo.com".to_string(),
            extra: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Effective listen address: the CLI flag wins over the file.
    pub fn listen_addr(&self, cli: &Cli) -> String {
        cli.listen
            .clone()
            .unwrap_or_else(|| self.server.listen.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.upstream.model, "gpt-4o");
        assert_eq!(cfg.upstream.api_key_env, "OPENAI_API_KEY");
        assert!(cfg.tools.builtin_weather);
        assert_eq!(cfg.upstream.connect_timeout_secs, 10);
        assert_eq!(cfg.upstream.idle_timeout_secs, 120);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"upstream": {{"model": "gpt-4o-mini"}}, "server": {{"allow_cors": true}}}}"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.upstream.model, "gpt-4o-mini");
        assert_eq!(cfg.upstream.base_url, "https://api.openai.com/v1");
        assert!(cfg.server.allow_cors);
        assert_eq!(cfg.server.listen, "0.0.0.0:8000");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg.server.listen, "0.0.0.0:8000");
    }

    #[test]
    fn test_cli_listen_overrides_file() {
        let cfg = Config::default();
        let cli = Cli::parse_from(["chat-relay", "--listen", "127.0.0.1:9000"]);
        assert_eq!(cfg.listen_addr(&cli), "127.0.0.1:9000");

        let cli = Cli::parse_from(["chat-relay"]);
        assert_eq!(cfg.listen_addr(&cli), "0.0.0.0:8000");
        assert!(!cli.log_json);
    }

    #[test]
    fn test_cli_log_json_flag() {
        let cli = Cli::parse_from(["chat-relay", "--log-json", "-v"]);
        assert!(cli.log_json);
        assert!(cli.verbose);
    }
}
