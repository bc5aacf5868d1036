use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub tts: TtsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// Directory all file-handler operations are confined to.
    /// Created at startup if it does not exist.
    #[serde(default = "default_sandbox_root")]
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_provider")]
    pub provider: String,
    /// Supports ${ENV_VAR} substitution
    pub api_key: String,
    #[serde(default = "default_max_results")]
    pub max_results: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TtsConfig {
    /// Synthesis voice identifier (fixed per deployment, not caller-supplied).
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_sandbox_root() -> PathBuf {
    PathBuf::from("./sandbox")
}

fn default_search_provider() -> String {
    "tavily".to_string()
}

fn default_max_results() -> u8 {
    8
}

fn default_voice() -> String {
    "en-GB-LibbyNeural".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: default_sandbox_root(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
        }
    }
}

impl ServerConfig {
    /// Socket address string the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${TAVILY_API_KEY}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }
}
