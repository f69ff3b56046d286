use std::env;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BODY_LIMIT_MB: usize = 32;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
#[cfg(feature = "imgly")]
pub const DEFAULT_REMOVER_BACKEND: &str = "imgly";
#[cfg(not(feature = "imgly"))]
pub const DEFAULT_REMOVER_BACKEND: &str = "command";
pub const DEFAULT_REMOVER_COMMAND: &str = "rembg i {input} {output}";
pub const DEFAULT_IMGLY_MODEL_URL: &str = "https://huggingface.co/imgly/isnet-general-onnx";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub use_metadata_server: bool,
}

#[derive(Debug, Clone)]
pub struct RemoverConfig {
    pub backend: Option<String>,
    pub command: Option<String>,
    pub imgly_model_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub temp_dir: Option<PathBuf>,
    pub body_limit_mb: Option<usize>,
    pub gateway_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub gemini: Option<GeminiConfig>,
    pub remover: Option<RemoverConfig>,
}

fn env_flag(name: &str) -> bool {
    env::var(name).ok().map_or(false, |val| parse_flag(&val))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            model: None,
            endpoint: None,
            api_key: None,
            access_token: None,
            use_metadata_server: false,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let model = non_empty(env::var("GEMINI_MODEL").ok());
        let endpoint = non_empty(env::var("GEMINI_ENDPOINT").ok());
        let api_key = non_empty(env::var("GEMINI_API_KEY").ok());
        let access_token = non_empty(env::var("GOOGLE_ACCESS_TOKEN").ok());
        let use_metadata_server = env_flag("GEMINI_USE_METADATA_SERVER");

        GeminiConfig {
            model,
            endpoint,
            api_key,
            access_token,
            use_metadata_server,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_metadata_server(mut self, enabled: bool) -> Self {
        self.use_metadata_server = enabled;
        self
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    pub fn endpoint_or_default(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_ENDPOINT)
            .trim_end_matches('/')
    }

    /// Full `generateContent` URL for the configured model.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint_or_default(),
            self.model_or_default()
        )
    }
}

impl Default for RemoverConfig {
    fn default() -> Self {
        RemoverConfig {
            backend: None,
            command: None,
            imgly_model_url: None,
        }
    }
}

impl RemoverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        RemoverConfig {
            backend: non_empty(env::var("INSTAFY_REMOVER").ok()),
            command: non_empty(env::var("INSTAFY_REMOVER_CMD").ok()),
            imgly_model_url: non_empty(env::var("INSTAFY_IMGLY_MODEL_URL").ok()),
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_imgly_model_url(mut self, url: impl Into<String>) -> Self {
        self.imgly_model_url = Some(url.into());
        self
    }

    pub fn backend_or_default(&self) -> &str {
        self.backend.as_deref().unwrap_or(DEFAULT_REMOVER_BACKEND)
    }

    pub fn command_or_default(&self) -> &str {
        self.command.as_deref().unwrap_or(DEFAULT_REMOVER_COMMAND)
    }

    pub fn imgly_model_url_or_default(&self) -> &str {
        self.imgly_model_url
            .as_deref()
            .unwrap_or(DEFAULT_IMGLY_MODEL_URL)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: None,
            port: None,
            temp_dir: None,
            body_limit_mb: None,
            gateway_url: None,
            output_dir: None,
            gemini: None,
            remover: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let host = non_empty(env::var("HOST").ok());
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let temp_dir = non_empty(env::var("INSTAFY_TMP_DIR").ok()).map(PathBuf::from);
        let body_limit_mb = env::var("INSTAFY_BODY_LIMIT_MB")
            .ok()
            .and_then(|limit| limit.parse().ok());
        let gateway_url = non_empty(env::var("INSTAFY_GATEWAY_URL").ok());
        let output_dir = non_empty(env::var("INSTAFY_OUTPUT_DIR").ok()).map(PathBuf::from);

        Config {
            host,
            port,
            temp_dir,
            body_limit_mb,
            gateway_url,
            output_dir,
            gemini: Some(GeminiConfig::from_env()),
            remover: Some(RemoverConfig::from_env()),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_body_limit_mb(mut self, limit: usize) -> Self {
        self.body_limit_mb = Some(limit);
        self
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = Some(config);
        self
    }

    pub fn with_remover(mut self, config: RemoverConfig) -> Self {
        self.remover = Some(config);
        self
    }

    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn temp_dir_or_default(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(env::temp_dir)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb
            .unwrap_or(DEFAULT_BODY_LIMIT_MB)
            .saturating_mul(1024 * 1024)
    }

    /// Gateway endpoint the pipeline posts to when none was configured.
    pub fn gateway_url_or_default(&self) -> String {
        self.gateway_url.clone().unwrap_or_else(|| {
            format!(
                "http://{}:{}/api/gemini-edit",
                self.host_or_default(),
                self.port_or_default()
            )
        })
    }
}
