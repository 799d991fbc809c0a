use crate::embedding::EmbedderSettings;
use crate::qdrant::StoreSettings;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_EMBEDDING_MODEL: &str = "intfloat/multilingual-e5-large";
const DEFAULT_HUGGINGFACE_URL: &str = "https://router.huggingface.co/hf-inference/models";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Rusty Search service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for chunk storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Bearer token for the hosted embedding endpoint.
    pub embedding_api_key: Option<String>,
    /// Optional override for the embedding endpoint base URL.
    pub embedding_url: Option<String>,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Longest input, in characters, sent to the embedding backend.
    pub embedding_max_chars: usize,
    /// Upper bound on chunk length, in characters.
    pub text_splitter_chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Minimum similarity accepted from Qdrant searches.
    pub search_score_threshold: f32,
    /// Directory scanned at startup and used to store uploads.
    pub data_dir: PathBuf,
    /// Whether the server starts a background indexing pass on boot.
    pub index_on_startup: bool,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends for the processing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted Hugging Face inference endpoint.
    HuggingFace,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as absent so that an empty line in `.env` falls back to the
    /// default instead of failing to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingVariable(key.into()));

        let embedding_provider = match get("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))?,
            None => EmbeddingProvider::HuggingFace,
        };
        let embedding_api_key = get("EMBEDDING_API_KEY");
        if embedding_provider == EmbeddingProvider::HuggingFace && embedding_api_key.is_none() {
            return Err(ConfigError::MissingVariable("EMBEDDING_API_KEY".into()));
        }

        let config = Self {
            qdrant_url: require("QDRANT_URL")?,
            qdrant_collection_name: require("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: get("QDRANT_API_KEY"),
            embedding_provider,
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_api_key,
            embedding_url: get("EMBEDDING_URL"),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", get("EMBEDDING_DIMENSION"), 1024)?,
            embedding_max_chars: parse_or("EMBEDDING_MAX_CHARS", get("EMBEDDING_MAX_CHARS"), 2000)?,
            text_splitter_chunk_size: parse_or(
                "TEXT_SPLITTER_CHUNK_SIZE",
                get("TEXT_SPLITTER_CHUNK_SIZE"),
                1000,
            )?,
            text_splitter_chunk_overlap: parse_or(
                "TEXT_SPLITTER_CHUNK_OVERLAP",
                get("TEXT_SPLITTER_CHUNK_OVERLAP"),
                300,
            )?,
            search_score_threshold: parse_or(
                "SEARCH_SCORE_THRESHOLD",
                get("SEARCH_SCORE_THRESHOLD"),
                0.6,
            )?,
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            index_on_startup: get("INDEX_ON_STARTUP")
                .map(|value| parse_flag("INDEX_ON_STARTUP", &value))
                .transpose()?
                .unwrap_or(true),
            server_port: get("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };

        if config.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if config.embedding_max_chars == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_MAX_CHARS".into()));
        }
        if config.text_splitter_chunk_overlap >= config.text_splitter_chunk_size {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_OVERLAP".into()));
        }

        Ok(config)
    }

    /// Base URL of the embedding backend, falling back to the provider default.
    pub fn embedding_base_url(&self) -> &str {
        match (&self.embedding_url, self.embedding_provider) {
            (Some(url), _) => url,
            (None, EmbeddingProvider::HuggingFace) => DEFAULT_HUGGINGFACE_URL,
            (None, EmbeddingProvider::Ollama) => DEFAULT_OLLAMA_URL,
        }
    }

    /// Connection settings handed to the Qdrant client.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            url: self.qdrant_url.clone(),
            collection: self.qdrant_collection_name.clone(),
            api_key: self.qdrant_api_key.clone(),
            vector_size: self.embedding_dimension,
            score_threshold: self.search_score_threshold,
        }
    }

    /// Input and output constraints enforced around the embedding backend.
    pub fn embedder_settings(&self) -> EmbedderSettings {
        EmbedderSettings {
            dimension: self.embedding_dimension,
            max_chars: self.embedding_max_chars,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        data_dir = %config.data_dir.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
