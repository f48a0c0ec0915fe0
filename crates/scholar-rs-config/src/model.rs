//! Configuration schema for Scholar.

use serde::{Deserialize, Serialize};

/// Root config for the Scholar memory service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScholarConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl ScholarConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ScholarConfigBuilder {
        ScholarConfigBuilder::new()
    }
}

/// Builder for assembling a `ScholarConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ScholarConfigBuilder {
    config: ScholarConfig,
}

impl ScholarConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ScholarConfig::default(),
        }
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the LLM provider configuration.
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = llm;
        self
    }

    /// Replace the session history cache configuration.
    pub fn history(mut self, history: HistoryConfig) -> Self {
        self.config.history = history;
        self
    }

    pub fn build(self) -> ScholarConfig {
        self.config
    }
}

/// Memory store and lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MemoryConfig {
    /// SQLite database file. `None` uses `.scholar/memory.db` under the working directory.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

/// Embedding settings for the vector-capable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_enabled")]
    pub enabled: bool,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            enabled: default_embeddings_enabled(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

fn default_embeddings_enabled() -> bool {
    true
}

/// Output width of the Gemini text embedding model.
fn default_embedding_dimensions() -> usize {
    768
}

/// Heuristics used to locate an existing memory for an exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_prefix_chars")]
    pub prefix_chars: usize,
    #[serde(default = "default_overlap_ratio")]
    pub overlap_ratio: f32,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            prefix_chars: default_prefix_chars(),
            overlap_ratio: default_overlap_ratio(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_prefix_chars() -> usize {
    30
}

fn default_overlap_ratio() -> f32 {
    0.8
}

fn default_similarity_threshold() -> f32 {
    0.92
}

/// Recall sizing and the query used when the caller sends no query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    #[serde(default = "default_recall_limit")]
    pub limit: usize,
    #[serde(default = "default_recall_query")]
    pub default_query: String,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            limit: default_recall_limit(),
            default_query: default_recall_query(),
        }
    }
}

fn default_recall_limit() -> usize {
    5
}

fn default_recall_query() -> String {
    "learning progress and important concepts".to_string()
}

/// Course summary cadence and input window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_enabled")]
    pub enabled: bool,
    #[serde(default = "default_message_window")]
    pub message_window: usize,
    #[serde(default = "default_every_n_turns")]
    pub every_n_turns: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: default_summary_enabled(),
            message_window: default_message_window(),
            every_n_turns: default_every_n_turns(),
        }
    }
}

fn default_summary_enabled() -> bool {
    true
}

fn default_message_window() -> usize {
    30
}

fn default_every_n_turns() -> usize {
    10
}

/// LLM provider used for summaries and embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            temperature: None,
        }
    }
}

fn default_llm_provider() -> String {
    "google".to_string()
}

fn default_llm_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

/// Bounded per-session chat history cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
    #[serde(default = "default_history_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            ttl_secs: default_history_ttl_secs(),
        }
    }
}

fn default_history_capacity() -> usize {
    256
}

fn default_history_ttl_secs() -> u64 {
    3600
}
