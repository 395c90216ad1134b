//! Embedding model identity shared by the provisioning and query paths.

/// Identity and mapping parameters of the embedding model an index
/// provisions.
///
/// One shared default exists per deployment. Pass an alternate to
/// [`crate::search::Index::new`] to pin a different model; there is no
/// process-wide state to mutate.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Model group the model is registered under.
    pub group_name: String,
    /// Fully qualified model name in the backend's model repository.
    pub model_name: String,
    pub model_version: String,
    pub model_format: String,
    /// Output dimensionality; the generated vector mappings must match.
    pub dimension: u32,
    /// Similarity engine backing the generated vector fields.
    pub engine: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            group_name: "default_model_group".to_string(),
            model_name: "huggingface/sentence-transformers/all-MiniLM-L12-v2".to_string(),
            model_version: "1.0.1".to_string(),
            model_format: "TORCH_SCRIPT".to_string(),
            dimension: 384,
            engine: "lucene".to_string(),
        }
    }
}
