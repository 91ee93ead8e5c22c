//! Embedding backends.
//!
//! Every implementation returns L2-normalized vectors so that the index can
//! treat vector distance as cosine-equivalent regardless of backend.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    pub embeddings: Vec<Vec<f32>>,
    pub model: String,
    pub dimensions: usize,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one normalized vector per input, input order
    /// preserved.
    async fn embed(&self, texts: &[String]) -> Result<EmbeddingBatch>;
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
}

/// Scale a vector to unit L2 norm. Zero vectors are returned unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible embeddings endpoint
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String, model: String, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key,
            model,
            dimensions,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch {
                embeddings: Vec::new(),
                model: self.model.clone(),
                dimensions: self.dimensions,
            });
        }

        let endpoint = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let request = ApiEmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
            encoding_format: "float".to_string(),
        };

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ApiEmbeddingResponse = response.json().await?;
        let model = parsed.model.clone();
        let mut embeddings = extract_ordered_embeddings(parsed)?;

        if embeddings.len() != texts.len() {
            return Err(anyhow!(
                "embedding count mismatch: expected {}, got {}",
                texts.len(),
                embeddings.len()
            ));
        }
        if embeddings.iter().any(|e| e.len() != self.dimensions) {
            return Err(anyhow!(
                "embedding dimensions mismatch with configured dimensions {}",
                self.dimensions
            ));
        }

        for e in &mut embeddings {
            l2_normalize(e);
        }

        Ok(EmbeddingBatch {
            embeddings,
            model,
            dimensions: self.dimensions,
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApiEmbeddingRequest {
    model: String,
    input: Vec<String>,
    encoding_format: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiEmbeddingResponse {
    data: Vec<ApiEmbeddingData>,
    model: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

fn extract_ordered_embeddings(response: ApiEmbeddingResponse) -> Result<Vec<Vec<f32>>> {
    let mut data = response.data;
    data.sort_by_key(|item| item.index);

    for (expected, item) in data.iter().enumerate() {
        if item.index != expected {
            return Err(anyhow!(
                "missing or duplicated embedding index: expected {}, got {}",
                expected,
                item.index
            ));
        }
    }

    Ok(data.into_iter().map(|item| item.embedding).collect())
}

// ---------------------------------------------------------------------------
// Stub provider (deterministic, offline)
// ---------------------------------------------------------------------------

/// Hashed bag-of-words embeddings for tests and offline runs. Each lowercased
/// token is hashed onto a dimension, so texts sharing vocabulary land near
/// each other while unrelated texts stay apart. Deterministic and normalized
/// like the real providers.
#[derive(Clone)]
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn token_dim(&self, token: &str) -> usize {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let hash = hasher.finalize();
        let value = u64::from_le_bytes([
            hash[0], hash[1], hash[2], hash[3], hash[4], hash[5], hash[6], hash[7],
        ]);
        (value % self.dims as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            v[self.token_dim(&token)] += 1.0;
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        let embeddings = texts.iter().map(|text| self.embed_one(text)).collect();

        Ok(EmbeddingBatch {
            embeddings,
            model: "stub".to_string(),
            dimensions: self.dims,
        })
    }

    fn model_id(&self) -> &str {
        "stub"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_provider_returns_correct_dims() {
        let provider = StubEmbeddingProvider::new(8);
        let result = provider.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(result.embeddings.len(), 1);
        assert_eq!(result.embeddings[0].len(), 8);
    }

    #[tokio::test]
    async fn stub_provider_deterministic() {
        let provider = StubEmbeddingProvider::new(6);
        let inputs = vec!["same input".to_string()];
        let first = provider.embed(&inputs).await.unwrap();
        let second = provider.embed(&inputs).await.unwrap();
        assert_eq!(first.embeddings, second.embeddings);
    }

    #[tokio::test]
    async fn stub_vectors_are_unit_norm() {
        let provider = StubEmbeddingProvider::new(16);
        let result = provider.embed(&["normalize me".to_string()]).await.unwrap();
        let norm: f32 = result.embeddings[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn stub_shared_vocabulary_is_closer_than_disjoint() {
        let provider = StubEmbeddingProvider::new(64);
        let texts = vec![
            "scholarship application deadline".to_string(),
            "scholarship forms and deadline".to_string(),
            "hostel mess timings".to_string(),
        ];
        let batch = provider.embed(&texts).await.unwrap();
        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        let related = dot(&batch.embeddings[0], &batch.embeddings[1]);
        let unrelated = dot(&batch.embeddings[0], &batch.embeddings[2]);
        assert!(
            related > unrelated,
            "related {related} should beat unrelated {unrelated}"
        );
    }

    #[test]
    fn l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0_f32; 4];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn response_reordered_by_index() {
        let response = ApiEmbeddingResponse {
            data: vec![
                ApiEmbeddingData {
                    embedding: vec![0.9, 0.8],
                    index: 1,
                },
                ApiEmbeddingData {
                    embedding: vec![0.1, 0.2],
                    index: 0,
                },
            ],
            model: "text-embedding-3-small".to_string(),
        };
        let ordered = extract_ordered_embeddings(response).unwrap();
        assert_eq!(ordered[0], vec![0.1, 0.2]);
        assert_eq!(ordered[1], vec![0.9, 0.8]);
    }

    #[test]
    fn response_with_gap_rejected() {
        let response = ApiEmbeddingResponse {
            data: vec![ApiEmbeddingData {
                embedding: vec![0.1],
                index: 2,
            }],
            model: "m".to_string(),
        };
        assert!(extract_ordered_embeddings(response).is_err());
    }
}
