//! Persistent semantic index over the knowledge base.
//!
//! Chunks live in SQLite with their embeddings; sqlite-vec provides the
//! nearest-neighbor lookup. On open, an existing index is reused as long as
//! it was produced by the same embedding model; otherwise it is rebuilt from
//! the documents on disk. [`KnowledgeIndex::rebuild`] always re-ingests and
//! returns a fresh instance, so callers can publish it atomically (the
//! pipeline keeps the handle in an `ArcSwap`) while in-flight queries finish
//! on the old one.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use tracing::info;

use sahayak_provider::EmbeddingProvider;
use sahayak_schema::SourceKind;

use crate::chunker::{split_text, ChunkerConfig};
use crate::documents::load_documents;

/// Embedding batch size during ingest.
const EMBED_BATCH: usize = 64;

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub data_dir: PathBuf,
    /// `None` keeps the index in memory (tests, ephemeral runs).
    pub db_path: Option<PathBuf>,
    pub chunking: ChunkerConfig,
}

impl IndexConfig {
    pub fn new(data_dir: impl Into<PathBuf>, db_path: Option<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            db_path,
            chunking: ChunkerConfig::default(),
        }
    }
}

/// A chunk as stored in (and retrieved from) the index.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub text: String,
    pub kind: SourceKind,
    pub category: String,
    pub origin: String,
}

#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: IndexedChunk,
    /// Cosine-equivalent relevance in [0, 1], higher is better.
    pub score: f32,
}

pub struct KnowledgeIndex {
    db: Arc<Mutex<Connection>>,
    config: IndexConfig,
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Register sqlite-vec. Must run before `Connection::open`.
fn init_sqlite_vec() {
    use rusqlite::ffi::{sqlite3, sqlite3_api_routines, sqlite3_auto_extension};

    type Sqlite3AutoExtFn =
        unsafe extern "C" fn(*mut sqlite3, *mut *mut i8, *const sqlite3_api_routines) -> i32;

    unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute::<*const (), Sqlite3AutoExtFn>(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    }
}

fn open_connection(config: &IndexConfig) -> Result<Connection> {
    init_sqlite_vec();
    let conn = match &config.db_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(path)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn
        }
        None => Connection::open_in_memory()?,
    };
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            category TEXT NOT NULL,
            origin TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding TEXT NOT NULL
        );
        "#,
    )?;
    Ok(conn)
}

impl KnowledgeIndex {
    /// Load the persisted index, building it from the documents when it is
    /// empty or was embedded with a different model.
    pub async fn open(config: IndexConfig, provider: &dyn EmbeddingProvider) -> Result<Self> {
        let index = Self {
            db: Arc::new(Mutex::new(open_connection(&config)?)),
            config,
        };

        let (count, stored_model) = {
            let conn = index.lock()?;
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
            let model: Option<String> = conn
                .query_row(
                    "SELECT value FROM meta WHERE key = 'embedding_model'",
                    [],
                    |r| r.get(0),
                )
                .optional()?;
            (count, model)
        };

        if count > 0 && stored_model.as_deref() == Some(provider.model_id()) {
            info!(chunks = count, "loaded existing knowledge index");
            return Ok(index);
        }

        if count > 0 {
            info!(
                stored = stored_model.as_deref().unwrap_or("none"),
                current = provider.model_id(),
                "embedding model changed, rebuilding index"
            );
        }
        index.ingest(provider).await?;
        Ok(index)
    }

    /// Discard any persisted content and re-ingest from the documents.
    /// Returns a new instance; the caller swaps it in while readers drain on
    /// the old one.
    pub async fn rebuild(config: IndexConfig, provider: &dyn EmbeddingProvider) -> Result<Self> {
        let index = Self {
            db: Arc::new(Mutex::new(open_connection(&config)?)),
            config,
        };
        index.ingest(provider).await?;
        Ok(index)
    }

    async fn ingest(&self, provider: &dyn EmbeddingProvider) -> Result<usize> {
        let data_dir = self.config.data_dir.clone();
        let chunking = self.config.chunking.clone();

        let rows: Vec<IndexedChunk> = task::spawn_blocking(move || {
            let sections = load_documents(&data_dir)?;
            let mut rows = Vec::new();
            for section in sections {
                for window in split_text(&section.text, &chunking) {
                    rows.push(IndexedChunk {
                        text: window,
                        kind: section.kind,
                        category: section.category.clone(),
                        origin: section.origin.clone(),
                    });
                }
            }
            Ok::<Vec<IndexedChunk>, anyhow::Error>(rows)
        })
        .await?
        .context("loading knowledge base documents")?;

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(rows.len());
        for batch in rows.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = provider
                .embed(&texts)
                .await
                .context("embedding knowledge base chunks")?;
            if embedded.embeddings.len() != texts.len() {
                return Err(anyhow!(
                    "embedding count mismatch: expected {}, got {}",
                    texts.len(),
                    embedded.embeddings.len()
                ));
            }
            embeddings.extend(embedded.embeddings);
        }

        let db = Arc::clone(&self.db);
        let dims = provider.dimensions();
        let model_id = provider.model_id().to_owned();
        let total = rows.len();
        let model_id_for_closure = model_id.clone();
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;

            // One transaction: readers on other connections see the old index
            // until commit, never a half-built one.
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch("DROP TABLE IF EXISTS chunks_vec;")?;
            tx.execute_batch(&format!(
                "CREATE VIRTUAL TABLE chunks_vec USING vec0(chunk_id INTEGER PRIMARY KEY, embedding float[{dims}]);"
            ))?;
            tx.execute("DELETE FROM chunks", [])?;

            for (position, (chunk, embedding)) in rows.iter().zip(embeddings.iter()).enumerate() {
                let id = (position + 1) as i64;
                let embedding_json = serde_json::to_string(embedding)?;
                tx.execute(
                    r#"
                    INSERT INTO chunks (id, kind, category, origin, text, embedding)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        id,
                        chunk.kind.as_str(),
                        chunk.category,
                        chunk.origin,
                        chunk.text,
                        embedding_json
                    ],
                )?;
                tx.execute(
                    "INSERT INTO chunks_vec (chunk_id, embedding) VALUES (?1, ?2)",
                    params![id, embedding_json],
                )?;
            }

            let dims_value = dims.to_string();
            let indexed_at = chrono::Utc::now().to_rfc3339();
            for (key, value) in [
                ("embedding_model", model_id_for_closure.as_str()),
                ("vec_dimensions", dims_value.as_str()),
                ("indexed_at", indexed_at.as_str()),
            ] {
                tx.execute(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )?;
            }

            tx.commit()?;
            Ok::<(), anyhow::Error>(())
        })
        .await??;

        info!(chunks = total, model = %model_id, "knowledge index built");
        Ok(total)
    }

    /// Top-k retrieval, best first. Ties in score resolve to chunk insertion
    /// order. An optional kind filter restricts results to FAQs or circulars.
    pub async fn search(
        &self,
        provider: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
        filter: Option<SourceKind>,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let k = k.max(1);

        let embedded = provider
            .embed(&[query.to_owned()])
            .await
            .context("embedding search query")?;
        let query_vec = embedded
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedding provider returned no query embedding"))?;

        // Over-fetch so a post-MATCH kind filter cannot starve the result.
        let candidate_limit = k * 4;
        let db = Arc::clone(&self.db);

        let mut candidates: Vec<(i64, RetrievedChunk)> = task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;

            let has_vec_table: bool = conn
                .query_row(
                    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'chunks_vec'",
                    [],
                    |r| r.get(0),
                )
                .unwrap_or(false);

            if has_vec_table {
                let query_json = serde_json::to_string(&query_vec)?;
                let mut stmt = conn.prepare(
                    r#"
                    SELECT v.chunk_id, c.kind, c.category, c.origin, c.text, v.distance
                    FROM chunks_vec v
                    JOIN chunks c ON c.id = v.chunk_id
                    WHERE v.embedding MATCH ?1 AND k = ?2
                    "#,
                )?;
                let rows = stmt.query_map(params![query_json, candidate_limit as i64], |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                        r.get::<_, f64>(5)?,
                    ))
                })?;

                let mut out = Vec::new();
                for row in rows {
                    let (id, kind, category, origin, text, distance) = row?;
                    // L2 over unit vectors: cos = 1 - d^2 / 2.
                    let score = (1.0 - (distance * distance) / 2.0).clamp(0.0, 1.0) as f32;
                    out.push((id, make_retrieved(kind, category, origin, text, score)?));
                }
                return Ok::<Vec<(i64, RetrievedChunk)>, anyhow::Error>(out);
            }

            // No vector table (index predates it): brute-force over stored
            // embeddings. Exact, just slower.
            let mut stmt = conn.prepare(
                "SELECT id, kind, category, origin, text, embedding FROM chunks ORDER BY id",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                ))
            })?;

            let mut out = Vec::new();
            for row in rows {
                let (id, kind, category, origin, text, embedding_json) = row?;
                let embedding: Vec<f32> = serde_json::from_str(&embedding_json)?;
                let score = dot(&query_vec, &embedding).clamp(0.0, 1.0);
                out.push((id, make_retrieved(kind, category, origin, text, score)?));
            }
            Ok::<Vec<(i64, RetrievedChunk)>, anyhow::Error>(out)
        })
        .await??;

        if let Some(kind) = filter {
            candidates.retain(|(_, c)| c.chunk.kind == kind);
        }
        candidates.sort_by(|a, b| {
            b.1.score
                .total_cmp(&a.1.score)
                .then(a.0.cmp(&b.0))
        });
        candidates.truncate(k);

        Ok(candidates.into_iter().map(|(_, c)| c).collect())
    }

    pub async fn chunk_count(&self) -> Result<i64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
            Ok::<i64, anyhow::Error>(count)
        })
        .await?
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow!("failed to lock sqlite connection"))
    }
}

fn make_retrieved(
    kind: String,
    category: String,
    origin: String,
    text: String,
    score: f32,
) -> Result<RetrievedChunk> {
    let kind = SourceKind::parse(&kind).ok_or_else(|| anyhow!("unknown source kind: {kind}"))?;
    Ok(RetrievedChunk {
        chunk: IndexedChunk {
            text,
            kind,
            category,
            origin,
        },
        score,
    })
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
