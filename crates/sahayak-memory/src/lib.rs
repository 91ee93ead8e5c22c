pub mod chunker;
pub mod documents;
pub mod index;
pub mod session;

pub use chunker::{split_text, ChunkerConfig};
pub use documents::{load_documents, DocSection, DocumentError};
pub use index::{IndexConfig, IndexedChunk, KnowledgeIndex, RetrievedChunk};
pub use session::ConversationMemory;
