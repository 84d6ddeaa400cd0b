//! Retrieval source implementations

mod http_source;
mod lexical;

pub use http_source::HttpSearchSource;
pub use lexical::{CorpusEntry, LexicalSource, load_corpus};
