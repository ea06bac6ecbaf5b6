use std::io;
use std::path::Path;

mod tfidf;

pub use tfidf::TfIdfModel;

/// Contract a topic model must satisfy to be hot-swapped by the manager.
/// The algorithm itself is treated as opaque/pluggable; `TfIdfModel` is the
/// default, concrete implementation this crate ships.
pub trait TopicModel: Sized + Send + Sync + 'static {
    /// Trains a fresh model from `(url, text)` pairs. Returns `None` when
    /// the corpus is too small to produce a usable model (e.g. empty).
    fn train(corpus: &[(String, String)]) -> Option<Self>;

    /// Builds any lookup/ranking structures needed by `query`. Must run
    /// strictly after the model that will be served has been persisted,
    /// per the manager's swap ordering.
    fn index(&mut self);

    /// Returns up to `n` document (URL) identifiers ranked by relevance.
    fn query(&self, query: &str, n: usize) -> Vec<String>;

    fn save(&self, path: &Path) -> io::Result<()>;
    fn load(path: &Path) -> io::Result<Self>;
}
