use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

use super::TopicModel;

#[derive(Serialize, Deserialize, Default)]
pub struct TfIdfModel {
    /// term -> column index
    vocabulary: HashMap<String, usize>,
    /// term document frequency, aligned with `vocabulary` by index
    idf: Vec<f32>,
    /// one sparse (term_index, weight) vector per document
    doc_vectors: Vec<Vec<(usize, f32)>>,
    doc_urls: Vec<String>,
    /// built by `index()`: term_index -> [(doc_idx, weight)], used to skip
    /// documents that share no terms with the query
    #[serde(skip)]
    postings: HashMap<usize, Vec<(usize, f32)>>,
}

fn tokenize(text: &str) -> Vec<String> {
    let stemmer = Stemmer::create(Algorithm::English);
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| stemmer.stem(&t.to_lowercase()).into_owned())
        .collect()
}

impl TopicModel for TfIdfModel {
    fn train(corpus: &[(String, String)]) -> Option<Self> {
        if corpus.is_empty() {
            return None;
        }

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_terms: Vec<HashMap<usize, u32>> = Vec::with_capacity(corpus.len());

        for (_, text) in corpus {
            let mut counts: HashMap<usize, u32> = HashMap::new();
            for term in tokenize(text) {
                let next_idx = vocabulary.len();
                let idx = *vocabulary.entry(term).or_insert(next_idx);
                *counts.entry(idx).or_insert(0) += 1;
            }
            doc_terms.push(counts);
        }

        let n_docs = corpus.len() as f32;
        let mut doc_freq = vec![0u32; vocabulary.len()];
        for counts in &doc_terms {
            for &idx in counts.keys() {
                doc_freq[idx] += 1;
            }
        }
        let idf: Vec<f32> = doc_freq
            .iter()
            .map(|&df| (n_docs / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        let doc_vectors: Vec<Vec<(usize, f32)>> = doc_terms
            .into_iter()
            .map(|counts| {
                let total: u32 = counts.values().sum();
                let mut v: Vec<(usize, f32)> = counts
                    .into_iter()
                    .map(|(idx, count)| {
                        let tf = count as f32 / total.max(1) as f32;
                        (idx, tf * idf[idx])
                    })
                    .collect();
                v.sort_by_key(|(idx, _)| *idx);
                v
            })
            .collect();

        let doc_urls = corpus.iter().map(|(url, _)| url.clone()).collect();

        let mut model = Self {
            vocabulary,
            idf,
            doc_vectors,
            doc_urls,
            postings: HashMap::new(),
        };
        model.index();
        Some(model)
    }

    fn index(&mut self) {
        let mut postings: HashMap<usize, Vec<(usize, f32)>> = HashMap::new();
        for (doc_idx, vector) in self.doc_vectors.iter().enumerate() {
            for &(term_idx, weight) in vector {
                postings.entry(term_idx).or_default().push((doc_idx, weight));
            }
        }
        self.postings = postings;
    }

    fn query(&self, query: &str, n: usize) -> Vec<String> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<usize, f32> = HashMap::new();
        for term in &query_terms {
            let Some(&term_idx) = self.vocabulary.get(term) else {
                continue;
            };
            let Some(postings) = self.postings.get(&term_idx) else {
                continue;
            };
            let query_weight = self.idf.get(term_idx).copied().unwrap_or(1.0);
            for &(doc_idx, doc_weight) in postings {
                *scores.entry(doc_idx).or_insert(0.0) += query_weight * doc_weight;
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
            .into_iter()
            .take(n)
            .filter_map(|(idx, _)| self.doc_urls.get(idx).cloned())
            .collect()
    }

    fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn load(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut model: Self = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        // postings are never serialized; always rebuild them after loading
        model.index();
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_corpus_yields_no_model() {
        assert!(TfIdfModel::train(&[]).is_none());
    }

    #[test]
    fn ranks_closer_document_first() {
        let corpus = vec![
            ("http://a.onion".to_string(), "onion market drugs forum".to_string()),
            ("http://b.onion".to_string(), "recipe for baking bread".to_string()),
        ];
        let model = TfIdfModel::train(&corpus).unwrap();
        let results = model.query("drugs market", 2);
        assert_eq!(results.first().map(String::as_str), Some("http://a.onion"));
    }

    #[test]
    fn save_and_load_round_trip_preserves_query_results() {
        let corpus = vec![
            ("http://a.onion".to_string(), "onion market drugs forum".to_string()),
            ("http://b.onion".to_string(), "recipe for baking bread".to_string()),
        ];
        let model = TfIdfModel::train(&corpus).unwrap();
        let path = std::env::temp_dir().join(format!("nyx-tfidf-test-{}.bin", std::process::id()));
        model.save(&path).unwrap();
        let loaded = TfIdfModel::load(&path).unwrap();
        assert_eq!(model.query("drugs", 1), loaded.query("drugs", 1));
        let _ = std::fs::remove_file(&path);
    }
}
