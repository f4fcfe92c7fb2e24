//! TF-IDF relevance ranking.
//!
//! A [`TfIdfSpace`] is fitted from scratch over one candidate set for every
//! query and thrown away afterwards; nothing here is persisted. Candidate
//! sets are one show's catalog at most, so a rebuild costs far less than
//! keeping an index in sync with the store.
//!
//! # Weighting
//!
//! - Tokens: lowercase alphanumeric runs of at least two characters,
//!   English stop words removed.
//! - Term weight: raw count × smoothed IDF, `ln((1 + n) / (1 + df)) + 1`.
//! - Vectors are L2-normalized, so cosine similarity is a dot product and
//!   lies in `[0, 1]`. A text sharing no term with a document scores `0`.
//!
//! Ties are broken by the natural episode order `(show, season, episode)`.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::models::Episode;

/// Default number of suggestions returned by [`suggest_similar`].
pub const DEFAULT_SIMILAR_LIMIT: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Split text into indexable terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Sparse, L2-normalized term vector, sorted by term index.
type SparseVec = Vec<(usize, f64)>;

/// Vector space fitted over a fixed document set.
#[derive(Debug, Clone)]
pub struct TfIdfSpace {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    docs: Vec<SparseVec>,
}

impl TfIdfSpace {
    /// Fit vocabulary and IDF weights over `documents` and vectorize them.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokens {
                let next = vocabulary.len();
                let idx = *vocabulary.entry(token.clone()).or_insert(next);
                if idx == df.len() {
                    df.push(0);
                }
                if !seen.contains(&idx) {
                    seen.push(idx);
                    df[idx] += 1;
                }
            }
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let mut space = Self {
            vocabulary,
            idf,
            docs: Vec::new(),
        };
        space.docs = tokenized.iter().map(|t| space.weigh(t)).collect();
        space
    }

    fn weigh(&self, tokens: &[String]) -> SparseVec {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&idx) = self.vocabulary.get(token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vec: SparseVec = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        vec.sort_by_key(|(idx, _)| *idx);

        let norm = vec.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > f64::EPSILON {
            for (_, w) in vec.iter_mut() {
                *w /= norm;
            }
        } else {
            vec.clear();
        }
        vec
    }

    /// Project arbitrary text into this space. Out-of-vocabulary terms are dropped.
    pub fn vectorize(&self, text: &str) -> Vec<(usize, f64)> {
        self.weigh(&tokenize(text))
    }

    /// Cosine similarity between `text` and every fitted document, in fit order.
    pub fn scores(&self, text: &str) -> Vec<f64> {
        let query = self.vectorize(text);
        self.docs.iter().map(|doc| cosine(&query, doc)).collect()
    }
}

fn cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot.clamp(0.0, 1.0)
}

/// An episode with its similarity score in `[0, 1]`.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEpisode {
    pub episode: Episode,
    pub score: f64,
}

fn sort_scored(scored: &mut [ScoredEpisode]) {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.episode.key().cmp(&b.episode.key()))
    });
}

/// Rank `candidates` against a free-text query over title + plot.
///
/// Every candidate is returned, including those scoring `0`.
pub fn rank_by_text(candidates: Vec<Episode>, query: &str) -> Vec<ScoredEpisode> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let texts: Vec<String> = candidates.iter().map(Episode::search_text).collect();
    let space = TfIdfSpace::fit(&texts);
    let scores = space.scores(query);

    let mut scored: Vec<ScoredEpisode> = candidates
        .into_iter()
        .zip(scores)
        .map(|(episode, score)| ScoredEpisode { episode, score })
        .collect();
    sort_scored(&mut scored);
    scored
}

/// Suggest up to `limit` episodes of the same show resembling `source`.
///
/// The space is fitted over the rest of the show's catalog; `source` itself
/// is always excluded. The source's plot is the query text, or its title
/// when it has no plot.
pub fn suggest_similar(source: &Episode, catalog: Vec<Episode>, limit: usize) -> Vec<ScoredEpisode> {
    let source_key = source.key();
    let others: Vec<Episode> = catalog
        .into_iter()
        .filter(|e| e.show == source.show && e.key() != source_key)
        .collect();

    let query = source.plot.as_deref().unwrap_or(&source.title);
    let mut ranked = rank_by_text(others, query);
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(show: &str, season: u32, episode: u32, title: &str, plot: &str) -> Episode {
        Episode::new(show, season, episode, title)
            .unwrap()
            .with_plot(Some(plot.to_string()))
    }

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        assert_eq!(
            tokenize("Homer's fear of the Bear, a 2nd time!"),
            vec!["homer", "fear", "bear", "2nd", "time"]
        );
    }

    #[test]
    fn test_self_similarity_is_maximal() {
        let plots = [
            "Homer is afraid that Bart is growing up too fast",
            "Marge starts a new job at the power plant",
            "Lisa becomes a vegetarian after visiting a petting zoo",
        ];
        let space = TfIdfSpace::fit(&plots);
        for (i, plot) in plots.iter().enumerate() {
            let scores = space.scores(plot);
            assert!((scores[i] - 1.0).abs() < 1e-9, "self score {}", scores[i]);
            for s in &scores {
                assert!(*s <= scores[i] + 1e-12);
            }
        }
    }

    #[test]
    fn test_scores_within_unit_interval() {
        let docs = ["bear bear wolf", "wolf fox", "fox fox fox hen"];
        let space = TfIdfSpace::fit(&docs);
        for s in space.scores("bear fox hen") {
            assert!((0.0..=1.0).contains(&s), "score out of range: {}", s);
        }
    }

    #[test]
    fn test_unknown_query_scores_zero() {
        let space = TfIdfSpace::fit(&["bear wolf", "fox hen"]);
        assert_eq!(space.scores("spaceship"), vec![0.0, 0.0]);
        assert_eq!(space.scores("the of and"), vec![0.0, 0.0]);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let docs = ["family dinner bear", "family dinner", "family picnic"];
        let space = TfIdfSpace::fit(&docs);
        let scores = space.scores("family bear");
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
    }

    #[test]
    fn test_rank_empty_candidates() {
        assert!(rank_by_text(Vec::new(), "anything").is_empty());
    }

    #[test]
    fn test_rank_orders_by_score_then_natural_key() {
        let candidates = vec![
            ep("A", 2, 1, "Unrelated", "cooking contest"),
            ep("A", 1, 2, "Also unrelated", "baseball game"),
            ep("A", 1, 5, "Bear Patrol", "a bear wanders into town"),
        ];
        let ranked = rank_by_text(candidates, "bear");
        let keys: Vec<String> = ranked.iter().map(|r| r.episode.key().to_string()).collect();
        assert_eq!(keys, vec!["A S1.E5", "A S1.E2", "A S2.E1"]);
        assert!(ranked[0].score > 0.0);
        assert_eq!(ranked[1].score, 0.0);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn test_suggest_excludes_source_and_other_shows() {
        let source = ep("A", 1, 1, "Pilot", "a family adopts a greyhound");
        let catalog = vec![
            source.clone(),
            ep("A", 1, 2, "Dog Days", "the family greyhound runs away"),
            ep("A", 1, 3, "Work", "dad gets a promotion at work"),
            ep("B", 1, 1, "Other Show", "a greyhound family story"),
        ];
        let similar = suggest_similar(&source, catalog, DEFAULT_SIMILAR_LIMIT);
        assert_eq!(similar.len(), 2);
        assert!(similar.iter().all(|s| s.episode.show == "A"));
        assert!(similar.iter().all(|s| s.episode.key() != source.key()));
        assert_eq!(similar[0].episode.episode, 2);
    }

    #[test]
    fn test_suggest_single_episode_catalog_is_empty() {
        let source = ep("A", 1, 1, "Pilot", "a family adopts a greyhound");
        assert!(suggest_similar(&source, vec![source.clone()], 3).is_empty());
    }

    #[test]
    fn test_suggest_truncates_to_limit() {
        let source = ep("A", 1, 1, "Pilot", "bear");
        let catalog: Vec<Episode> = (2..10)
            .map(|i| ep("A", 1, i, &format!("Ep {}", i), "bear story"))
            .collect();
        assert_eq!(suggest_similar(&source, catalog, 3).len(), 3);
    }
}
