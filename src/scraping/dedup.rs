//! Near-duplicate content detection
//!
//! Keeps token-frequency vectors for the most recently accepted pages in a
//! fixed-size window and flags any new page whose cosine similarity to one
//! of them reaches the threshold. Pages evicted from the window are
//! forgotten, so this is a recency check, not a global index.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::tokenizer::{tokenize, word_frequencies};

/// Default number of page vectors retained
pub const DEFAULT_WINDOW_SIZE: usize = 1000;

/// Default cosine similarity at which a page counts as a duplicate
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Sparse token -> count vector with its Euclidean norm cached
#[derive(Debug, Clone, PartialEq)]
pub struct TermVector {
    counts: HashMap<String, u32>,
    norm: f64,
}

impl TermVector {
    /// Build a vector from raw text
    pub fn from_text(text: &str) -> Self {
        let counts = word_frequencies(tokenize(text).as_slice());
        let norm = counts
            .values()
            .map(|&c| f64::from(c) * f64::from(c))
            .sum::<f64>()
            .sqrt();
        Self { counts, norm }
    }

    /// Number of distinct tokens
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Cosine similarity; zero when either side is empty or shares no tokens
    pub fn cosine(&self, other: &TermVector) -> f64 {
        if self.is_empty() || other.is_empty() || self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }

        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        let dot: f64 = small
            .counts
            .iter()
            .filter_map(|(token, &a)| large.counts.get(token).map(|&b| f64::from(a) * f64::from(b)))
            .sum();

        if dot == 0.0 {
            return 0.0;
        }
        dot / (self.norm * other.norm)
    }
}

/// Thread-safe near-duplicate detector over a bounded window of pages
pub struct DuplicateChecker {
    window: Mutex<VecDeque<TermVector>>,
    capacity: usize,
    threshold: f64,
}

impl DuplicateChecker {
    /// Create a checker holding at most `capacity` vectors
    pub fn new(capacity: usize, threshold: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            threshold,
        }
    }

    /// Check `text` against the window and remember it if it is new.
    ///
    /// The comparison and the insert happen under one lock, so of two
    /// concurrent near-identical submissions exactly one is recorded and the
    /// other is reported as a duplicate. Text with no usable tokens is never
    /// a duplicate and is not stored.
    pub fn is_duplicate(&self, text: &str) -> bool {
        let vector = TermVector::from_text(text);
        if vector.is_empty() {
            return false;
        }

        let mut window = self.window.lock();
        if window.iter().any(|seen| vector.cosine(seen) >= self.threshold) {
            return true;
        }

        if window.len() >= self.capacity {
            window.pop_front();
        }
        window.push_back(vector);
        false
    }

    /// Number of vectors currently retained
    pub fn len(&self) -> usize {
        self.window.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget every retained vector
    pub fn clear(&self) {
        self.window.lock().clear();
    }
}

impl Default for DuplicateChecker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_SIMILARITY_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_same_text_twice() {
        let checker = DuplicateChecker::default();
        let text = "The quick brown fox jumps over the lazy dog";
        assert!(!checker.is_duplicate(text));
        assert!(checker.is_duplicate(text));
        assert_eq!(checker.len(), 1);
    }

    #[test]
    fn test_empty_text_never_duplicate() {
        let checker = DuplicateChecker::default();
        assert!(!checker.is_duplicate(""));
        assert!(!checker.is_duplicate("!!! ... ???"));
        assert!(!checker.is_duplicate(""));
        assert!(checker.is_empty());
    }

    #[test]
    fn test_cosine_of_disjoint_vectors_is_zero() {
        let a = TermVector::from_text("alpha beta gamma");
        let b = TermVector::from_text("delta epsilon zeta");
        assert_eq!(a.cosine(&b), 0.0);
        assert_eq!(a.cosine(&TermVector::from_text("")), 0.0);
    }

    #[test]
    fn test_cosine_identical_is_one() {
        let a = TermVector::from_text("one two two three");
        let b = TermVector::from_text("ONE, two; two -- three");
        assert!((a.cosine(&b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_near_duplicate_flagged() {
        let checker = DuplicateChecker::default();
        let base: String = (0..200).map(|i| format!("word{} ", i % 50)).collect();
        let tweaked = format!("{} extra", base);
        assert!(!checker.is_duplicate(&base));
        assert!(checker.is_duplicate(&tweaked));
    }

    #[test]
    fn test_window_eviction() {
        let checker = DuplicateChecker::new(2, 0.9);
        let a = "apples oranges bananas pears";
        let b = "rust cargo crates compiler";
        let c = "ocean waves beach sand";

        assert!(!checker.is_duplicate(a));
        assert!(!checker.is_duplicate(b));
        assert!(!checker.is_duplicate(c));

        // a was evicted when c arrived
        assert!(!checker.is_duplicate(a));
        assert!(checker.is_duplicate(c));
    }

    #[test]
    fn test_capacity_and_clear() {
        assert_eq!(DuplicateChecker::default().capacity(), DEFAULT_WINDOW_SIZE);

        let checker = DuplicateChecker::new(0, 0.9);
        assert_eq!(checker.capacity(), 1);

        let text = "lecture notes for the operating systems course";
        assert!(!checker.is_duplicate(text));
        assert!(checker.is_duplicate(text));

        checker.clear();
        assert!(checker.is_empty());
        assert!(!checker.is_duplicate(text));
        assert_eq!(checker.len(), 1);
    }

    #[test]
    fn test_concurrent_submissions_insert_once() {
        let checker = Arc::new(DuplicateChecker::default());
        let text = "shared page body with enough words to form a vector";

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let checker = Arc::clone(&checker);
                std::thread::spawn(move || checker.is_duplicate(text))
            })
            .collect();

        let flagged = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&dup| dup)
            .count();

        assert_eq!(flagged, 7);
        assert_eq!(checker.len(), 1);
    }
}
