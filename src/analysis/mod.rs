//! Tokenizer boundary (spec §1: "the tokenizer... is an external
//! collaborator; only the contracts at the boundary are specified"). This
//! module exists only so the crate's own tests can drive `InvertedFile`
//! without a real SQL-kernel tokenizer plugged in; production callers are
//! expected to supply their own [`Tokenizer`] implementation (stemming,
//! language-specific segmentation, stopword filtering) upstream of
//! [`crate::inverted::InvertedFile::index_document`].
//!
//! Grounded on the teacher's `analysis/tokenizer.rs` (`Tokenizer` trait,
//! `StandardTokenizer`), reduced to the `(position, term, length)` contract
//! spec §1 names instead of the teacher's richer `Token`/filter-chain model
//! (stopwords, stemming, n-grams are the SQL kernel's concern here).

use unicode_segmentation::UnicodeSegmentation;

/// Lazily produces `(position, term, length)` tuples from one document's
/// text (spec §1). `position` is the token's 0-based ordinal among the
/// document's tokens; `length` is the token's character count, needed by
/// `LocationList` overlap tests (spec §3.1).
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<(u32, String, u32)>;
}

/// Whitespace/punctuation-aware, lowercasing tokenizer sufficient to drive
/// this crate's own scenario tests (spec §8). Not a substitute for a real
/// stemming/normalization pipeline.
#[derive(Debug, Clone, Default)]
pub struct SimpleTokenizer {
    pub lowercase: bool,
}

impl SimpleTokenizer {
    pub fn new() -> Self {
        SimpleTokenizer { lowercase: true }
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<(u32, String, u32)> {
        text.unicode_words()
            .enumerate()
            .map(|(position, word)| {
                let term = if self.lowercase { word.to_lowercase() } else { word.to_string() };
                let length = term.graphemes(true).count() as u32;
                (position as u32, term, length)
            })
            .collect()
    }
}

/// Wraps another tokenizer and stems each term with a Snowball algorithm
/// (spec §1's "normalization/stemming library" boundary, given a concrete —
/// if optional — default since `rust_stemmers` is already in the dependency
/// stack for this purpose).
pub struct StemmingTokenizer<T: Tokenizer> {
    inner: T,
    stemmer: rust_stemmers::Stemmer,
}

impl<T: Tokenizer> StemmingTokenizer<T> {
    pub fn new(inner: T, algorithm: rust_stemmers::Algorithm) -> Self {
        StemmingTokenizer {
            inner,
            stemmer: rust_stemmers::Stemmer::create(algorithm),
        }
    }
}

impl<T: Tokenizer> Tokenizer for StemmingTokenizer<T> {
    fn tokenize(&self, text: &str) -> Vec<(u32, String, u32)> {
        self.inner
            .tokenize(text)
            .into_iter()
            .map(|(position, term, length)| (position, self.stemmer.stem(&term).into_owned(), length))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_tokenizer_lowercases_and_positions_sequentially() {
        let tokens = SimpleTokenizer::new().tokenize("The Quick Brown Fox");
        assert_eq!(
            tokens,
            vec![
                (0, "the".to_string(), 3),
                (1, "quick".to_string(), 5),
                (2, "brown".to_string(), 5),
                (3, "fox".to_string(), 3),
            ]
        );
    }

    #[test]
    fn stemming_tokenizer_normalizes_suffixes() {
        let tokenizer = StemmingTokenizer::new(SimpleTokenizer::new(), rust_stemmers::Algorithm::English);
        let tokens = tokenizer.tokenize("running runner");
        assert_eq!(tokens[0].1, "run");
    }
}
