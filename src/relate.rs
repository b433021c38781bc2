//! Relatedness scoring between feature names and insight text.
//!
//! The assembler asks a [`Relatedness`] implementation whether an insight
//! belongs in a feature's guide. The default [`KeywordOverlap`] is a
//! permissive keyword heuristic; swapping in a better classifier only
//! requires another implementation of the trait.

/// Decides whether free text is related to a feature.
pub trait Relatedness: Send + Sync {
    /// `feature` is a grouper feature name such as `user_management`;
    /// `haystack` is the insight text to test against it.
    fn is_related(&self, feature: &str, haystack: &str) -> bool;
}

/// A feature is related to text containing any of its `_`-separated
/// tokens as a case-insensitive substring.
///
/// Favours recall: `file_handling` matches any text mentioning "file".
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOverlap;

impl Relatedness for KeywordOverlap {
    fn is_related(&self, feature: &str, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        feature
            .to_lowercase()
            .split('_')
            .filter(|token| !token.is_empty())
            .any(|token| haystack.contains(token))
    }
}
