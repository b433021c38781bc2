//! Core data models used throughout know-pipe.
//!
//! These types represent the samples, patterns, insights, feature groups and
//! guides that flow through the discovery → analysis → assembly pipeline.
//! Records that must always be traceable to a source file are built through
//! checked constructors that return [`RecordError`] instead of silently
//! dropping data.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the checked record constructors.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("record has an empty source path")]
    EmptySourcePath,

    #[error("record from {source_path} has no name")]
    MissingName { source_path: String },
}

fn check_source_path(path: &Path) -> Result<(), RecordError> {
    if path.as_os_str().is_empty() {
        return Err(RecordError::EmptySourcePath);
    }
    Ok(())
}

// ============ File categories ============

/// Category assigned to a discovered file, derived purely from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    StructuredData,
    LongFormDoc,
    ShortTextDoc,
    Config,
    Image,
    BinaryDoc,
    ExecutionLog,
    Unclassified,
}

impl FileCategory {
    pub const ALL: [FileCategory; 8] = [
        FileCategory::StructuredData,
        FileCategory::LongFormDoc,
        FileCategory::ShortTextDoc,
        FileCategory::Config,
        FileCategory::Image,
        FileCategory::BinaryDoc,
        FileCategory::ExecutionLog,
        FileCategory::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::StructuredData => "structured-data",
            FileCategory::LongFormDoc => "long-form-doc",
            FileCategory::ShortTextDoc => "short-text-doc",
            FileCategory::Config => "config",
            FileCategory::Image => "image",
            FileCategory::BinaryDoc => "binary-doc",
            FileCategory::ExecutionLog => "execution-log",
            FileCategory::Unclassified => "unclassified",
        }
    }

    /// Representative extension, used when rendering globs for a category.
    pub fn typical_extension(&self) -> &'static str {
        match self {
            FileCategory::StructuredData => "json",
            FileCategory::LongFormDoc => "md",
            FileCategory::ShortTextDoc => "txt",
            FileCategory::Config => "yaml",
            FileCategory::Image => "png",
            FileCategory::BinaryDoc => "pdf",
            FileCategory::ExecutionLog => "log",
            FileCategory::Unclassified => "*",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown file category: '{}'", s))
    }
}

// ============ Samples ============

/// How a [`Sample`] was cut out of its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleKind {
    Structure,
    ExtractedSubstructure,
    Head,
    Middle,
    Tail,
    Full,
}

impl SampleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Structure => "structure",
            SampleKind::ExtractedSubstructure => "extracted-substructure",
            SampleKind::Head => "head",
            SampleKind::Middle => "middle",
            SampleKind::Tail => "tail",
            SampleKind::Full => "full",
        }
    }
}

/// A bounded excerpt of exactly one source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub source_path: PathBuf,
    pub kind: SampleKind,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl Sample {
    pub fn new(
        source_path: impl Into<PathBuf>,
        kind: SampleKind,
        text: impl Into<String>,
    ) -> Result<Self, RecordError> {
        let source_path = source_path.into();
        check_source_path(&source_path)?;
        Ok(Self {
            source_path,
            kind,
            text: text.into(),
            metadata: BTreeMap::new(),
        })
    }

    pub fn with_meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

// ============ Patterns ============

/// Coarse confidence tier of a parsed [`Pattern`].
///
/// Ordinal only: `Structured` means the record came from labeled sections,
/// `Fallback` means the parser gave up and wrapped the whole text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    Fallback,
    Structured,
}

impl Confidence {
    pub fn score(&self) -> f64 {
        match self {
            Confidence::Fallback => 0.6,
            Confidence::Structured => 0.8,
        }
    }
}

/// A named unit of recurring structure or implementation technique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    /// Feature name (code stream) or file category (data discovery).
    pub category: String,
    pub name: String,
    pub description: String,
    /// At most three snippets; for code patterns the first one is the code example.
    pub example_snippets: Vec<String>,
    pub confidence: Confidence,
    /// The analysis text this pattern was parsed from.
    pub guidance: String,
    pub source_path: PathBuf,
}

impl Pattern {
    pub const MAX_SNIPPETS: usize = 3;

    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Result<Self, RecordError> {
        let source_path = source_path.into();
        check_source_path(&source_path)?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RecordError::MissingName {
                source_path: source_path.display().to_string(),
            });
        }
        Ok(Self {
            category: category.into(),
            name: name.trim().to_string(),
            description: description.into(),
            example_snippets: Vec::new(),
            confidence: Confidence::Structured,
            guidance: String::new(),
            source_path,
        })
    }

    pub fn with_snippets(mut self, snippets: Vec<String>) -> Self {
        self.example_snippets = snippets.into_iter().take(Self::MAX_SNIPPETS).collect();
        self
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = guidance.into();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn code_example(&self) -> Option<&str> {
        self.example_snippets.first().map(String::as_str)
    }

    /// File name of the source, for display.
    pub fn source_name(&self) -> String {
        file_name_of(&self.source_path)
    }
}

// ============ Insights ============

/// Bucket a bullet observation is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketTag {
    Architecture,
    Implementation,
    Pitfall,
    Uncategorized,
}

/// Documentation type, assigned from file names and path clues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocType {
    Readme,
    Api,
    Architecture,
    Setup,
    Deployment,
    Contributing,
    General,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Readme => "readme",
            DocType::Api => "api",
            DocType::Architecture => "architecture",
            DocType::Setup => "setup",
            DocType::Deployment => "deployment",
            DocType::Contributing => "contributing",
            DocType::General => "general",
        }
    }

    /// Doc types that get their own architecture guide.
    pub fn is_architecture_like(&self) -> bool {
        matches!(self, DocType::Architecture | DocType::Readme)
    }
}

/// Kind of non-text material handled by the multimodal stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    Image,
    BinaryDoc,
    Logs,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::BinaryDoc => "binary-doc",
            MediaKind::Logs => "logs",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::BinaryDoc => "Document",
            MediaKind::Logs => "Logs",
        }
    }
}

/// Where an [`Insight`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case", tag = "stream", content = "kind")]
pub enum InsightSource {
    Doc(DocType),
    Media(MediaKind),
}

/// Classified bullet observations derived from one document, image or log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub source: InsightSource,
    pub title: String,
    pub raw_text: String,
    pub buckets: BTreeMap<BucketTag, Vec<String>>,
    pub source_path: PathBuf,
}

impl Insight {
    pub fn new(
        source: InsightSource,
        title: impl Into<String>,
        raw_text: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Result<Self, RecordError> {
        let source_path = source_path.into();
        check_source_path(&source_path)?;
        Ok(Self {
            source,
            title: title.into(),
            raw_text: raw_text.into(),
            buckets: BTreeMap::new(),
            source_path,
        })
    }

    pub fn with_buckets(mut self, buckets: BTreeMap<BucketTag, Vec<String>>) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn bullets(&self, tag: BucketTag) -> &[String] {
        self.buckets.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn architecture(&self) -> &[String] {
        self.bullets(BucketTag::Architecture)
    }

    pub fn implementation(&self) -> &[String] {
        self.bullets(BucketTag::Implementation)
    }

    pub fn pitfalls(&self) -> &[String] {
        self.bullets(BucketTag::Pitfall)
    }

    /// General observations: architecture bullets followed by unfiled ones.
    pub fn general(&self) -> Vec<&str> {
        self.architecture()
            .iter()
            .chain(self.bullets(BucketTag::Uncategorized))
            .map(String::as_str)
            .collect()
    }

    pub fn doc_type(&self) -> Option<DocType> {
        match self.source {
            InsightSource::Doc(t) => Some(t),
            InsightSource::Media(_) => None,
        }
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        match self.source {
            InsightSource::Media(k) => Some(k),
            InsightSource::Doc(_) => None,
        }
    }
}

/// One parsed record; which variant depends on the stream profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "kebab-case")]
pub enum Record {
    Pattern(Pattern),
    Insight(Insight),
}

// ============ Feature groups ============

/// Source files believed to implement the same logical feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureGroup {
    pub name: String,
    pub members: BTreeSet<PathBuf>,
}

impl FeatureGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
        }
    }

    /// Feature name as a title: underscores become spaces, words capitalised.
    pub fn title(&self) -> String {
        title_case(&self.name)
    }
}

// ============ Guides ============

/// Kind of rendered guide; decides the output subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuideKind {
    HowToBuild,
    Pattern,
    Architecture,
    Pitfalls,
}

impl GuideKind {
    pub const ALL: [GuideKind; 4] = [
        GuideKind::HowToBuild,
        GuideKind::Pattern,
        GuideKind::Architecture,
        GuideKind::Pitfalls,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            GuideKind::HowToBuild => "how_to_build",
            GuideKind::Pattern => "patterns",
            GuideKind::Architecture => "architecture",
            GuideKind::Pitfalls => "gotchas",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GuideKind::HowToBuild => "How To Build",
            GuideKind::Pattern => "Pattern",
            GuideKind::Architecture => "Architecture",
            GuideKind::Pitfalls => "Gotchas",
        }
    }
}

/// Line prefix of the single generation-time stamp in every guide body.
pub const GENERATED_ON_PREFIX: &str = "*Generated on: ";

/// A rendered Markdown document, written once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guide {
    pub title: String,
    pub filename: String,
    pub body: String,
    pub kind: GuideKind,
}

impl Guide {
    /// SHA-256 of the body with the generation stamp line removed.
    ///
    /// Two assembly passes over identical inputs yield the same digest
    /// regardless of the day they ran on.
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for line in self.body.lines() {
            if line.starts_with(GENERATED_ON_PREFIX) {
                continue;
            }
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============ Naming helpers ============

/// Filename stem for a title: lower-cased, spaces and hyphens become
/// underscores, and anything else that cannot appear in a file name is dropped.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('_'),
            c if c.is_alphanumeric() || c == '_' || c == '.' => Some(c),
            _ => None,
        })
        .collect()
}

/// `user_management` → `User Management`.
pub fn title_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_replaces_separators() {
        assert_eq!(slugify("Retry Wrapper"), "retry_wrapper");
        assert_eq!(slugify("Event-Driven Cache"), "event_driven_cache");
        assert_eq!(slugify("Read/Write Split"), "readwrite_split");
    }

    #[test]
    fn title_case_splits_underscores() {
        assert_eq!(title_case("user_management"), "User Management");
        assert_eq!(title_case("api"), "Api");
    }

    #[test]
    fn pattern_without_name_is_rejected() {
        let err = Pattern::new("auth", "  ", "desc", "src/auth.py").unwrap_err();
        assert!(matches!(err, RecordError::MissingName { .. }));
    }

    #[test]
    fn records_require_a_source_path() {
        assert_eq!(
            Sample::new("", SampleKind::Full, "x").unwrap_err(),
            RecordError::EmptySourcePath
        );
        assert_eq!(
            Insight::new(InsightSource::Media(MediaKind::Logs), "t", "x", "").unwrap_err(),
            RecordError::EmptySourcePath
        );
    }

    #[test]
    fn confidence_is_ordinal() {
        assert!(Confidence::Fallback < Confidence::Structured);
        assert!(Confidence::Fallback.score() < Confidence::Structured.score());
    }

    #[test]
    fn digest_ignores_generation_stamp() {
        let a = Guide {
            title: "t".into(),
            filename: "t.md".into(),
            body: "# T\n\nbody\n*Generated on: 2024-01-01*\n".into(),
            kind: GuideKind::Pattern,
        };
        let mut b = a.clone();
        b.body = "# T\n\nbody\n*Generated on: 2030-12-31*\n".into();
        assert_eq!(a.content_digest(), b.content_digest());
    }

    #[test]
    fn category_round_trips_through_str() {
        for c in FileCategory::ALL {
            assert_eq!(c.as_str().parse::<FileCategory>().unwrap(), c);
        }
    }
}
