//! Insight parser.
//!
//! Turns one free-form analysis text into typed [`Record`]s. Every stream
//! (code, documentation, multimodal, data discovery) runs the same state
//! machine; what differs is the [`StreamProfile`] table that tells it how
//! to split the text, which phrases open which section, and how to pull a
//! description and examples out of an accumulated pattern.
//!
//! # State machine
//!
//! The text is split into units (blank-line separated blocks or single
//! lines). For each unit, in order:
//!
//! 1. A unit containing a trigger phrase switches the current section.
//!    Entering [`Section::NameCapture`] flushes the open pattern and starts
//!    a new one.
//! 2. A bullet (`- `, `* `, `• `) is stripped and filed under the current
//!    section, or under [`BucketTag::Uncategorized`] when there is none.
//! 3. Anything else is free text kept with the open pattern.
//!
//! Insight profiles may then re-file uncategorized bullets per their
//! [`UnlabeledFallback`]. At end of input the open pattern is flushed. A pattern without a name
//! is dropped with a debug log. If a pattern stream produced nothing from
//! a text longer than `parser.fallback_floor`, one
//! [`Confidence::Fallback`] pattern wraps the whole text.
//!
//! Parsing is a pure function of its input.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ParserConfig;
use crate::models::{
    file_name_of, BucketTag, Confidence, Insight, InsightSource, Pattern, Record, RecordError,
};
use crate::sampler::truncate_chars;

/// Longest pattern name taken from a capture line.
const MAX_NAME_CHARS: usize = 80;

/// Sentences considered by the sentence-level fallback.
const MAX_FALLBACK_SENTENCES: usize = 10;

/// Recognised bullet markers.
const BULLETS: &[&str] = &["- ", "* ", "•"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Units separated by blank lines; fenced code is never split.
    Blocks,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    NameCapture,
    Architecture,
    Implementation,
    Pitfall,
}

impl Section {
    fn bucket(self) -> Option<BucketTag> {
        match self {
            Section::NameCapture => None,
            Section::Architecture => Some(BucketTag::Architecture),
            Section::Implementation => Some(BucketTag::Implementation),
            Section::Pitfall => Some(BucketTag::Pitfall),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emits {
    Patterns,
    Insight,
}

/// Where a pattern's description comes from.
#[derive(Debug, Clone, Copy)]
pub enum DescriptionRule {
    /// Value of the first line carrying one of these labels, inline after
    /// the colon or else on the next non-empty line.
    Labeled(&'static [&'static str]),
    /// Prefix of the unit that opened the pattern.
    UnitPrefix,
}

/// Where a pattern's example snippets come from.
#[derive(Debug, Clone, Copy)]
pub enum ExampleRule {
    /// The first fenced block after a line carrying this label.
    FenceAfter(&'static str),
    /// Lines containing the needle and longer than `min_chars`.
    LinesContaining {
        needle: &'static str,
        min_chars: usize,
    },
}

/// What to do with bullets no labeled section caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlabeledFallback {
    Keep,
    /// Bullets outside any section that mention architecture or design
    /// become architecture bullets, all others implementation bullets.
    KeywordSplit,
    /// With no bullets at all, classify the first sentences by keyword.
    Sentences,
}

/// Per-stream parser configuration.
#[derive(Debug, Clone, Copy)]
pub struct StreamProfile {
    pub name: &'static str,
    pub granularity: Granularity,
    /// Checked in order; the first phrase found in a unit wins.
    pub triggers: &'static [(&'static str, Section)],
    /// Units shorter than this never open a pattern.
    pub min_capture_chars: usize,
    pub emits: Emits,
    pub description: DescriptionRule,
    pub examples: ExampleRule,
    pub unlabeled: UnlabeledFallback,
    pub title_from_heading: bool,
    pub fallback_name: fn(&str, &str) -> String,
}

fn code_fallback_name(file_name: &str, _category: &str) -> String {
    format!("Implementation Pattern from {}", file_name)
}

fn data_fallback_name(_file_name: &str, category: &str) -> String {
    format!("General {} patterns", category)
}

pub static CODE: StreamProfile = StreamProfile {
    name: "code",
    granularity: Granularity::Blocks,
    triggers: &[("pattern name", Section::NameCapture)],
    min_capture_chars: 0,
    emits: Emits::Patterns,
    description: DescriptionRule::Labeled(&["what it does", "description"]),
    examples: ExampleRule::FenceAfter("code example"),
    unlabeled: UnlabeledFallback::Keep,
    title_from_heading: false,
    fallback_name: code_fallback_name,
};

pub static DATA: StreamProfile = StreamProfile {
    name: "data",
    granularity: Granularity::Blocks,
    triggers: &[("pattern", Section::NameCapture)],
    min_capture_chars: 50,
    emits: Emits::Patterns,
    description: DescriptionRule::UnitPrefix,
    examples: ExampleRule::LinesContaining {
        needle: "example",
        min_chars: 20,
    },
    unlabeled: UnlabeledFallback::Keep,
    title_from_heading: false,
    fallback_name: data_fallback_name,
};

pub static DOC: StreamProfile = StreamProfile {
    name: "doc",
    granularity: Granularity::Lines,
    triggers: &[
        ("architectural insights", Section::Architecture),
        ("architecture insights", Section::Architecture),
        ("implementation guidance", Section::Implementation),
        ("gotcha", Section::Pitfall),
        ("pitfall", Section::Pitfall),
    ],
    min_capture_chars: 0,
    emits: Emits::Insight,
    description: DescriptionRule::UnitPrefix,
    examples: ExampleRule::FenceAfter("code example"),
    unlabeled: UnlabeledFallback::KeywordSplit,
    title_from_heading: true,
    fallback_name: code_fallback_name,
};

pub static MULTIMODAL: StreamProfile = StreamProfile {
    name: "multimodal",
    granularity: Granularity::Lines,
    triggers: &[
        ("gotcha", Section::Pitfall),
        ("pitfall", Section::Pitfall),
        ("insights", Section::Architecture),
        ("architecture", Section::Architecture),
        ("system", Section::Architecture),
        ("implementation", Section::Implementation),
        ("approach", Section::Implementation),
        ("how to", Section::Implementation),
        ("avoid", Section::Pitfall),
        ("challenge", Section::Pitfall),
        ("issue", Section::Pitfall),
    ],
    min_capture_chars: 0,
    emits: Emits::Insight,
    description: DescriptionRule::UnitPrefix,
    examples: ExampleRule::FenceAfter("code example"),
    unlabeled: UnlabeledFallback::Sentences,
    title_from_heading: false,
    fallback_name: code_fallback_name,
};

/// Stream selector for the profile table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Code,
    Doc,
    Multimodal,
    Data,
}

impl Stream {
    pub fn profile(&self) -> &'static StreamProfile {
        match self {
            Stream::Code => &CODE,
            Stream::Doc => &DOC,
            Stream::Multimodal => &MULTIMODAL,
            Stream::Data => &DATA,
        }
    }
}

impl std::str::FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Stream::Code),
            "doc" | "docs" => Ok(Stream::Doc),
            "multimodal" => Ok(Stream::Multimodal),
            "data" => Ok(Stream::Data),
            other => Err(format!(
                "unknown stream '{}': expected code, doc, multimodal or data",
                other
            )),
        }
    }
}

/// Open pattern being accumulated.
#[derive(Default)]
struct Accumulator {
    name: Option<String>,
    capture_unit: String,
    lines: Vec<String>,
}

pub struct Parser<'a> {
    profile: &'a StreamProfile,
    limits: &'a ParserConfig,
}

impl<'a> Parser<'a> {
    pub fn new(profile: &'a StreamProfile, limits: &'a ParserConfig) -> Self {
        Self { profile, limits }
    }

    /// Parse with whichever record kind the profile emits.
    ///
    /// `context` is the pattern category for pattern streams and the
    /// default title for insight streams.
    pub fn parse(
        &self,
        raw: &str,
        source_path: &Path,
        context: &str,
        source: InsightSource,
    ) -> Vec<Record> {
        match self.profile.emits {
            Emits::Patterns => self
                .parse_patterns(raw, source_path, context)
                .into_iter()
                .map(Record::Pattern)
                .collect(),
            Emits::Insight => match self.parse_insight(raw, source_path, source, context) {
                Ok(insight) => vec![Record::Insight(insight)],
                Err(e) => {
                    tracing::debug!("dropping insight: {}", e);
                    Vec::new()
                }
            },
        }
    }

    /// Parse a pattern stream's analysis text.
    pub fn parse_patterns(&self, raw: &str, source_path: &Path, category: &str) -> Vec<Pattern> {
        let mut patterns = Vec::new();
        let mut open: Option<Accumulator> = None;

        for unit in self.units(raw) {
            if self.opens_pattern(&unit) {
                if let Some(acc) = open.take() {
                    self.flush(acc, source_path, category, &mut patterns);
                }
                open = Some(Accumulator {
                    name: self.capture_name(&unit),
                    capture_unit: unit.clone(),
                    lines: unit.lines().map(str::to_string).collect(),
                });
            } else if let Some(acc) = open.as_mut() {
                // A unit-prefix pattern is its capture unit alone.
                if !matches!(self.profile.description, DescriptionRule::UnitPrefix) {
                    acc.lines.extend(unit.lines().map(str::to_string));
                }
            }
        }
        if let Some(acc) = open.take() {
            self.flush(acc, source_path, category, &mut patterns);
        }

        if patterns.is_empty() && raw.trim().chars().count() > self.limits.fallback_floor {
            if let Some(fallback) = self.fallback_pattern(raw, source_path, category) {
                patterns.push(fallback);
            }
        }

        patterns.truncate(self.limits.max_records);
        patterns
    }

    /// Parse an insight stream's analysis text into one classified insight.
    pub fn parse_insight(
        &self,
        raw: &str,
        source_path: &Path,
        source: InsightSource,
        default_title: &str,
    ) -> Result<Insight, RecordError> {
        let mut buckets: BTreeMap<BucketTag, Vec<String>> = BTreeMap::new();
        let mut current: Option<BucketTag> = None;

        for unit in self.units(raw) {
            let line = unit.trim();
            if let Some(section) = self.header_section(line) {
                current = section.bucket();
                continue;
            }
            if let Some(point) = strip_bullet(line) {
                if point.is_empty() {
                    continue;
                }
                let tag = current.unwrap_or(BucketTag::Uncategorized);
                buckets.entry(tag).or_default().push(point.to_string());
            }
        }

        self.apply_unlabeled_fallback(raw, &mut buckets);

        let title = if self.profile.title_from_heading {
            heading_title(raw).unwrap_or_else(|| default_title.to_string())
        } else {
            default_title.to_string()
        };

        Ok(Insight::new(source, title, raw, source_path)?.with_buckets(buckets))
    }

    fn apply_unlabeled_fallback(&self, raw: &str, buckets: &mut BTreeMap<BucketTag, Vec<String>>) {
        match self.profile.unlabeled {
            UnlabeledFallback::Keep => {}
            UnlabeledFallback::KeywordSplit => {
                for point in buckets.remove(&BucketTag::Uncategorized).unwrap_or_default() {
                    let lower = point.to_lowercase();
                    let tag = if lower.contains("architecture") || lower.contains("design") {
                        BucketTag::Architecture
                    } else {
                        BucketTag::Implementation
                    };
                    buckets.entry(tag).or_default().push(point);
                }
            }
            UnlabeledFallback::Sentences if buckets.values().all(Vec::is_empty) => {
                for sentence in sentences(raw).into_iter().take(MAX_FALLBACK_SENTENCES) {
                    let lower = sentence.to_lowercase();
                    let tag = if ["implement", "build", "create"]
                        .iter()
                        .any(|k| lower.contains(k))
                    {
                        BucketTag::Implementation
                    } else if ["avoid", "gotcha", "pitfall", "issue"]
                        .iter()
                        .any(|k| lower.contains(k))
                    {
                        BucketTag::Pitfall
                    } else {
                        BucketTag::Uncategorized
                    };
                    buckets.entry(tag).or_default().push(sentence);
                }
            }
            _ => {}
        }
    }

    fn units(&self, raw: &str) -> Vec<String> {
        match self.profile.granularity {
            Granularity::Blocks => split_blocks(raw),
            Granularity::Lines => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Section a line switches to, if it is a header.
    ///
    /// A bullet only counts as a header when it is a bare label
    /// (`- **Pitfalls:**`); bullets with content are observations.
    fn header_section(&self, line: &str) -> Option<Section> {
        if let Some(point) = strip_bullet(line) {
            if !is_label_only(point) {
                return None;
            }
        }
        let norm = normalize(line);
        self.profile
            .triggers
            .iter()
            .find(|(phrase, _)| norm.contains(phrase))
            .map(|(_, section)| *section)
    }

    fn opens_pattern(&self, unit: &str) -> bool {
        if unit.trim().chars().count() < self.profile.min_capture_chars {
            return false;
        }
        let norm = normalize(unit);
        self.profile
            .triggers
            .iter()
            .any(|(phrase, section)| *section == Section::NameCapture && norm.contains(phrase))
    }

    /// Name from the line holding the capture trigger: the value after its
    /// colon, else the next non-empty line, else the line itself.
    fn capture_name(&self, unit: &str) -> Option<String> {
        let triggers: Vec<&str> = self
            .profile
            .triggers
            .iter()
            .filter(|(_, s)| *s == Section::NameCapture)
            .map(|(p, _)| *p)
            .collect();

        let lines: Vec<&str> = unit.lines().collect();
        let idx = lines
            .iter()
            .position(|l| triggers.iter().any(|t| normalize(l).contains(t)))?;

        let name = match label_value(lines[idx]) {
            Some(value) => value,
            None => lines[idx + 1..]
                .iter()
                .map(|l| strip_markup(l))
                .find(|l| !l.is_empty())
                .unwrap_or_else(|| strip_markup(lines[idx])),
        };

        let name = truncate_chars(name.trim(), MAX_NAME_CHARS);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    fn flush(
        &self,
        acc: Accumulator,
        source_path: &Path,
        category: &str,
        out: &mut Vec<Pattern>,
    ) {
        let description = self.describe(&acc);
        let snippets = self.examples(&acc.lines);
        let guidance = acc.lines.join("\n").trim().to_string();

        let name = acc.name.unwrap_or_default();
        match Pattern::new(category, name, description, source_path) {
            Ok(pattern) => out.push(
                pattern
                    .with_snippets(snippets)
                    .with_guidance(guidance)
                    .with_confidence(Confidence::Structured),
            ),
            Err(e) => tracing::debug!("dropping pattern: {}", e),
        }
    }

    fn describe(&self, acc: &Accumulator) -> String {
        match self.profile.description {
            DescriptionRule::UnitPrefix => {
                truncate_chars(acc.capture_unit.trim(), self.limits.fallback_prefix_chars)
            }
            DescriptionRule::Labeled(labels) => {
                for (i, line) in acc.lines.iter().enumerate() {
                    let norm = normalize(line);
                    if !labels.iter().any(|l| norm.contains(l)) {
                        continue;
                    }
                    if let Some(value) = label_value(line) {
                        return value;
                    }
                    if let Some(next) = acc.lines[i + 1..]
                        .iter()
                        .map(|l| l.trim())
                        .find(|l| !l.is_empty())
                    {
                        return next.to_string();
                    }
                }
                // No label: the first free-text line after the name line.
                let rest: Vec<&str> = acc
                    .lines
                    .iter()
                    .skip(1)
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty() && !l.starts_with("```"))
                    .collect();
                truncate_chars(&rest.join(" "), self.limits.fallback_prefix_chars)
            }
        }
    }

    fn examples(&self, lines: &[String]) -> Vec<String> {
        match self.profile.examples {
            ExampleRule::FenceAfter(label) => {
                let Some(start) = lines.iter().position(|l| normalize(l).contains(label)) else {
                    return Vec::new();
                };
                let code = fenced_block(&lines[start + 1..]);
                if code.is_empty() {
                    Vec::new()
                } else {
                    vec![code]
                }
            }
            ExampleRule::LinesContaining { needle, min_chars } => lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| l.to_ascii_lowercase().contains(needle) && l.chars().count() > min_chars)
                .take(self.limits.max_examples)
                .map(str::to_string)
                .collect(),
        }
    }

    fn fallback_pattern(&self, raw: &str, source_path: &Path, category: &str) -> Option<Pattern> {
        let name = (self.profile.fallback_name)(&file_name_of(source_path), category);
        let description = truncate_chars(raw.trim(), self.limits.fallback_prefix_chars);
        match Pattern::new(category, name, description, source_path) {
            Ok(p) => Some(
                p.with_guidance(raw)
                    .with_confidence(Confidence::Fallback),
            ),
            Err(e) => {
                tracing::debug!("no fallback pattern: {}", e);
                None
            }
        }
    }
}

/// Blank-line separated blocks. Blank lines inside a code fence do not
/// end a block.
pub fn split_blocks(raw: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in raw.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if line.trim().is_empty() && !in_fence {
            if !current.is_empty() {
                blocks.push(current.join("\n").trim().to_string());
                current.clear();
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current.join("\n").trim().to_string());
    }
    blocks.retain(|b| !b.is_empty());
    blocks
}

/// Text of a bullet line with its marker removed, or `None` for non-bullets.
pub fn strip_bullet(line: &str) -> Option<&str> {
    let line = line.trim_start();
    BULLETS
        .iter()
        .find(|marker| line.starts_with(*marker))
        .map(|marker| line[marker.len()..].trim())
}

fn is_label_only(point: &str) -> bool {
    let p = point.trim();
    p.ends_with(':') || p.ends_with(":**") || (p.starts_with("**") && p.ends_with("**"))
}

/// Remove heading hashes, list numbering, bullet markers and emphasis.
fn strip_markup(line: &str) -> String {
    let mut s = line.trim();
    s = s.trim_start_matches('#').trim_start();
    if let Some(point) = strip_bullet(s) {
        s = point;
    }
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            s = rest.trim_start();
        }
    }
    s.replace("**", "").replace('`', "").trim().to_string()
}

fn normalize(line: &str) -> String {
    strip_markup(line).to_ascii_lowercase()
}

/// Non-empty text after the first colon of a labeled line.
fn label_value(line: &str) -> Option<String> {
    let cleaned = strip_markup(line);
    let (_, value) = cleaned.split_once(':')?;
    let value = value.trim().trim_matches('*').trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Lines between the first pair of code fences.
fn fenced_block(lines: &[String]) -> String {
    let mut code: Vec<&str> = Vec::new();
    let mut in_code = false;
    for line in lines {
        if line.contains("```") {
            if in_code {
                break;
            }
            in_code = true;
        } else if in_code {
            code.push(line);
        }
    }
    code.join("\n")
}

fn heading_title(raw: &str) -> Option<String> {
    raw.lines()
        .map(str::trim)
        .find(|l| l.starts_with("# "))
        .map(|l| l.trim_start_matches("# ").trim().to_string())
        .filter(|t| !t.is_empty())
}

fn sentences(raw: &str) -> Vec<String> {
    raw.replace('\n', " ")
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocType, MediaKind};

    fn limits() -> ParserConfig {
        ParserConfig::default()
    }

    fn doc_source() -> InsightSource {
        InsightSource::Doc(DocType::Architecture)
    }

    #[test]
    fn code_scenario_extracts_name_description_and_example() {
        let raw = "Pattern Name: Retry Wrapper\n\nWhat it does: retries on failure\n\nCode example:\n```\nretry()\n```";
        let limits = limits();
        let patterns = Parser::new(&CODE, &limits).parse_patterns(raw, Path::new("src/net.py"), "net");
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.name, "Retry Wrapper");
        assert!(p.description.contains("retries on failure"));
        assert_eq!(p.code_example(), Some("retry()"));
        assert_eq!(p.confidence, Confidence::Structured);
        assert_eq!(p.category, "net");
    }

    #[test]
    fn bold_numbered_labels_are_recognised() {
        let raw = "1. **Pattern Name**: Token Cache\n2. **What it does**: caches tokens\n\n\
                   1. **Pattern Name**: Backoff\n2. **What it does**:\nwaits between attempts";
        let limits = limits();
        let patterns = Parser::new(&CODE, &limits).parse_patterns(raw, Path::new("a.rs"), "auth");
        let names: Vec<&str> = patterns.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Token Cache", "Backoff"]);
        assert_eq!(patterns[0].description, "caches tokens");
        assert_eq!(patterns[1].description, "waits between attempts");
    }

    #[test]
    fn fenced_code_with_blank_lines_stays_in_one_pattern() {
        let raw = "Pattern Name: Pool\n\nCode example:\n```\nlet a = 1;\n\nlet b = 2;\n```\n\nWhy: reuse";
        let limits = limits();
        let patterns = Parser::new(&CODE, &limits).parse_patterns(raw, Path::new("p.rs"), "db");
        assert_eq!(patterns[0].code_example(), Some("let a = 1;\n\nlet b = 2;"));
        assert!(patterns[0].guidance.contains("Why: reuse"));
    }

    #[test]
    fn unstructured_text_falls_back_to_one_record() {
        let raw = "This module wires a queue to a worker. ".repeat(10);
        let limits = limits();
        let patterns = Parser::new(&CODE, &limits).parse_patterns(&raw, Path::new("src/q.py"), "queue");
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].confidence, Confidence::Fallback);
        assert_eq!(patterns[0].name, "Implementation Pattern from q.py");
        assert_eq!(patterns[0].guidance, raw);
        assert_eq!(patterns[0].description.chars().count(), 200);
    }

    #[test]
    fn short_unstructured_text_yields_nothing() {
        let limits = limits();
        let patterns = Parser::new(&CODE, &limits).parse_patterns("too short", Path::new("a.py"), "x");
        assert!(patterns.is_empty());
    }

    #[test]
    fn records_are_capped() {
        let raw: String = (0..8)
            .map(|i| format!("Pattern Name: P{}\n\nWhat it does: thing {}\n\n", i, i))
            .collect();
        let limits = limits();
        let patterns = Parser::new(&CODE, &limits).parse_patterns(&raw, Path::new("a.py"), "x");
        assert_eq!(patterns.len(), 5);
        assert_eq!(patterns[4].name, "P4");
    }

    #[test]
    fn parsing_is_idempotent() {
        let raw = "Pattern Name: A\n\nWhat it does: x\n\nPattern Name: B\n\nWhat it does: y";
        let limits = limits();
        let parser = Parser::new(&CODE, &limits);
        let first = parser.parse_patterns(raw, Path::new("a.py"), "f");
        let second = parser.parse_patterns(raw, Path::new("a.py"), "f");
        assert_eq!(first, second);
    }

    #[test]
    fn data_blocks_mentioning_pattern_become_records() {
        let raw = "**Data Structure Patterns**: nested JSON objects keyed by resource id\n\
                   - Examples: {\"id\": 1, \"name\": \"a\"} appears everywhere\n\n\
                   Short pattern.\n\n\
                   **Content Patterns**: every record carries created_at and updated_at fields";
        let limits = limits();
        let patterns = Parser::new(&DATA, &limits).parse_patterns(raw, Path::new("d.json"), "structured-data");
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].category, "structured-data");
        assert_eq!(patterns[0].example_snippets.len(), 1);
        assert!(patterns[0].description.starts_with("**Data Structure Patterns**"));
        assert_eq!(patterns[0].confidence.score(), 0.8);
    }

    #[test]
    fn data_examples_come_from_their_own_block() {
        let raw = "**Naming Patterns**: resources are named with lowercase snake case throughout\n\n\
                   Unrelated note.\n- Example: {\"id\": 7, \"kind\": \"other\"} from elsewhere";
        let limits = limits();
        let patterns = Parser::new(&DATA, &limits).parse_patterns(raw, Path::new("d.json"), "structured-data");
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].example_snippets.is_empty());
        assert!(!patterns[0].guidance.contains("Unrelated note"));
    }

    #[test]
    fn doc_sections_route_bullets() {
        let raw = "# Payment Service\n\n## Architectural Insights\n- Event sourced ledger\n* Idempotent handlers\n\n\
                   ## Implementation Guidance\n- Use a saga per order\n";
        let limits = limits();
        let insight = Parser::new(&DOC, &limits)
            .parse_insight(raw, Path::new("docs/ARCH.md"), doc_source(), "ARCH")
            .unwrap();
        assert_eq!(insight.title, "Payment Service");
        assert_eq!(insight.architecture(), ["Event sourced ledger", "Idempotent handlers"]);
        assert_eq!(insight.implementation(), ["Use a saga per order"]);
    }

    #[test]
    fn header_mid_bullets_keeps_earlier_bullets() {
        let raw = "Architectural insights\n- a\n- b\nImplementation guidance\n- c";
        let limits = limits();
        let insight = Parser::new(&DOC, &limits)
            .parse_insight(raw, Path::new("x.md"), doc_source(), "x")
            .unwrap();
        assert_eq!(insight.architecture(), ["a", "b"]);
        assert_eq!(insight.implementation(), ["c"]);
    }

    #[test]
    fn doc_without_sections_splits_by_keyword() {
        let raw = "- Layered design with ports\n- Run migrations before deploy";
        let limits = limits();
        let insight = Parser::new(&DOC, &limits)
            .parse_insight(raw, Path::new("notes.md"), doc_source(), "notes")
            .unwrap();
        assert_eq!(insight.title, "notes");
        assert_eq!(insight.architecture(), ["Layered design with ports"]);
        assert_eq!(insight.implementation(), ["Run migrations before deploy"]);
        assert!(insight.bullets(BucketTag::Uncategorized).is_empty());
    }

    #[test]
    fn bullet_markers_strip_to_same_text() {
        let raw = "Gotchas:\n- one\n* two\n•three\n• four";
        let limits = limits();
        let insight = Parser::new(&MULTIMODAL, &limits)
            .parse_insight(raw, Path::new("run.log"), InsightSource::Media(MediaKind::Logs), "t")
            .unwrap();
        assert_eq!(insight.pitfalls(), ["one", "two", "three", "four"]);
    }

    #[test]
    fn multimodal_unsectioned_bullets_are_uncategorized() {
        let raw = "- the cache warms on boot";
        let limits = limits();
        let insight = Parser::new(&MULTIMODAL, &limits)
            .parse_insight(raw, Path::new("a.png"), InsightSource::Media(MediaKind::Image), "t")
            .unwrap();
        assert_eq!(insight.bullets(BucketTag::Uncategorized), ["the cache warms on boot"]);
        assert_eq!(insight.general(), vec!["the cache warms on boot"]);
    }

    #[test]
    fn content_bullets_are_not_headers() {
        let raw = "Key insights:\n- The system retries twice\n- Approach is lazy";
        let limits = limits();
        let insight = Parser::new(&MULTIMODAL, &limits)
            .parse_insight(raw, Path::new("a.png"), InsightSource::Media(MediaKind::Image), "t")
            .unwrap();
        assert_eq!(insight.architecture(), ["The system retries twice", "Approach is lazy"]);
    }

    #[test]
    fn sentence_fallback_classifies_first_ten() {
        let mut raw = String::from("Build the index first. Avoid locking the table. The cache is warm. ");
        for i in 0..12 {
            raw.push_str(&format!("Filler {}. ", i));
        }
        let limits = limits();
        let insight = Parser::new(&MULTIMODAL, &limits)
            .parse_insight(&raw, Path::new("r.pdf"), InsightSource::Media(MediaKind::BinaryDoc), "t")
            .unwrap();
        assert_eq!(insight.implementation(), ["Build the index first"]);
        assert_eq!(insight.pitfalls(), ["Avoid locking the table"]);
        assert_eq!(insight.bullets(BucketTag::Uncategorized).len(), 8);
    }

    #[test]
    fn more_headers_never_mean_more_uncategorized() {
        let limits = limits();
        let cases = [
            (&MULTIMODAL, InsightSource::Media(MediaKind::Logs), "- a\n- b", "Gotchas:\n- a\n- b"),
            (&DOC, doc_source(), "- a\n- b\n- c", "- a\n- b\nGotchas:\n- c"),
        ];
        for (profile, src, bare, labeled) in cases {
            let parser = Parser::new(profile, &limits);
            let a = parser.parse_insight(bare, Path::new("l.md"), src, "t").unwrap();
            let b = parser.parse_insight(labeled, Path::new("l.md"), src, "t").unwrap();
            assert!(
                b.bullets(BucketTag::Uncategorized).len() <= a.bullets(BucketTag::Uncategorized).len(),
                "{} profile",
                profile.name
            );
        }
    }

    #[test]
    fn doc_bullets_before_a_section_split_by_keyword() {
        let raw = "- Hexagonal design at the edges\n- Seed the cache on boot\nGotchas:\n- Clock skew";
        let limits = limits();
        let insight = Parser::new(&DOC, &limits)
            .parse_insight(raw, Path::new("notes.md"), doc_source(), "notes")
            .unwrap();
        assert_eq!(insight.architecture(), ["Hexagonal design at the edges"]);
        assert_eq!(insight.implementation(), ["Seed the cache on boot"]);
        assert_eq!(insight.pitfalls(), ["Clock skew"]);
        assert!(insight.bullets(BucketTag::Uncategorized).is_empty());
    }

    #[test]
    fn stream_names_parse() {
        assert_eq!("doc".parse::<Stream>().unwrap(), Stream::Doc);
        assert_eq!("data".parse::<Stream>().unwrap().profile().name, "data");
        assert!("video".parse::<Stream>().is_err());
    }
}
