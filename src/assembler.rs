//! Document assembler.
//!
//! Merges the records of all streams into the guide set:
//!
//! 1. one how-to-build guide per feature with at least one pattern,
//! 2. one pattern guide per pattern,
//! 3. one architecture guide per architecture-like doc type,
//! 4. exactly one aggregate pitfalls guide.
//!
//! Guides are returned in that order. Two guides of the same kind with the
//! same filename would overwrite each other on disk, so only the first is
//! kept. Assembly does no I/O; see [`crate::library`] for persistence.

use std::collections::{BTreeMap, HashSet};

use crate::models::{DocType, Guide, GuideKind, Insight, MediaKind, GENERATED_ON_PREFIX};
use crate::relate::Relatedness;
use crate::render::{architecture_guide, how_to_build, pattern_guide, pitfalls_guide, HowToBuild};
use crate::stream_code::CodeKnowledge;

/// Everything the streams produced in one run.
#[derive(Debug, Default)]
pub struct KnowledgeSet {
    pub code: CodeKnowledge,
    pub docs: BTreeMap<DocType, Vec<Insight>>,
    pub media: BTreeMap<MediaKind, Vec<Insight>>,
}

/// Date stamped into the single `*Generated on: ...*` line of every guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStamp {
    date: String,
    time: String,
}

impl GenerationStamp {
    pub fn now() -> Self {
        let now = chrono::Local::now();
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
        }
    }

    /// A pinned date at midnight.
    pub fn fixed(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: "00:00:00".to_string(),
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn timestamp(&self) -> String {
        format!("{} {}", self.date, self.time)
    }

    /// The guide footer line.
    pub fn line(&self) -> String {
        format!("{}{}*", GENERATED_ON_PREFIX, self.date)
    }
}

pub struct Assembler<'a> {
    relatedness: &'a dyn Relatedness,
    stamp: GenerationStamp,
}

impl<'a> Assembler<'a> {
    pub fn new(relatedness: &'a dyn Relatedness, stamp: GenerationStamp) -> Self {
        Self { relatedness, stamp }
    }

    pub fn assemble(&self, knowledge: &KnowledgeSet) -> Vec<Guide> {
        let architecture: Vec<Guide> = knowledge
            .docs
            .iter()
            .filter(|(doc_type, _)| doc_type.is_architecture_like())
            .filter_map(|(doc_type, insights)| architecture_guide(*doc_type, insights, &self.stamp))
            .collect();
        let architecture_links: Vec<(String, String)> = architecture
            .iter()
            .map(|g| (g.title.clone(), g.filename.clone()))
            .collect();

        let mut guides = Vec::new();

        for (feature, patterns) in &knowledge.code.patterns {
            if patterns.is_empty() {
                continue;
            }
            let related_docs = self.related_docs(feature, &knowledge.docs);
            let related_media = self.related_media(feature, &knowledge.media);
            tracing::debug!(
                "{}: {} patterns, {} related docs, {} related media",
                feature,
                patterns.len(),
                related_docs.len(),
                related_media.len()
            );
            guides.push(how_to_build(
                &HowToBuild {
                    feature,
                    patterns,
                    related_docs: &related_docs,
                    related_media: &related_media,
                    architecture_links: &architecture_links,
                },
                &self.stamp,
            ));
        }

        for (feature, patterns) in &knowledge.code.patterns {
            for pattern in patterns {
                guides.push(pattern_guide(pattern, feature, &self.stamp));
            }
        }

        guides.extend(architecture);
        guides.push(self.pitfalls(knowledge));

        dedup_by_filename(guides)
    }

    /// Doc insights whose title or text mention the feature.
    pub fn related_docs<'k>(
        &self,
        feature: &str,
        docs: &'k BTreeMap<DocType, Vec<Insight>>,
    ) -> Vec<&'k Insight> {
        docs.values()
            .flatten()
            .filter(|i| {
                let haystack = format!("{} {}", i.title, i.raw_text);
                self.relatedness.is_related(feature, &haystack)
            })
            .collect()
    }

    /// Multimodal insights whose observations mention the feature.
    pub fn related_media<'k>(
        &self,
        feature: &str,
        media: &'k BTreeMap<MediaKind, Vec<Insight>>,
    ) -> Vec<&'k Insight> {
        media
            .values()
            .flatten()
            .filter(|i| {
                let mut haystack = i.general().join(" ");
                haystack.push(' ');
                haystack.push_str(&i.implementation().join(" "));
                self.relatedness.is_related(feature, &haystack)
            })
            .collect()
    }

    fn pitfalls(&self, knowledge: &KnowledgeSet) -> Guide {
        let log_pitfalls: Vec<&str> = knowledge
            .media
            .get(&MediaKind::Logs)
            .into_iter()
            .flatten()
            .flat_map(|i| i.pitfalls())
            .map(String::as_str)
            .collect();

        let other_pitfalls: Vec<&str> = knowledge
            .media
            .iter()
            .filter(|(kind, _)| **kind != MediaKind::Logs)
            .flat_map(|(_, insights)| insights)
            .chain(knowledge.docs.values().flatten())
            .flat_map(|i| i.pitfalls())
            .map(String::as_str)
            .collect();

        pitfalls_guide(&log_pitfalls, &other_pitfalls, &self.stamp)
    }
}

fn dedup_by_filename(guides: Vec<Guide>) -> Vec<Guide> {
    let mut seen: HashSet<(GuideKind, String)> = HashSet::new();
    guides
        .into_iter()
        .filter(|g| {
            let fresh = seen.insert((g.kind, g.filename.clone()));
            if !fresh {
                tracing::debug!("duplicate guide {} skipped", g.filename);
            }
            fresh
        })
        .collect()
}
