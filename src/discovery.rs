//! Data discovery stream.
//!
//! Scan → sample → bundle → analyze → parse. Each non-empty category of
//! the inventory becomes one bundle of at most
//! `sampling.max_samples_per_bundle` samples, sent as a single request, and
//! the answer is parsed into [`Pattern`]s whose category is the file
//! category name.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::gateway::{AnalysisRequest, ContentKind};
use crate::models::{FileCategory, Pattern, Sample};
use crate::parser::{Parser, DATA};
use crate::pipeline::RunContext;
use crate::progress::ProgressEvent;
use crate::prompts::data_instruction;
use crate::sampler::sample;
use crate::scanner::{scan, Inventory};

pub const SAMPLE_SEPARATOR: &str = "\n\n=== SAMPLE ===\n\n";

/// Inventory of a data directory and the patterns found in it.
#[derive(Debug, Default)]
pub struct Discovery {
    pub inventory: Inventory,
    pub patterns: BTreeMap<FileCategory, Vec<Pattern>>,
}

impl Discovery {
    pub fn pattern_count(&self) -> usize {
        self.patterns.values().map(Vec::len).sum()
    }
}

/// Render samples as one analysis payload.
pub fn bundle(samples: &[Sample]) -> String {
    samples
        .iter()
        .map(|s| {
            format!(
                "File: {}\nType: {}\nContent:\n{}",
                s.source_path.display(),
                s.kind.as_str(),
                s.text
            )
        })
        .collect::<Vec<_>>()
        .join(SAMPLE_SEPARATOR)
}

/// Discover data patterns under `root`.
pub async fn discover_patterns(root: &Path, ctx: &RunContext<'_>) -> Result<Discovery> {
    ctx.progress.report(ProgressEvent::Discovering {
        stream: "data".to_string(),
    });

    let inventory = scan(root, &ctx.config.scan)?;
    tracing::info!("data: {} files in {}", inventory.total(), root.display());

    let parser = Parser::new(&DATA, &ctx.config.parser);
    let mut patterns: BTreeMap<FileCategory, Vec<Pattern>> = BTreeMap::new();

    let bundles: Vec<(FileCategory, Vec<Sample>)> = inventory
        .iter()
        .map(|(category, files)| {
            let samples: Vec<Sample> = files
                .iter()
                .flat_map(|f| sample(f, category, &ctx.config.sampling))
                .collect();
            (category, samples)
        })
        .filter(|(_, samples)| !samples.is_empty())
        .collect();
    let total = bundles.len() as u64;

    for (i, (category, samples)) in bundles.into_iter().enumerate() {
        let kept = &samples[..samples.len().min(ctx.config.sampling.max_samples_per_bundle)];
        let Some(first) = kept.first() else {
            continue;
        };
        let source = first.source_path.clone();
        tracing::debug!(
            "{}: {} samples, {} bundled",
            category,
            samples.len(),
            kept.len()
        );

        ctx.progress.report(ProgressEvent::Analyzing {
            stream: "data".to_string(),
            n: i as u64 + 1,
            total,
            file: category.to_string(),
        });

        let request =
            AnalysisRequest::text(bundle(kept), data_instruction(category), ContentKind::Text);
        let Some(analysis) = ctx.analyze(&request, &source).await else {
            continue;
        };

        let found = parser.parse_patterns(&analysis, &source, category.as_str());
        if !found.is_empty() {
            patterns.insert(category, found);
        }
    }

    Ok(Discovery {
        inventory,
        patterns,
    })
}
