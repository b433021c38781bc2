//! Pipeline orchestration.
//!
//! Two entry points drive the streams end to end:
//!
//! - [`run_manifest`] reads a source-analysis manifest, routes its paths to
//!   the code, doc and multimodal streams, assembles the guides and writes
//!   the library.
//! - [`run_auto`] discovers patterns in an unlabeled data directory,
//!   writes a manifest for it, and builds a library from what it found.
//!
//! # Failure model
//!
//! Missing prerequisites (no analysis provider, missing manifest or data
//! directory) fail the run before anything is written. Per-file failures
//! are logged and skipped; the run still succeeds. Guides already written
//! before a later fatal error stay on disk.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assembler::{Assembler, GenerationStamp, KnowledgeSet};
use crate::config::Config;
use crate::discovery::discover_patterns;
use crate::gateway::{is_soft_failure, AnalysisGateway, AnalysisRequest};
use crate::grouper::FeatureRules;
use crate::library;
use crate::manifest::{filter_existing, load_manifest};
use crate::models::{FileCategory, Guide, GuideKind};
use crate::progress::ProgressReporter;
use crate::relate::KeywordOverlap;
use crate::source_analysis::{api_documentation_patterns, generate_source_analysis, save_source_analysis};
use crate::stream_code::extract_code_patterns;
use crate::stream_docs::{analyze_doc_files, extract_doc_insights};
use crate::stream_media::extract_media_insights;

/// Doc files routed to the doc stream in auto mode.
const AUTO_MAX_DOC_FILES: usize = 20;

/// Fatal pipeline preconditions.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no analysis capability available (provider: {0}); set [analysis] in the config")]
    NoAnalysisProvider(String),

    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    #[error("no data patterns discovered under {0}")]
    NoPatterns(PathBuf),
}

/// Shared, read-only state handed to every stream.
pub struct RunContext<'a> {
    pub config: &'a Config,
    pub gateway: &'a dyn AnalysisGateway,
    pub progress: &'a dyn ProgressReporter,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a Config,
        gateway: &'a dyn AnalysisGateway,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            config,
            gateway,
            progress,
        }
    }

    /// Submit one request. Soft failures are logged and yield `None`, so
    /// the caller skips the file.
    pub async fn analyze(&self, request: &AnalysisRequest, path: &Path) -> Option<String> {
        let text = self.gateway.analyze(request).await;
        if is_soft_failure(&text) {
            tracing::warn!(
                "skipping {}: {}",
                path.display(),
                text.lines().next().unwrap_or_default()
            );
            return None;
        }
        Some(text)
    }

    fn ensure_available(&self) -> Result<(), PipelineError> {
        if self.gateway.is_available() {
            Ok(())
        } else {
            Err(PipelineError::NoAnalysisProvider(
                self.gateway.name().to_string(),
            ))
        }
    }
}

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    pub knowledge: KnowledgeSet,
    pub guides: Vec<Guide>,
    pub written: Vec<PathBuf>,
    pub output_root: PathBuf,
    /// Manifest written by auto mode.
    pub manifest_path: Option<PathBuf>,
}

impl RunReport {
    pub fn guides_of(&self, kind: GuideKind) -> Vec<&Guide> {
        self.guides.iter().filter(|g| g.kind == kind).collect()
    }
}

/// Run the manifest-driven pipeline.
pub async fn run_manifest(
    manifest_path: &Path,
    ctx: &RunContext<'_>,
    stamp: &GenerationStamp,
) -> Result<RunReport> {
    ctx.ensure_available()?;
    if !manifest_path.exists() {
        return Err(PipelineError::MissingInput(manifest_path.to_path_buf()).into());
    }

    let sources = filter_existing(load_manifest(manifest_path)?);
    tracing::info!(
        "manifest: {} code, {} doc, {} multimodal sources",
        sources.code.len(),
        sources.docs.len(),
        sources.multimodal.len()
    );

    let output_root = ctx.config.output.root.clone();
    library::init_layout(&output_root)?;

    let code = extract_code_patterns(&sources.code, &FeatureRules::default(), ctx).await?;
    let docs = extract_doc_insights(&sources.docs, ctx).await?;
    let media = extract_media_insights(&sources.multimodal, ctx).await?;

    let knowledge = KnowledgeSet { code, docs, media };
    finish(knowledge, &output_root, None, ctx, stamp)
}

/// Run auto mode over an unlabeled data directory.
pub async fn run_auto(
    data_dir: &Path,
    use_case: &str,
    manifest_out: &Path,
    ctx: &RunContext<'_>,
    stamp: &GenerationStamp,
) -> Result<RunReport> {
    ctx.ensure_available()?;
    if !data_dir.exists() {
        return Err(PipelineError::MissingInput(data_dir.to_path_buf()).into());
    }

    let discovery = discover_patterns(data_dir, ctx).await?;
    if discovery.pattern_count() == 0 {
        return Err(PipelineError::NoPatterns(data_dir.to_path_buf()).into());
    }

    let manifest = generate_source_analysis(&discovery, data_dir, use_case, ctx, stamp).await;
    save_source_analysis(&manifest, manifest_out)?;
    tracing::info!("source analysis written to {}", manifest_out.display());

    let output_root = ctx.config.output.root.clone();
    library::init_layout(&output_root)?;

    // Only categories that yielded patterns are routed onward.
    let discovered = |c: &FileCategory| discovery.patterns.contains_key(c);

    let api_files: &[PathBuf] = if discovered(&FileCategory::StructuredData) {
        discovery.inventory.files(FileCategory::StructuredData)
    } else {
        &[]
    };
    let code = api_documentation_patterns(api_files);

    let doc_files: Vec<PathBuf> = [FileCategory::LongFormDoc, FileCategory::ShortTextDoc]
        .iter()
        .filter(|c| discovered(c))
        .flat_map(|c| discovery.inventory.files(*c).iter().cloned())
        .take(AUTO_MAX_DOC_FILES)
        .collect();
    let docs = analyze_doc_files(&doc_files, ctx).await;

    let knowledge = KnowledgeSet {
        code,
        docs,
        media: BTreeMap::new(),
    };
    finish(
        knowledge,
        &output_root,
        Some(manifest_out.to_path_buf()),
        ctx,
        stamp,
    )
}

fn finish(
    knowledge: KnowledgeSet,
    output_root: &Path,
    manifest_path: Option<PathBuf>,
    ctx: &RunContext<'_>,
    stamp: &GenerationStamp,
) -> Result<RunReport> {
    let relatedness = KeywordOverlap;
    let assembler = Assembler::new(&relatedness, stamp.clone());
    let guides = assembler.assemble(&knowledge);
    tracing::info!("assembled {} guides", guides.len());

    let written = library::write_all(&guides, output_root, ctx.progress)
        .with_context(|| format!("Failed to write library to {}", output_root.display()))?;

    Ok(RunReport {
        knowledge,
        guides,
        written,
        output_root: output_root.to_path_buf(),
        manifest_path,
    })
}

/// Print the run summary to stdout.
pub fn print_summary(report: &RunReport) {
    let k = &report.knowledge;
    println!("run");
    if let Some(manifest) = &report.manifest_path {
        println!("  source analysis: {}", manifest.display());
    }
    println!(
        "  code patterns: {} ({} features)",
        k.code.pattern_count(),
        k.code.patterns.len()
    );
    println!(
        "  doc insights: {} ({} doc types)",
        k.docs.values().map(Vec::len).sum::<usize>(),
        k.docs.len()
    );
    println!(
        "  multimodal insights: {} ({} kinds)",
        k.media.values().map(Vec::len).sum::<usize>(),
        k.media.len()
    );
    for kind in GuideKind::ALL {
        let guides = report.guides_of(kind);
        println!("  {} guides: {}", kind.label(), guides.len());
        for guide in guides.iter().take(3) {
            println!("    - {}", guide.title);
        }
        if guides.len() > 3 {
            println!("    ... and {} more", guides.len() - 3);
        }
    }
    println!("  files written: {}", report.written.len());
    for kind in GuideKind::ALL {
        println!("  {}", report.output_root.join(kind.dir_name()).display());
    }
    println!("ok");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{DisabledGateway, ScriptedGateway};
    use crate::progress::NoProgress;

    #[tokio::test]
    async fn soft_failure_yields_none() {
        let config = Config::minimal();
        let gateway = DisabledGateway;
        let ctx = RunContext::new(&config, &gateway, &NoProgress);
        let request = AnalysisRequest::text("x", "y", crate::gateway::ContentKind::Code);
        assert!(ctx.analyze(&request, Path::new("a.py")).await.is_none());
    }

    #[tokio::test]
    async fn usable_text_passes_through() {
        let config = Config::minimal();
        let gateway = ScriptedGateway::new("Pattern Name: Thing");
        let ctx = RunContext::new(&config, &gateway, &NoProgress);
        let request = AnalysisRequest::text("x", "y", crate::gateway::ContentKind::Code);
        assert_eq!(
            ctx.analyze(&request, Path::new("a.py")).await.as_deref(),
            Some("Pattern Name: Thing")
        );
    }

    #[tokio::test]
    async fn run_without_provider_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::minimal();
        config.output.root = dir.path().join("library");
        let gateway = DisabledGateway;
        let ctx = RunContext::new(&config, &gateway, &NoProgress);

        let err = run_manifest(&dir.path().join("m.md"), &ctx, &GenerationStamp::fixed("2024-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoAnalysisProvider(_))
        ));
        assert!(!config.output.root.exists());
    }

    #[tokio::test]
    async fn missing_manifest_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::minimal();
        let gateway = ScriptedGateway::new("");
        let ctx = RunContext::new(&config, &gateway, &NoProgress);

        let err = run_manifest(&dir.path().join("absent.md"), &ctx, &GenerationStamp::fixed("2024-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingInput(_))
        ));
    }
}
