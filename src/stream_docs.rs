//! Documentation stream.
//!
//! Finds documentation files, assigns each a [`DocType`] and turns the
//! analysis of each file into one [`Insight`].

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::gateway::{AnalysisRequest, ContentKind};
use crate::models::{file_name_of, DocType, Insight, InsightSource};
use crate::parser::{Parser, DOC};
use crate::pipeline::RunContext;
use crate::progress::ProgressEvent;
use crate::prompts::doc_instruction;
use crate::scanner::walk_files;

/// Well-known documentation file names per doc type, checked in order.
pub const DOC_FILENAMES: &[(DocType, &[&str])] = &[
    (
        DocType::Readme,
        &["README.md", "readme.md", "README.rst", "README.txt"],
    ),
    (
        DocType::Api,
        &["api.md", "API.md", "openapi.yaml", "swagger.json", "swagger.yaml"],
    ),
    (
        DocType::Architecture,
        &["ARCHITECTURE.md", "architecture.md", "DESIGN.md", "design.md"],
    ),
    (
        DocType::Setup,
        &["INSTALL.md", "SETUP.md", "setup.md", "installation.md"],
    ),
    (
        DocType::Deployment,
        &["DEPLOY.md", "deployment.md", "docker-compose.yml", "Dockerfile"],
    ),
    (
        DocType::Contributing,
        &["CONTRIBUTING.md", "DEVELOPMENT.md", "developer.md"],
    ),
];

/// Extensions accepted when a manifest names a single documentation file.
pub const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "yaml", "yml", "json"];

/// Documentation files for one manifest path.
///
/// A file is accepted by extension. A directory contributes its well-known
/// top-level doc files, and when its path mentions "doc", every `.md`
/// beneath it as well.
pub fn find_documentation_files(path: &Path, ctx: &RunContext<'_>) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        let accepted = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| DOC_EXTENSIONS.contains(&e.as_str()));
        return Ok(if accepted {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    for (_, names) in DOC_FILENAMES {
        for name in *names {
            let candidate = path.join(name);
            // Case-insensitive filesystems report both README.md and readme.md.
            if candidate.is_file() && !files.iter().any(|f: &PathBuf| same_file(f, &candidate)) {
                files.push(candidate);
            }
        }
    }

    if path.to_string_lossy().to_lowercase().contains("doc") {
        for file in walk_files(path, &ctx.config.scan)? {
            let is_md = file
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("md"));
            if is_md && !files.iter().any(|f| same_file(f, &file)) {
                files.push(file);
            }
        }
    }

    Ok(files)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Doc type from the file name, then from clues in the path.
pub fn identify_doc_type(path: &Path) -> DocType {
    let name = file_name_of(path).to_lowercase();
    for (doc_type, names) in DOC_FILENAMES {
        if names.iter().any(|n| name.contains(&n.to_lowercase())) {
            return *doc_type;
        }
    }

    let full = path.to_string_lossy().to_lowercase();
    if full.contains("api") {
        DocType::Api
    } else if full.contains("setup") || full.contains("install") {
        DocType::Setup
    } else if full.contains("deploy") {
        DocType::Deployment
    } else if full.contains("arch") || full.contains("design") {
        DocType::Architecture
    } else {
        DocType::General
    }
}

/// Run the doc stream over the manifest's documentation sources.
pub async fn extract_doc_insights(
    sources: &[PathBuf],
    ctx: &RunContext<'_>,
) -> Result<BTreeMap<DocType, Vec<Insight>>> {
    ctx.progress.report(ProgressEvent::Discovering {
        stream: "docs".to_string(),
    });

    let mut files = Vec::new();
    for source in sources {
        for file in find_documentation_files(source, ctx)? {
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }
    tracing::info!("docs: {} files", files.len());

    Ok(analyze_doc_files(&files, ctx).await)
}

/// Analyze an explicit list of documentation files.
pub async fn analyze_doc_files(
    files: &[PathBuf],
    ctx: &RunContext<'_>,
) -> BTreeMap<DocType, Vec<Insight>> {
    let parser = Parser::new(&DOC, &ctx.config.parser);
    let total = files.len() as u64;
    let mut insights: BTreeMap<DocType, Vec<Insight>> = BTreeMap::new();

    for (i, file) in files.iter().enumerate() {
        ctx.progress.report(ProgressEvent::Analyzing {
            stream: "docs".to_string(),
            n: i as u64 + 1,
            total,
            file: file_name_of(file),
        });

        let content = match std::fs::read(file) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!("could not read {}: {}", file.display(), e);
                continue;
            }
        };
        if content.trim().chars().count() < ctx.config.streams.min_content_chars {
            tracing::debug!("skipping near-empty {}", file.display());
            continue;
        }

        let doc_type = identify_doc_type(file);
        let request = AnalysisRequest::text(
            content,
            doc_instruction(doc_type),
            ContentKind::Documentation,
        );
        let Some(analysis) = ctx.analyze(&request, file).await else {
            continue;
        };

        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name_of(file));
        match parser.parse_insight(&analysis, file, InsightSource::Doc(doc_type), &stem) {
            Ok(insight) => insights.entry(doc_type).or_default().push(insight),
            Err(e) => tracing::warn!("dropping insight for {}: {}", file.display(), e),
        }
    }

    insights
}
