//! Multimodal stream: images, binary documents and execution logs.
//!
//! Images go to the gateway as files; PDF and DOCX text is extracted
//! locally first; logs are read up to `streams.log_read_bytes`. Every
//! analysis is parsed with the multimodal profile into one [`Insight`].

use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::extract;
use crate::gateway::{AnalysisRequest, ContentKind};
use crate::models::{file_name_of, Insight, InsightSource, MediaKind};
use crate::parser::{Parser, MULTIMODAL};
use crate::pipeline::RunContext;
use crate::progress::ProgressEvent;
use crate::prompts::{BINARY_DOC_INSTRUCTION, IMAGE_INSTRUCTION, LOG_INSTRUCTION};
use crate::scanner::walk_files;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "svg"];
pub const LOG_EXTENSIONS: &[&str] = &["log", "txt", "out"];

/// Media kind by extension, if the file belongs to this stream.
pub fn media_kind_of(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if extract::SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::BinaryDoc)
    } else if LOG_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Logs)
    } else {
        None
    }
}

/// Media files under the given paths, per kind, each list capped by config.
pub fn collect_media(
    sources: &[PathBuf],
    ctx: &RunContext<'_>,
) -> Result<BTreeMap<MediaKind, Vec<PathBuf>>> {
    let limits = &ctx.config.streams;
    let mut found: BTreeMap<MediaKind, Vec<PathBuf>> = BTreeMap::new();

    for source in sources {
        for file in walk_files(source, &ctx.config.scan)? {
            let Some(kind) = media_kind_of(&file) else {
                continue;
            };
            let cap = match kind {
                MediaKind::Image => limits.max_images,
                MediaKind::BinaryDoc => limits.max_binary_docs,
                MediaKind::Logs => limits.max_logs,
            };
            let list = found.entry(kind).or_default();
            if list.len() < cap && !list.contains(&file) {
                list.push(file);
            }
        }
    }
    Ok(found)
}

/// Run the multimodal stream over the manifest's media sources.
pub async fn extract_media_insights(
    sources: &[PathBuf],
    ctx: &RunContext<'_>,
) -> Result<BTreeMap<MediaKind, Vec<Insight>>> {
    ctx.progress.report(ProgressEvent::Discovering {
        stream: "multimodal".to_string(),
    });

    let files = collect_media(sources, ctx)?;
    let total: u64 = files.values().map(|v| v.len() as u64).sum();
    tracing::info!(
        "multimodal: {} images, {} documents, {} logs",
        files.get(&MediaKind::Image).map_or(0, Vec::len),
        files.get(&MediaKind::BinaryDoc).map_or(0, Vec::len),
        files.get(&MediaKind::Logs).map_or(0, Vec::len)
    );

    let parser = Parser::new(&MULTIMODAL, &ctx.config.parser);
    let mut insights: BTreeMap<MediaKind, Vec<Insight>> = BTreeMap::new();
    let mut n = 0u64;

    for (kind, paths) in &files {
        for path in paths {
            n += 1;
            ctx.progress.report(ProgressEvent::Analyzing {
                stream: "multimodal".to_string(),
                n,
                total,
                file: file_name_of(path),
            });

            let Some(request) = build_request(*kind, path, ctx.config.streams.log_read_bytes)
            else {
                continue;
            };
            let Some(analysis) = ctx.analyze(&request, path).await else {
                continue;
            };

            match parser.parse_insight(
                &analysis,
                path,
                InsightSource::Media(*kind),
                &file_name_of(path),
            ) {
                Ok(insight) => insights.entry(*kind).or_default().push(insight),
                Err(e) => tracing::warn!("dropping insight for {}: {}", path.display(), e),
            }
        }
    }

    Ok(insights)
}

fn build_request(kind: MediaKind, path: &Path, log_read_bytes: usize) -> Option<AnalysisRequest> {
    match kind {
        MediaKind::Image => Some(AnalysisRequest::image(path, IMAGE_INSTRUCTION)),
        MediaKind::BinaryDoc => match extract::extract_file(path) {
            Ok(text) if !text.trim().is_empty() => Some(AnalysisRequest::text(
                text,
                BINARY_DOC_INSTRUCTION,
                ContentKind::Documentation,
            )),
            Ok(_) => {
                tracing::warn!("no text extracted from {}", path.display());
                None
            }
            Err(e) => {
                tracing::warn!("{}: {}", path.display(), e);
                None
            }
        },
        MediaKind::Logs => match read_head(path, log_read_bytes) {
            Ok(text) => Some(AnalysisRequest::text(text, LOG_INSTRUCTION, ContentKind::Logs)),
            Err(e) => {
                tracing::warn!("could not read {}: {}", path.display(), e);
                None
            }
        },
    }
}

/// First `limit` bytes of a file, lossily decoded.
fn read_head(path: &Path, limit: usize) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::new();
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
