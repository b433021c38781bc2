//! Code stream.
//!
//! Finds source files, groups them into features, analyzes the largest
//! files of each feature and parses the answers into [`Pattern`]s.
//!
//! # Key file selection
//!
//! Per feature, only files strictly between `streams.min_file_bytes` and
//! `streams.max_file_bytes` are considered (tiny stubs and generated
//! blobs are skipped), largest first, at most
//! `streams.max_files_per_feature`. Files whose trimmed content is shorter
//! than `streams.min_content_chars` are skipped after reading.

use anyhow::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::StreamsConfig;
use crate::gateway::{AnalysisRequest, ContentKind};
use crate::grouper::FeatureRules;
use crate::models::{file_name_of, FeatureGroup, Pattern};
use crate::parser::{Parser, CODE};
use crate::pipeline::RunContext;
use crate::progress::ProgressEvent;
use crate::prompts::code_instruction;
use crate::scanner::walk_files;

/// Source extensions analyzed by the code stream.
pub const SOURCE_EXTENSIONS: &[&str] = &["py", "js", "ts", "java", "cpp", "c", "go", "rs", "rb", "php"];

/// Feature groups and the patterns extracted for them.
#[derive(Debug, Default)]
pub struct CodeKnowledge {
    pub groups: BTreeMap<String, FeatureGroup>,
    /// Only features that yielded at least one pattern.
    pub patterns: BTreeMap<String, Vec<Pattern>>,
}

impl CodeKnowledge {
    pub fn pattern_count(&self) -> usize {
        self.patterns.values().map(Vec::len).sum()
    }
}

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.as_str()))
}

/// Source files under `path` (or `path` itself when it is a source file).
pub fn find_source_files(path: &Path, ctx: &RunContext<'_>) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(if is_source_file(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }
    Ok(walk_files(path, &ctx.config.scan)?
        .into_iter()
        .filter(|p| is_source_file(p))
        .collect())
}

/// Group the source files of every input path into features.
///
/// Each input directory is the root its files are grouped relative to;
/// features with the same name from different inputs are merged. When
/// inputs overlap, a file stays with the first input that reached it.
pub fn group_sources(
    sources: &[PathBuf],
    rules: &FeatureRules,
    ctx: &RunContext<'_>,
) -> Result<BTreeMap<String, FeatureGroup>> {
    let mut groups: BTreeMap<String, FeatureGroup> = BTreeMap::new();
    let mut assigned: HashSet<PathBuf> = HashSet::new();
    for source in sources {
        let files: Vec<PathBuf> = find_source_files(source, ctx)?
            .into_iter()
            .filter(|f| assigned.insert(f.clone()))
            .collect();
        let root = if source.is_file() {
            source.parent().unwrap_or(source)
        } else {
            source.as_path()
        };
        for (name, group) in rules.group_relative(root, &files) {
            groups
                .entry(name.clone())
                .or_insert_with(|| FeatureGroup::new(name))
                .members
                .extend(group.members);
        }
    }
    Ok(groups)
}

/// Largest eligible members of a feature, capped.
pub fn select_key_files(group: &FeatureGroup, limits: &StreamsConfig) -> Vec<PathBuf> {
    let mut sized: Vec<(PathBuf, u64)> = group
        .members
        .iter()
        .filter_map(|p| match std::fs::metadata(p) {
            Ok(meta) => Some((p.clone(), meta.len())),
            Err(e) => {
                tracing::warn!("cannot stat {}: {}", p.display(), e);
                None
            }
        })
        .filter(|(_, size)| *size > limits.min_file_bytes && *size < limits.max_file_bytes)
        .collect();

    // Largest first; path order breaks ties so selection is deterministic.
    sized.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sized
        .into_iter()
        .take(limits.max_files_per_feature)
        .map(|(p, _)| p)
        .collect()
}

/// Run the code stream over the manifest's code sources.
pub async fn extract_code_patterns(
    sources: &[PathBuf],
    rules: &FeatureRules,
    ctx: &RunContext<'_>,
) -> Result<CodeKnowledge> {
    ctx.progress.report(ProgressEvent::Discovering {
        stream: "code".to_string(),
    });

    let mut groups = group_sources(sources, rules, ctx)?;
    let selections: Vec<(&String, Vec<PathBuf>)> = groups
        .iter()
        .map(|(name, group)| (name, select_key_files(group, &ctx.config.streams)))
        .collect();
    let total: u64 = selections.iter().map(|(_, files)| files.len() as u64).sum();

    tracing::info!(
        "code: {} features, {} key files",
        groups.len(),
        total
    );

    let parser = Parser::new(&CODE, &ctx.config.parser);
    let mut patterns: BTreeMap<String, Vec<Pattern>> = BTreeMap::new();
    let mut n = 0u64;

    for (feature, files) in &selections {
        let mut found = Vec::new();
        for file in files {
            n += 1;
            ctx.progress.report(ProgressEvent::Analyzing {
                stream: "code".to_string(),
                n,
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

            let request = AnalysisRequest::text(
                content,
                code_instruction(feature, &file_name_of(file)),
                ContentKind::Code,
            );
            let Some(analysis) = ctx.analyze(&request, file).await else {
                continue;
            };
            found.extend(parser.parse_patterns(&analysis, file, feature));
        }

        if found.is_empty() {
            tracing::debug!("feature {} produced no patterns", feature);
        } else {
            patterns.insert((*feature).clone(), found);
        }
    }

    drop(selections);
    groups.retain(|name, _| patterns.contains_key(name));

    Ok(CodeKnowledge { groups, patterns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::ScriptedGateway;
    use crate::progress::NoProgress;

    fn write(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "def handle(request):\n    return ok(request)\n").unwrap();
    }

    #[test]
    fn nested_sources_assign_each_file_once() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let handler = src.join("auth/handlers/session.py");
        write(&handler);
        write(&src.join("billing/invoice.py"));

        let config = Config::minimal();
        let gateway = ScriptedGateway::new("");
        let ctx = RunContext::new(&config, &gateway, &NoProgress);
        let sources = vec![src.clone(), src.join("auth")];

        let groups = group_sources(&sources, &FeatureRules::default(), &ctx).unwrap();
        let holding: Vec<&String> = groups
            .iter()
            .filter(|(_, g)| g.members.contains(&handler))
            .map(|(name, _)| name)
            .collect();
        assert_eq!(holding, ["authentication"]);
        assert!(!groups.contains_key("handlers"));

        let total: usize = groups.values().map(|g| g.members.len()).sum();
        assert_eq!(total, 2);
    }
}
