//! Auto mode: source-analysis manifest generation.
//!
//! After data discovery, the gateway is asked to write a manifest tailored
//! to the discovered patterns and the user's use case. When that request
//! soft-fails, a deterministic manifest is rendered locally instead.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::assembler::GenerationStamp;
use crate::discovery::Discovery;
use crate::gateway::{AnalysisRequest, ContentKind};
use crate::models::{title_case, FeatureGroup, FileCategory, Pattern};
use crate::pipeline::RunContext;
use crate::prompts::manifest_instruction;
use crate::sampler::truncate_chars;
use crate::stream_code::CodeKnowledge;

/// Default location of the generated manifest.
pub const DEFAULT_OUTPUT: &str = "./intake/auto_generated_analysis.md";

/// Feature name for patterns derived from structured-data files.
pub const API_FEATURE: &str = "api_documentation";

/// Structured-data files turned into API documentation patterns.
const MAX_API_FILES: usize = 10;

/// Characters of each structured-data file kept as its code example.
const API_EXAMPLE_CHARS: usize = 2000;

const USE_CASE_PREFIX_CHARS: usize = 100;

/// Discovered patterns as plain text, for the manifest request.
pub fn pattern_summary(patterns: &BTreeMap<FileCategory, Vec<Pattern>>) -> String {
    let mut out = String::from("DISCOVERED DATA PATTERNS:\n\n");
    for (category, list) in patterns {
        let _ = writeln!(out, "**{}:**", category.as_str().to_uppercase());
        for p in list {
            let _ = writeln!(out, "- Pattern: {}", p.name);
            let _ = writeln!(out, "  Description: {}...", truncate_chars(&p.description, 100));
            if !p.example_snippets.is_empty() {
                let _ = writeln!(out, "  Examples: {} found", p.example_snippets.len());
            }
            let _ = writeln!(out, "  Confidence: {:.1}\n", p.confidence.score());
        }
    }
    out
}

/// Manifest text for a discovery result.
pub async fn generate_source_analysis(
    discovery: &Discovery,
    data_dir: &Path,
    use_case: &str,
    ctx: &RunContext<'_>,
    stamp: &GenerationStamp,
) -> String {
    let data_dir_str = data_dir.display().to_string();
    let summary = pattern_summary(&discovery.patterns);
    let request = AnalysisRequest::text(
        summary.clone(),
        manifest_instruction(use_case, &data_dir_str, &summary),
        ContentKind::Text,
    );

    match ctx.analyze(&request, data_dir).await {
        Some(body) => {
            let header = format!(
                "<!--\nAuto-generated SOURCE_ANALYSIS.md\nGenerated on: {}\nData directory: {}\nUse case: {}...\n-->\n\n",
                stamp.timestamp(),
                data_dir_str,
                truncate_chars(use_case, USE_CASE_PREFIX_CHARS)
            );
            header + &body
        }
        None => {
            tracing::info!("rendering fallback source analysis");
            fallback_source_analysis(&data_dir_str, &discovery.patterns, stamp)
        }
    }
}

/// Locally rendered manifest, used when the gateway cannot write one.
pub fn fallback_source_analysis(
    data_dir: &str,
    patterns: &BTreeMap<FileCategory, Vec<Pattern>>,
    stamp: &GenerationStamp,
) -> String {
    let mut out = String::new();
    out.push_str("# Auto-Generated Source Analysis\n\n");
    out.push_str("*Generated from data pattern discovery*\n\n");
    out.push_str("## CODEBASE TO ANALYZE:\n\n**Primary Data Sources:**\n");
    let _ = writeln!(out, "- Main data directory: `{}`", data_dir);
    for category in patterns.keys() {
        let _ = writeln!(
            out,
            "- {}: `{}/**/*.{}`",
            title_case(&category.as_str().replace('-', " ")),
            data_dir,
            category.typical_extension()
        );
    }

    out.push_str("\n## KNOWLEDGE EXTRACTION GOALS:\n\n**Pattern Analysis:**\n");
    for (category, list) in patterns {
        let _ = writeln!(out, "- Extract patterns from {}", category.as_str().replace('-', " "));
        for p in list.iter().take(2) {
            let _ = writeln!(out, "  - {}...", truncate_chars(&p.description, 80));
        }
    }

    let _ = write!(
        out,
        "
## OUTPUT FOCUS:

**Tutorial Style:** How to work with {data_dir} data
**Educational Depth:** Understand data structures and usage patterns
**Practical Examples:** Real data examples and integration patterns

## EXAMPLES TO EXTRACT:

- Data structure understanding
- Integration pattern examples
- Usage workflow guides
- Common data manipulation patterns

## OTHER CONSIDERATIONS:

**Data Type:** Mixed (JSON, documentation, configuration)
**Use Case:** Data analysis and integration
**Complexity Level:** Moderate

---

*Auto-generated on {}*
",
        stamp.timestamp()
    );
    out
}

/// Write the manifest, creating parent directories.
pub fn save_source_analysis(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write source analysis: {}", path.display()))
}

/// One pattern per structured-data file, grouped under [`API_FEATURE`].
pub fn api_documentation_patterns(files: &[PathBuf]) -> CodeKnowledge {
    let mut group = FeatureGroup::new(API_FEATURE);
    let mut patterns = Vec::new();

    for file in files.iter().take(MAX_API_FILES) {
        let content = match std::fs::read(file) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!("could not process {}: {}", file.display(), e);
                continue;
            }
        };
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = file
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let pattern = Pattern::new(
            API_FEATURE,
            format!("API Documentation - {}", stem),
            format!("API documentation structure from {}", name),
            file,
        );
        match pattern {
            Ok(p) => {
                patterns.push(
                    p.with_snippets(vec![truncate_chars(&content, API_EXAMPLE_CHARS)])
                        .with_guidance(format!(
                            "This represents API documentation patterns found in {}. \
                             The structure shows how API endpoints, parameters, and responses are organized.",
                            name
                        )),
                );
                group.members.insert(file.clone());
            }
            Err(e) => tracing::warn!("skipping {}: {}", file.display(), e),
        }
    }

    let mut knowledge = CodeKnowledge::default();
    if !patterns.is_empty() {
        knowledge.groups.insert(API_FEATURE.to_string(), group);
        knowledge.patterns.insert(API_FEATURE.to_string(), patterns);
    }
    knowledge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::ScriptedGateway;
    use crate::progress::NoProgress;

    fn discovered() -> Discovery {
        let mut discovery = Discovery::default();
        discovery.patterns.insert(
            FileCategory::StructuredData,
            vec![
                Pattern::new("structured-data", "Endpoints", "Each file lists REST endpoints", "a.json").unwrap(),
                Pattern::new("structured-data", "Schemas", "Shared schema definitions", "a.json").unwrap(),
                Pattern::new("structured-data", "Auth", "Bearer tokens everywhere", "a.json").unwrap(),
            ],
        );
        discovery
    }

    #[test]
    fn summary_lists_each_pattern() {
        let summary = pattern_summary(&discovered().patterns);
        assert!(summary.starts_with("DISCOVERED DATA PATTERNS:"));
        assert!(summary.contains("**STRUCTURED-DATA:**"));
        assert!(summary.contains("- Pattern: Schemas"));
        assert!(summary.contains("Confidence: 0.8"));
    }

    #[test]
    fn fallback_lists_globs_and_top_two_descriptions() {
        let text = fallback_source_analysis("data/apps", &discovered().patterns, &GenerationStamp::fixed("2024-03-01"));
        assert!(text.contains("- Structured Data: `data/apps/**/*.json`"));
        assert!(text.contains("  - Each file lists REST endpoints..."));
        assert!(text.contains("  - Shared schema definitions..."));
        assert!(!text.contains("Bearer tokens"));
        assert!(text.contains("*Auto-generated on 2024-03-01 00:00:00*"));
    }

    #[tokio::test]
    async fn gateway_manifest_gets_header() {
        let config = Config::minimal();
        let gateway = ScriptedGateway::new("## PRIMARY SOURCE CODE\n- data/apps/\n");
        let ctx = RunContext::new(&config, &gateway, &NoProgress);

        let text = generate_source_analysis(
            &discovered(),
            Path::new("data/apps"),
            "integration docs",
            &ctx,
            &GenerationStamp::fixed("2024-03-01"),
        )
        .await;
        assert!(text.starts_with("<!--\nAuto-generated SOURCE_ANALYSIS.md\n"));
        assert!(text.contains("Use case: integration docs..."));
        assert!(text.ends_with("## PRIMARY SOURCE CODE\n- data/apps/\n"));
    }

    #[tokio::test]
    async fn soft_failure_falls_back() {
        let config = Config::minimal();
        let gateway = ScriptedGateway::unavailable();
        let ctx = RunContext::new(&config, &gateway, &NoProgress);

        let text = generate_source_analysis(
            &discovered(),
            Path::new("data/apps"),
            "",
            &ctx,
            &GenerationStamp::fixed("2024-03-01"),
        )
        .await;
        assert!(text.starts_with("# Auto-Generated Source Analysis"));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("intake/nested/analysis.md");
        save_source_analysis("# x", &out).unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "# x");
    }

    #[test]
    fn structured_files_become_api_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("billing.json");
        std::fs::write(&file, format!("{{\"paths\": \"{}\"}}", "x".repeat(3000))).unwrap();

        let knowledge = api_documentation_patterns(&[file.clone()]);
        let patterns = &knowledge.patterns[API_FEATURE];
        assert_eq!(patterns[0].name, "API Documentation - billing");
        assert_eq!(patterns[0].description, "API documentation structure from billing.json");
        assert_eq!(patterns[0].code_example().map(|c| c.chars().count()), Some(2000));
        assert!(knowledge.groups[API_FEATURE].members.contains(&file));
    }
}
