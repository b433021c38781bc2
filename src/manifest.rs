//! Source-analysis manifest reader.
//!
//! The manifest is a loosely structured Markdown file. Three kinds of
//! section header route the `- ` bullet paths that follow them:
//!
//! | Header contains                                      | Stream     |
//! |------------------------------------------------------|------------|
//! | `PRIMARY SOURCE CODE`                                | code       |
//! | `DOCUMENTATION SOURCES`                              | docs       |
//! | `EXECUTION DATA`, `VISUAL MATERIALS`, `API & INTEGRATION` | multimodal |
//!
//! Only bullets that look like paths (contain `/` or `\`) are read. A
//! `Label: path` bullet keeps the part after the colon. Bullets before the
//! first recognised header are ignored. Relative paths resolve against the
//! working directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Substrings marking a template path that was never filled in.
pub const PLACEHOLDER_MARKERS: &[&str] = &["example", "placeholder", "your_", "insert_"];

const MULTIMODAL_HEADERS: &[&str] = &["EXECUTION DATA", "VISUAL MATERIALS", "API & INTEGRATION"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Paths routed to each stream, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSources {
    pub code: Vec<PathBuf>,
    pub docs: Vec<PathBuf>,
    pub multimodal: Vec<PathBuf>,
}

impl ManifestSources {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.docs.is_empty() && self.multimodal.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Route {
    Code,
    Docs,
    Multimodal,
}

pub fn load_manifest(path: &Path) -> Result<ManifestSources, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_manifest(&text))
}

pub fn parse_manifest(text: &str) -> ManifestSources {
    let mut sources = ManifestSources::default();
    let mut route: Option<Route> = None;

    for line in text.lines() {
        let line = line.trim();
        let upper = line.to_uppercase();

        if upper.contains("PRIMARY SOURCE CODE") {
            route = Some(Route::Code);
        } else if upper.contains("DOCUMENTATION SOURCES") {
            route = Some(Route::Docs);
        } else if MULTIMODAL_HEADERS.iter().any(|h| upper.contains(h)) {
            route = Some(Route::Multimodal);
        } else if let Some(item) = line.strip_prefix("- ") {
            if !(item.contains('/') || item.contains('\\')) {
                continue;
            }
            let Some(route) = route else {
                continue;
            };
            let path = bullet_path(item);
            if path.is_empty() {
                continue;
            }
            let list = match route {
                Route::Code => &mut sources.code,
                Route::Docs => &mut sources.docs,
                Route::Multimodal => &mut sources.multimodal,
            };
            list.push(PathBuf::from(path));
        }
    }

    sources
}

fn bullet_path(item: &str) -> &str {
    let mut path = item.trim();
    if let Some((_, after)) = path.split_once(':') {
        path = after.trim();
    }
    path = path.trim_matches(|c| c == '`' || c == '"' || c == '\'');
    path.strip_prefix("./").unwrap_or(path)
}

pub fn is_placeholder(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Drop placeholder paths and paths that do not exist.
pub fn filter_existing(sources: ManifestSources) -> ManifestSources {
    let keep = |paths: Vec<PathBuf>| -> Vec<PathBuf> {
        paths
            .into_iter()
            .filter(|p| !is_placeholder(p))
            .filter(|p| {
                let exists = p.exists();
                if !exists {
                    tracing::warn!("path not found, skipping: {}", p.display());
                }
                exists
            })
            .collect()
    };
    ManifestSources {
        code: keep(sources.code),
        docs: keep(sources.docs),
        multimodal: keep(sources.multimodal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
# Source Analysis

- stray/path/before/any/header

## PRIMARY SOURCE CODE:
- Backend: `./services/api/`
- frontend/src
- not a path

## DOCUMENTATION SOURCES
- \"docs/architecture.md\"

## EXECUTION DATA
- logs/prod/

## Visual Materials
- ./diagrams/flow.png
";

    #[test]
    fn routes_bullets_by_header() {
        let sources = parse_manifest(MANIFEST);
        assert_eq!(
            sources.code,
            vec![PathBuf::from("services/api/"), PathBuf::from("frontend/src")]
        );
        assert_eq!(sources.docs, vec![PathBuf::from("docs/architecture.md")]);
        assert_eq!(
            sources.multimodal,
            vec![PathBuf::from("logs/prod/"), PathBuf::from("diagrams/flow.png")]
        );
    }

    #[test]
    fn placeholders_and_missing_paths_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("src");
        std::fs::create_dir(&real).unwrap();
        let placeholder = dir.path().join("your_project");
        std::fs::create_dir(&placeholder).unwrap();

        let sources = ManifestSources {
            code: vec![real.clone(), placeholder, dir.path().join("missing")],
            ..Default::default()
        };
        let filtered = filter_existing(sources);
        assert_eq!(filtered.code, vec![real]);
    }

    #[test]
    fn unreadable_manifest_is_an_error() {
        let err = load_manifest(Path::new("/nonexistent/SOURCE_ANALYSIS.md")).unwrap_err();
        assert!(err.to_string().contains("SOURCE_ANALYSIS.md"));
    }
}
