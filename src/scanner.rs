//! Inventory scanner.
//!
//! Walks an input root, assigns every regular file to exactly one
//! [`FileCategory`] and partitions the files into per-category lists.
//!
//! Classification is first-match-wins over [`RULES`]; anything no rule
//! claims is [`FileCategory::Unclassified`]. Category depends only on the
//! file name, never on walk order.
//!
//! Discovery order is alphabetical (the walker sorts entries by file name),
//! and each category list is cut at `scan.max_files_per_category` in that
//! order. The cap bounds analysis cost; it is not a quality filter, so with
//! a cap of 20 the 20 alphabetically-first files of a category always win.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::models::FileCategory;

/// What part of the file name a rule inspects.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Lower-cased extension, without the dot.
    Extension(&'static [&'static str]),
    /// Lower-cased full file name or file stem.
    Name(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, path: &Path) -> bool {
        match self {
            Matcher::Extension(exts) => path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .is_some_and(|e| exts.contains(&e.as_str())),
            Matcher::Name(names) => {
                let name = lower_name(path.file_name());
                let stem = lower_name(path.file_stem());
                names
                    .iter()
                    .any(|n| *n == name.as_str() || *n == stem.as_str())
            }
        }
    }
}

fn lower_name(part: Option<&std::ffi::OsStr>) -> String {
    part.map(|p| p.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Ordered classification table. The first matching rule wins.
pub const RULES: &[(Matcher, FileCategory)] = &[
    (Matcher::Extension(&["json"]), FileCategory::StructuredData),
    (
        Matcher::Extension(&["md", "markdown"]),
        FileCategory::LongFormDoc,
    ),
    (
        Matcher::Extension(&["txt", "rst"]),
        FileCategory::ShortTextDoc,
    ),
    (
        Matcher::Extension(&["yaml", "yml", "toml", "ini"]),
        FileCategory::Config,
    ),
    (Matcher::Name(&["config", "settings"]), FileCategory::Config),
    (
        Matcher::Extension(&["png", "jpg", "jpeg", "gif", "bmp", "webp", "svg"]),
        FileCategory::Image,
    ),
    (Matcher::Extension(&["pdf", "docx"]), FileCategory::BinaryDoc),
    (
        Matcher::Extension(&["log", "out"]),
        FileCategory::ExecutionLog,
    ),
];

/// Assign a category from the file name alone.
pub fn classify(path: &Path) -> FileCategory {
    RULES
        .iter()
        .find(|(matcher, _)| matcher.matches(path))
        .map(|(_, category)| *category)
        .unwrap_or(FileCategory::Unclassified)
}

/// Per-category file lists produced by one [`scan`] pass.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    files: BTreeMap<FileCategory, Vec<PathBuf>>,
    dropped: BTreeMap<FileCategory, usize>,
}

impl Inventory {
    pub fn files(&self, category: FileCategory) -> &[PathBuf] {
        self.files.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty categories with their files, in category order.
    pub fn iter(&self) -> impl Iterator<Item = (FileCategory, &[PathBuf])> {
        self.files
            .iter()
            .filter(|(_, files)| !files.is_empty())
            .map(|(c, files)| (*c, files.as_slice()))
    }

    /// Number of files kept after capping.
    pub fn total(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Number of files cut from `category` by the per-category ceiling.
    pub fn dropped(&self, category: FileCategory) -> usize {
        self.dropped.get(&category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn push(&mut self, category: FileCategory, path: PathBuf, cap: usize) {
        let list = self.files.entry(category).or_default();
        if list.len() < cap {
            list.push(path);
        } else {
            *self.dropped.entry(category).or_default() += 1;
        }
    }
}

/// Scan `root` and build the capped per-category inventory.
///
/// Read-only. Unreadable directories and entries are skipped with a warning.
/// A missing root yields an empty inventory.
pub fn scan(root: &Path, config: &ScanConfig) -> Result<Inventory> {
    let mut inventory = Inventory::default();

    if !root.exists() {
        tracing::warn!("scan root not found: {}", root.display());
        return Ok(inventory);
    }

    for path in walk_files(root, config)? {
        let category = classify(&path);
        inventory.push(category, path, config.max_files_per_category);
    }

    for category in FileCategory::ALL {
        let dropped = inventory.dropped(category);
        if dropped > 0 {
            tracing::info!(
                "{}: kept {} files, dropped {} over the cap",
                category,
                inventory.files(category).len(),
                dropped
            );
        }
    }

    Ok(inventory)
}

/// Every regular file under `root` in sorted order, minus excluded paths.
///
/// `root` may also be a single file, which is returned as-is.
pub fn walk_files(root: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
