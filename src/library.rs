//! Output library on disk.
//!
//! ```text
//! <root>/
//!   how_to_build/   how_to_build_<feature>.md
//!   patterns/       <pattern>.md
//!   architecture/   <doc_type>_architecture.md
//!   gotchas/        common_pitfalls.md
//! ```
//!
//! Writes always overwrite; nothing is merged with what is already on disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::models::{Guide, GuideKind};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Create the four guide directories under `root`.
pub fn init_layout(root: &Path) -> Result<()> {
    for kind in GuideKind::ALL {
        let dir = root.join(kind.dir_name());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}

/// Write one guide into `dir`, replacing any file of the same name.
pub fn persist(guide: &Guide, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(&guide.filename);
    std::fs::write(&path, &guide.body)
        .with_context(|| format!("Failed to write guide: {}", path.display()))?;
    tracing::debug!("wrote {}", path.display());
    Ok(path)
}

/// Write every guide into its kind's directory under `root`.
///
/// A guide that cannot be written is logged and skipped.
pub fn write_all(
    guides: &[Guide],
    root: &Path,
    progress: &dyn ProgressReporter,
) -> Result<Vec<PathBuf>> {
    init_layout(root)?;
    let total = guides.len() as u64;
    let mut written = Vec::with_capacity(guides.len());

    for (i, guide) in guides.iter().enumerate() {
        progress.report(ProgressEvent::Writing {
            n: i as u64 + 1,
            total,
        });
        match persist(guide, &root.join(guide.kind.dir_name())) {
            Ok(path) => written.push(path),
            Err(e) => tracing::warn!("{:#}", e),
        }
    }

    tracing::info!("wrote {} guides to {}", written.len(), root.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    fn guide(kind: GuideKind, filename: &str, body: &str) -> Guide {
        Guide {
            title: filename.to_string(),
            filename: filename.to_string(),
            body: body.to_string(),
            kind,
        }
    }

    #[test]
    fn layout_has_four_directories() {
        let dir = tempfile::tempdir().unwrap();
        init_layout(dir.path()).unwrap();
        for name in ["how_to_build", "patterns", "architecture", "gotchas"] {
            assert!(dir.path().join(name).is_dir());
        }
    }

    #[test]
    fn guides_land_in_their_kind_directory() {
        let dir = tempfile::tempdir().unwrap();
        let guides = vec![
            guide(GuideKind::Pattern, "retry.md", "# Retry\n"),
            guide(GuideKind::Pitfalls, "common_pitfalls.md", "# Pitfalls\n"),
        ];
        let written = write_all(&guides, dir.path(), &NoProgress).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("patterns/retry.md")).unwrap(),
            "# Retry\n"
        );
        assert!(dir.path().join("gotchas/common_pitfalls.md").is_file());
    }

    #[test]
    fn persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        persist(&guide(GuideKind::Pattern, "a.md", "first, and longer"), dir.path()).unwrap();
        persist(&guide(GuideKind::Pattern, "a.md", "second"), dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.md")).unwrap(), "second");
    }
}
