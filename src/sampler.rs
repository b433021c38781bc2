//! Content sampler.
//!
//! Cuts bounded excerpts out of a file so the analysis step sees a
//! representative slice of it without receiving the whole thing. No sample
//! is ever longer than `sampling.chunk_chars` characters.
//!
//! | Category                       | Samples                                          |
//! |--------------------------------|--------------------------------------------------|
//! | structured-data                | `structure` + one `extracted-substructure` per marker key |
//! | long-form-doc / short-text-doc | `full`, or `head` [+ `middle`] + `tail`          |
//! | config                         | `full` when small, otherwise nothing             |
//! | everything else                | nothing                                          |

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

use crate::config::SamplingConfig;
use crate::models::{FileCategory, Sample, SampleKind};

/// Top-level keys that usually hold endpoint listings.
const API_KEYS: &[&str] = &[
    "endpoints",
    "paths",
    "operations",
    "methods",
    "apis",
    "resources",
];

/// Top-level keys that usually hold type or schema definitions.
const SCHEMA_KEYS: &[&str] = &["schema", "schemas", "definitions", "models", "types"];

/// A structural marker match: where the substructure lives and how many
/// entries of it to keep.
struct Marker {
    key_path: String,
    value: Value,
    entries: usize,
}

/// Sample a file, logging and swallowing any I/O failure.
///
/// A single unreadable file yields no samples; it never aborts the batch.
pub fn sample(path: &Path, category: FileCategory, config: &SamplingConfig) -> Vec<Sample> {
    match try_sample(path, category, config) {
        Ok(samples) => samples,
        Err(e) => {
            tracing::warn!("skipping {}: {:#}", path.display(), e);
            Vec::new()
        }
    }
}

pub fn try_sample(
    path: &Path,
    category: FileCategory,
    config: &SamplingConfig,
) -> Result<Vec<Sample>> {
    match category {
        FileCategory::StructuredData => {
            let text = read_lossy(path)?;
            sample_structured(path, &text, config)
        }
        FileCategory::LongFormDoc | FileCategory::ShortTextDoc => {
            let text = read_lossy(path)?;
            sample_text(path, &text, config.chunk_chars)
        }
        FileCategory::Config => {
            let text = read_lossy(path)?;
            sample_config(path, &text, config)
        }
        _ => Ok(Vec::new()),
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Structure sample plus one extracted-substructure sample per marker key.
///
/// Text that does not parse as JSON still gets its structure sample.
pub fn sample_structured(path: &Path, text: &str, config: &SamplingConfig) -> Result<Vec<Sample>> {
    let head: Vec<&str> = text
        .lines()
        .take(config.structure_lines)
        .map(str::trim)
        .collect();
    let structure = truncate_chars(&head.join("\n"), config.chunk_chars);

    let mut samples = vec![Sample::new(path, SampleKind::Structure, structure)?
        .with_meta("lines", head.len())];

    let doc: Value = match serde_json::from_str(text) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("{} is not parseable JSON: {}", path.display(), e);
            return Ok(samples);
        }
    };

    let Value::Object(map) = doc else {
        return Ok(samples);
    };

    for marker in find_markers(&map, config.substructure_entries) {
        let excerpt = first_entries(&marker.value, marker.entries);
        let rendered = serde_json::to_string_pretty(&excerpt)?;
        samples.push(
            Sample::new(
                path,
                SampleKind::ExtractedSubstructure,
                truncate_chars(&rendered, config.chunk_chars),
            )?
            .with_meta("key", &marker.key_path)
            .with_meta("entries", marker.entries),
        );
    }

    Ok(samples)
}

/// Match top-level keys (and `components.schemas` for OpenAPI-style
/// documents) against the structural vocabulary. A key is reported once,
/// under the first rule that claims it.
fn find_markers(map: &Map<String, Value>, max_entries: usize) -> Vec<Marker> {
    let mut markers: Vec<Marker> = Vec::new();
    let push = |markers: &mut Vec<Marker>, key_path: String, value: &Value, k: usize| {
        if markers.iter().any(|m| m.key_path == key_path) {
            return;
        }
        markers.push(Marker {
            key_path,
            value: value.clone(),
            entries: k.min(max_entries),
        });
    };

    if map.contains_key("openapi") || map.contains_key("swagger") {
        if let Some(paths) = map.get("paths") {
            push(&mut markers, "paths".to_string(), paths, 2);
        }
        if let Some(schemas) = map
            .get("components")
            .and_then(|c| c.get("schemas"))
        {
            push(&mut markers, "components.schemas".to_string(), schemas, 2);
        }
    }

    for key in API_KEYS {
        if let Some(value) = map.get(*key) {
            push(&mut markers, key.to_string(), value, 3);
        }
    }

    for key in SCHEMA_KEYS {
        if let Some(value) = map.get(*key) {
            push(&mut markers, key.to_string(), value, 2);
        }
    }

    for (key, value) in map {
        let lower = key.to_lowercase();
        if lower.contains("request") || lower.contains("response") {
            push(&mut markers, key.clone(), value, 1);
        }
    }

    markers
}

/// The first `k` entries of an object or array; scalars pass through.
fn first_entries(value: &Value, k: usize) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .take(k)
                .map(|(key, v)| (key.clone(), v.clone()))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().take(k).cloned().collect()),
        other => other.clone(),
    }
}

/// Head / middle / tail sampling for prose.
///
/// Content of at most `chunk` characters becomes one `full` sample. Longer
/// content gets a `head` and a `tail`, and a `middle` centred on the
/// midpoint once it is at least three chunks long.
pub fn sample_text(path: &Path, text: &str, chunk: usize) -> Result<Vec<Sample>> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= chunk {
        return Ok(vec![
            Sample::new(path, SampleKind::Full, text).map(|s| s.with_meta("chars", len))?
        ]);
    }

    let slice = |start: usize, end: usize| -> String { chars[start..end].iter().collect() };

    let mut samples = vec![Sample::new(path, SampleKind::Head, slice(0, chunk))?
        .with_meta("offset", 0)
        .with_meta("chars", len)];

    if len >= chunk * 3 {
        let start = (len / 2).saturating_sub(chunk / 2);
        samples.push(
            Sample::new(path, SampleKind::Middle, slice(start, start + chunk))?
                .with_meta("offset", start)
                .with_meta("chars", len),
        );
    }

    let tail_start = len - chunk;
    samples.push(
        Sample::new(path, SampleKind::Tail, slice(tail_start, len))?
            .with_meta("offset", tail_start)
            .with_meta("chars", len),
    );

    Ok(samples)
}

/// Config files shorter than the limit are sampled whole; others are skipped.
pub fn sample_config(path: &Path, text: &str, config: &SamplingConfig) -> Result<Vec<Sample>> {
    let len = text.chars().count();
    let limit = config.config_max_chars.min(config.chunk_chars);
    if len >= limit {
        tracing::debug!(
            "skipping large config {} ({} chars)",
            path.display(),
            len
        );
        return Ok(Vec::new());
    }
    Ok(vec![
        Sample::new(path, SampleKind::Full, text)?.with_meta("chars", len)
    ])
}

/// Cut `text` to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
