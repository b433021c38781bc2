//! Markdown templates for the four guide kinds.
//!
//! Rendering is a pure function of its inputs: the only varying text is
//! the single `*Generated on: ...*` line at the end of every guide, taken
//! from the caller's [`GenerationStamp`].

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::assembler::GenerationStamp;
use crate::models::{slugify, title_case, DocType, Guide, GuideKind, Insight, MediaKind, Pattern};

/// Implementation steps shown in a how-to-build guide.
const MAX_STEPS: usize = 5;
/// Guidance lines quoted per implementation step.
const MAX_STEP_LINES: usize = 10;
/// Gotchas or notes quoted per related insight.
const MAX_PER_SOURCE: usize = 3;
const MAX_LOG_PITFALLS: usize = 10;
const MAX_OTHER_PITFALLS: usize = 5;
/// Code examples at or below this length are not worth showing as a step.
const MIN_STEP_EXAMPLE_CHARS: usize = 20;

pub const PITFALLS_TITLE: &str = "Common Pitfalls and Gotchas";
pub const PITFALLS_FILENAME: &str = "common_pitfalls.md";

/// Extension → (fence tag, technology).
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("py", "python", "Python"),
    ("js", "javascript", "JavaScript/TypeScript"),
    ("ts", "typescript", "JavaScript/TypeScript"),
    ("java", "java", "Java"),
    ("c", "c", "C/C++"),
    ("cpp", "cpp", "C/C++"),
    ("go", "go", "Go"),
    ("rs", "rust", "Rust"),
    ("rb", "ruby", "Ruby"),
    ("php", "php", "PHP"),
];

fn language_of(path: &Path) -> Option<(&'static str, &'static str)> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, fence, tech)| (*fence, *tech))
}

/// Fence language tag for a source path.
pub fn fence_language(path: &Path) -> &'static str {
    match language_of(path) {
        Some((fence, _)) => fence,
        None => match path.extension().and_then(|e| e.to_str()) {
            Some("json") => "json",
            _ => "text",
        },
    }
}

/// Technologies implied by the patterns' source files, sorted.
pub fn technologies(patterns: &[Pattern]) -> BTreeSet<&'static str> {
    patterns
        .iter()
        .filter_map(|p| language_of(&p.source_path).map(|(_, tech)| tech))
        .collect()
}

/// First non-empty, non-heading lines of a guidance text.
pub fn guidance_excerpt(guidance: &str, max: usize) -> Vec<&str> {
    guidance
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .take(max)
        .collect()
}

fn footer(out: &mut String, note: &str, stamp: &GenerationStamp) {
    let _ = write!(out, "\n---\n\n*{}*\n{}\n", note, stamp.line());
}

/// Link target of a pattern guide, relative to another guide directory.
pub fn pattern_link(pattern: &Pattern) -> String {
    format!("../{}/{}.md", GuideKind::Pattern.dir_name(), slugify(&pattern.name))
}

/// Inputs to one how-to-build guide.
pub struct HowToBuild<'a> {
    pub feature: &'a str,
    pub patterns: &'a [Pattern],
    pub related_docs: &'a [&'a Insight],
    pub related_media: &'a [&'a Insight],
    /// (title, filename) of the architecture guides written in the same pass.
    pub architecture_links: &'a [(String, String)],
}

pub fn how_to_build(input: &HowToBuild<'_>, stamp: &GenerationStamp) -> Guide {
    let feature_title = title_case(input.feature);
    let feature_words = input.feature.replace('_', " ");
    let title = format!("How to Build {}", feature_title);
    let mut out = String::new();

    let _ = write!(
        out,
        "# {title}

*Generated from real implementation analysis*

## Overview

This guide shows you how to build a {feature_words} system based on analysis of a real, \
working implementation. It covers architectural decisions, step-by-step implementation, \
common pitfalls and best practices.

## Table of Contents

1. [System Architecture](#system-architecture)
2. [Prerequisites](#prerequisites)
3. [Step-by-Step Implementation](#step-by-step-implementation)
4. [Key Implementation Patterns](#key-implementation-patterns)
5. [Common Pitfalls to Avoid](#common-pitfalls-to-avoid)
6. [Testing Strategy](#testing-strategy)
7. [Deployment Considerations](#deployment-considerations)
8. [Further Reading](#further-reading)

## System Architecture

"
    );

    let with_arch: Vec<&&Insight> = input
        .related_docs
        .iter()
        .filter(|d| !d.architecture().is_empty())
        .collect();
    if !with_arch.is_empty() {
        out.push_str("### Design Decisions\n\n");
        for doc in with_arch {
            let _ = writeln!(out, "**From {}:**", doc.title);
            for point in doc.architecture().iter().take(MAX_PER_SOURCE) {
                let _ = writeln!(out, "- {}", point);
            }
            out.push('\n');
        }
    }

    if let Some(image) = input
        .related_media
        .iter()
        .find(|m| m.media_kind() == Some(MediaKind::Image) && !m.general().is_empty())
    {
        out.push_str("### Visual Architecture Insights\n\n");
        let _ = writeln!(out, "*From {}:*", image.title);
        for point in image.general().iter().take(2) {
            let _ = writeln!(out, "- {}", point);
        }
        out.push('\n');
    }

    out.push_str("## Prerequisites\n\nBefore implementing this system, ensure you have:\n\n### Technical Requirements\n");
    for tech in technologies(input.patterns) {
        let _ = writeln!(out, "- {} development environment", tech);
    }
    out.push_str(
        "
### Knowledge Prerequisites
- Understanding of web application architecture
- Basic knowledge of databases and APIs
- Familiarity with the chosen technology stack

## Step-by-Step Implementation

",
    );

    for (i, pattern) in input.patterns.iter().take(MAX_STEPS).enumerate() {
        let _ = write!(out, "### Step {}: {}\n\n{}\n\n", i + 1, pattern.name, pattern.description);

        let excerpt = guidance_excerpt(&pattern.guidance, MAX_STEP_LINES);
        if !excerpt.is_empty() {
            out.push_str("**Implementation Approach:**\n");
            for line in excerpt {
                let _ = writeln!(out, "- {}", line);
            }
            out.push('\n');
        }

        if let Some(code) = pattern
            .code_example()
            .filter(|c| c.trim().chars().count() > MIN_STEP_EXAMPLE_CHARS)
        {
            let _ = write!(
                out,
                "**Code Example:**\n\n```{}\n{}\n```\n\n",
                fence_language(&pattern.source_path),
                code
            );
        }
    }

    out.push_str("## Key Implementation Patterns\n\nThe following patterns were identified in the analyzed system:\n\n");
    for pattern in input.patterns {
        let _ = write!(
            out,
            "### {}\n\n**Purpose:** {}\n\n**Implementation Location:** `{}`\n\n",
            pattern.name,
            pattern.description,
            pattern.source_name()
        );
        let points = guidance_excerpt(&pattern.guidance, MAX_PER_SOURCE);
        if !points.is_empty() {
            out.push_str("**Key Points:**\n");
            for line in points {
                let _ = writeln!(out, "- {}", line);
            }
            out.push('\n');
        }
    }

    out.push_str("## Common Pitfalls to Avoid\n\nBased on analysis of the real implementation, here are common issues to watch out for:\n\n");
    for media in input.related_media {
        if media.pitfalls().is_empty() {
            continue;
        }
        let label = media.media_kind().map(|k| k.label()).unwrap_or("Multimodal");
        let _ = write!(out, "### Issues from {} Analysis\n\n", label);
        for gotcha in media.pitfalls().iter().take(MAX_PER_SOURCE) {
            let _ = writeln!(out, "- **{}**", gotcha);
        }
        out.push('\n');
    }
    for doc in input.related_docs {
        if doc.implementation().is_empty() {
            continue;
        }
        let _ = write!(out, "### Guidance from {}\n\n", doc.title);
        for note in doc.implementation().iter().take(MAX_PER_SOURCE) {
            let _ = writeln!(out, "- {}", note);
        }
        out.push('\n');
    }

    out.push_str(
        "## Testing Strategy

Implement comprehensive testing to ensure system reliability:

### Unit Testing
- Test individual components and functions
- Mock external dependencies
- Aim for 80%+ code coverage

### Integration Testing
- Test component interactions
- Verify database operations
- Test API endpoints end-to-end

### Performance Testing
- Load test critical paths
- Monitor memory usage
- Benchmark response times

## Deployment Considerations

### Infrastructure Requirements
",
    );

    let deployment: Vec<&String> = input
        .related_docs
        .iter()
        .filter(|d| matches!(d.doc_type(), Some(DocType::Deployment | DocType::Setup)))
        .flat_map(|d| d.implementation())
        .collect();
    if deployment.is_empty() {
        out.push_str(
            "- Consider containerization (Docker)
- Set up proper logging and monitoring
- Configure environment-specific settings
- Plan for scalability and load balancing
",
        );
    } else {
        for note in deployment {
            let _ = writeln!(out, "- {}", note);
        }
    }

    out.push_str(
        "
### Security Considerations
- Implement proper authentication and authorization
- Validate and sanitize all inputs
- Use HTTPS for all communications
- Regular security audits and updates

## Further Reading

### Related Patterns
",
    );
    for pattern in input.patterns {
        let _ = writeln!(out, "- [{}]({})", pattern.name, pattern_link(pattern));
    }

    out.push_str("\n### Architecture Documentation\n");
    for (arch_title, filename) in input.architecture_links {
        let _ = writeln!(
            out,
            "- [{}](../{}/{})",
            arch_title,
            GuideKind::Architecture.dir_name(),
            filename
        );
    }
    let _ = writeln!(
        out,
        "- [{}](../{}/{})",
        PITFALLS_TITLE,
        GuideKind::Pitfalls.dir_name(),
        PITFALLS_FILENAME
    );

    footer(
        &mut out,
        &format!("This guide was generated from analysis of a real {} implementation.", feature_words),
        stamp,
    );

    Guide {
        filename: format!("how_to_build_{}.md", slugify(input.feature)),
        title,
        body: out,
        kind: GuideKind::HowToBuild,
    }
}

pub fn pattern_guide(pattern: &Pattern, feature: &str, stamp: &GenerationStamp) -> Guide {
    let feature_words = feature.replace('_', " ");
    let mut out = String::new();

    let _ = write!(
        out,
        "# {name}

*Implementation pattern from the {feature_words} system*

## Overview

{description}

## When to Use This Pattern

This pattern is useful when you need to:
- Implement functionality similar to {feature_words}
- Follow established architectural patterns
- Keep implementation approaches consistent

## Implementation Guide

{guidance}

## Code Example

",
        name = pattern.name,
        description = pattern.description,
        guidance = pattern.guidance.trim(),
    );

    match pattern.code_example() {
        Some(code) => {
            let _ = write!(
                out,
                "```{}\n{}\n```\n",
                fence_language(&pattern.source_path),
                code
            );
        }
        None => out.push_str("_No code example was extracted._\n"),
    }

    let _ = write!(
        out,
        "
## Variations

Consider these variations based on your specific needs:
- Adapt the pattern for different programming languages
- Modify it for different scale requirements
- Integrate it with different frameworks or libraries

## Testing This Pattern

When implementing this pattern, ensure you test:
- Core functionality works as expected
- Error cases are handled properly
- Performance meets requirements
- Integration with other components is seamless

## Related Patterns

This pattern works well with other patterns from the {feature_words} system.
"
    );

    footer(
        &mut out,
        &format!("Extracted from: `{}`", pattern.source_name()),
        stamp,
    );

    Guide {
        title: pattern.name.clone(),
        filename: format!("{}.md", slugify(&pattern.name)),
        body: out,
        kind: GuideKind::Pattern,
    }
}

/// Architecture guide for one doc type, or `None` without insights.
pub fn architecture_guide(
    doc_type: DocType,
    insights: &[Insight],
    stamp: &GenerationStamp,
) -> Option<Guide> {
    if insights.is_empty() {
        return None;
    }
    let title = architecture_title(doc_type);
    let mut out = String::new();

    let _ = write!(
        out,
        "# {title}

*Architectural insights extracted from documentation analysis*

## Overview

This guide documents the architectural decisions and design patterns identified in the \
system documentation.

"
    );

    for insight in insights {
        let _ = write!(out, "## {}\n\n", insight.title);
        if !insight.architecture().is_empty() {
            out.push_str("### Architectural Decisions\n\n");
            for point in insight.architecture() {
                let _ = writeln!(out, "- {}", point);
            }
            out.push('\n');
        }
        if !insight.implementation().is_empty() {
            out.push_str("### Implementation Guidance\n\n");
            for point in insight.implementation() {
                let _ = writeln!(out, "- {}", point);
            }
            out.push('\n');
        }
    }

    footer(
        &mut out,
        &format!("Generated from {} documentation sources", insights.len()),
        stamp,
    );

    Some(Guide {
        title,
        filename: architecture_filename(doc_type),
        body: out,
        kind: GuideKind::Architecture,
    })
}

pub fn architecture_title(doc_type: DocType) -> String {
    format!("{} Architecture Guide", title_case(doc_type.as_str()))
}

pub fn architecture_filename(doc_type: DocType) -> String {
    format!("{}_architecture.md", doc_type.as_str())
}

/// The single aggregate pitfalls guide.
///
/// `log_pitfalls` come from execution logs and lead the guide; each gets a
/// remediation note. `other_pitfalls` follow as a plain list. The
/// best-practices checklist is always present.
pub fn pitfalls_guide(
    log_pitfalls: &[&str],
    other_pitfalls: &[&str],
    stamp: &GenerationStamp,
) -> Guide {
    let mut out = String::new();
    let _ = write!(
        out,
        "# {PITFALLS_TITLE}

*Pitfalls and gotchas identified from real system analysis*

## Overview

This guide documents common pitfalls, gotchas and issues identified through analysis of \
real implementations. Use it to avoid common mistakes when building similar systems.

"
    );

    if !log_pitfalls.is_empty() {
        out.push_str("## Production Issues (From Log Analysis)\n\n");
        for (i, gotcha) in log_pitfalls.iter().take(MAX_LOG_PITFALLS).enumerate() {
            let _ = write!(
                out,
                "### {}. {}\n\n**How to avoid:** Implement proper error handling and monitoring for this scenario.\n\n",
                i + 1,
                gotcha
            );
        }
    }

    if !other_pitfalls.is_empty() {
        out.push_str("## Implementation Gotchas\n\n");
        for gotcha in other_pitfalls.iter().take(MAX_OTHER_PITFALLS) {
            let _ = writeln!(out, "- **{}**", gotcha);
        }
        out.push('\n');
    }

    out.push_str(
        "## General Best Practices

Based on the analysis, follow these best practices to avoid common issues:

### Error Handling
- Always implement comprehensive error handling
- Log errors with sufficient context for debugging
- Provide meaningful error messages to users

### Performance
- Monitor system performance in production
- Implement proper caching strategies
- Optimize database queries and API calls

### Security
- Validate all user inputs
- Implement proper authentication and authorization
- Keep dependencies updated and secure

### Testing
- Write comprehensive tests for all functionality
- Test error scenarios and edge cases
- Implement automated testing in CI/CD pipeline

### Monitoring
- Set up proper logging and monitoring
- Implement health checks and alerts
- Monitor key business metrics
",
    );

    footer(
        &mut out,
        "Generated from analysis of logs, documentation and code patterns",
        stamp,
    );

    Guide {
        title: PITFALLS_TITLE.to_string(),
        filename: PITFALLS_FILENAME.to_string(),
        body: out,
        kind: GuideKind::Pitfalls,
    }
}
