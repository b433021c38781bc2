//! Analysis instructions sent with each request.
//!
//! Each instruction asks for output under the headings the matching
//! [`parser`](crate::parser) profile recognises, so the parser's trigger
//! phrases ("Pattern Name", "What it does", "Architectural Insights",
//! "Implementation Guidance", "Gotchas", ...) must stay in sync with the
//! wording here.

use crate::models::{DocType, FileCategory};

/// Instruction for one source file of a code feature.
pub fn code_instruction(feature: &str, file_name: &str) -> String {
    format!(
        "Analyze this {feature} code and extract the implementation patterns someone would \
need to build a similar system.

For each significant pattern, answer under these labels:

1. **Pattern Name**: a short descriptive name
2. **What it does**: one line on the pattern's purpose
3. **How to implement**: step-by-step guidance
4. **Code example**: the key code, in a fenced block
5. **Why this approach**: the design reasoning

Prefer patterns that are reusable, show sound architectural decisions, solve common \
problems, or handle errors and edge cases.

File: {file_name}
Feature: {feature}

Separate patterns with a blank line and start each one with its Pattern Name line."
    )
}

const DOC_BASE: &str = "Analyze this documentation and extract what someone would need to build a \
similar system. Cover:

1. **Architectural Insights**: which architectural decisions were made and why
2. **Implementation Guidance**: how to approach building similar functionality
3. **Key Concepts**: the important concepts and patterns
4. **Dependencies and Integrations**: external systems and libraries in use
5. **Configuration and Setup**: how the system is configured and deployed

List findings as `- ` bullets under the Architectural Insights and Implementation \
Guidance headings.";

/// Instruction for one documentation file of the given type.
pub fn doc_instruction(doc_type: DocType) -> String {
    let specific = match doc_type {
        DocType::Readme => {
            "\n\nThis is a README. Extract:\n- Project architecture and layout\n\
             - Key features and how they work\n- Technology stack and dependencies\n\
             - Setup and run instructions\n- Usage patterns and examples\n"
        }
        DocType::Api => {
            "\n\nThis is API documentation. Extract:\n- API design conventions\n\
             - Authentication and authorization approach\n- Request/response structures\n\
             - Error handling strategy\n- Rate limiting and security measures\n"
        }
        DocType::Architecture => {
            "\n\nThis is architecture documentation. Extract:\n- Design decisions and rationale\n\
             - Component interactions and data flow\n- Scalability and performance considerations\n\
             - Security architecture\n- Integration points and external dependencies\n"
        }
        DocType::Setup => {
            "\n\nThis is setup/installation documentation. Extract:\n- Infrastructure requirements\n\
             - Configuration management\n- Deployment strategy\n- Environment setup procedure\n\
             - Common setup issues and their fixes\n"
        }
        DocType::Deployment => {
            "\n\nThis is deployment documentation. Extract:\n- Deployment architecture\n\
             - Infrastructure-as-code patterns\n- Container and orchestration setup\n\
             - CI/CD approach\n- Monitoring and logging setup\n"
        }
        DocType::Contributing | DocType::General => "",
    };
    format!("{}{}", DOC_BASE, specific)
}

pub const IMAGE_INSTRUCTION: &str = "Analyze this image and extract what would help someone \
build a similar system.

1. **System Architecture**: key components and how they interact
2. **Implementation Insights**: what it reveals about implementing similar functionality
3. **Design Patterns**: architectural or design patterns shown
4. **Technology Stack**: technologies, frameworks or tools shown or implied
5. **Data Flow**: how data moves through the system
6. **Integration Points**: external systems or services
7. **Implementation Gotchas**: challenges or pitfalls it reveals

Give each heading its own line followed by `- ` bullets. For a UI mockup focus on \
implementation approach; for an architecture diagram focus on system design.";

pub const BINARY_DOC_INSTRUCTION: &str = "Analyze this document and extract implementation \
insights.

1. **Technical Specifications**: requirements and specifications defined
2. **Architecture Decisions**: documented design decisions and why
3. **Implementation Approaches**: how the described functionality should be built
4. **Integration Requirements**: external systems or APIs to integrate
5. **Configuration and Setup**: configuration and setup procedures
6. **Common Issues**: problems, gotchas or challenges mentioned

Give each heading its own line followed by `- ` bullets.";

pub const LOG_INSTRUCTION: &str = "Analyze these application logs and extract lessons for \
building similar systems.

1. **Error Patterns**: recurring errors and how they should be handled
2. **System Behavior**: how the system behaves in production
3. **Performance Issues**: visible performance problems and how to avoid them
4. **Integration Gotchas**: integration challenges and external service issues
5. **Implementation Insights**: what this teaches about robust implementation
6. **Monitoring and Alerting**: what to monitor
7. **Common Pitfalls**: mistakes to avoid in similar implementations

Give each heading its own line followed by `- ` bullets.";

/// Instruction for a bundle of samples from one file category.
pub fn data_instruction(category: FileCategory) -> String {
    let mut prompt = format!(
        "Analyze these {category} samples and identify the patterns worth extracting as knowledge.

Cover:
1. **Data Structure Patterns**: common structures and formats
2. **Content Patterns**: the kinds of information present
3. **Use Case Patterns**: what someone would want to learn from this data
4. **Knowledge Extraction Goals**: tutorials or guides that could be generated

For each pattern give its own paragraph with:
- **Pattern Type**: structure, content, integration or workflow
- **Description**: what the pattern represents
- **Examples**: concrete examples from the samples
- **Knowledge Value**: what someone could learn from it"
    );
    if category == FileCategory::StructuredData {
        prompt.push_str(
            "\n\nFor API documentation in particular, look for:\n\
             - Endpoint patterns and structure\n- Request/response formats\n\
             - Authentication patterns\n- Integration workflows\n\
             - Common use cases and examples",
        );
    }
    prompt
}

/// Instruction asking for a source-analysis manifest tailored to the data.
pub fn manifest_instruction(use_case: &str, data_dir: &str, pattern_summary: &str) -> String {
    format!(
        "Write a SOURCE_ANALYSIS.md manifest for knowledge extraction, based on the discovered \
data patterns and the use case below.

USE CASE CONTEXT:
{use_case}

DATA DIRECTORY: {data_dir}

{pattern_summary}

The manifest must:
1. Use real paths under the data directory and the discovered patterns
2. Tailor its extraction goals to the use case
3. Give concrete, actionable extraction goals
4. List paths as `- ` bullets under the headings PRIMARY SOURCE CODE, \
DOCUMENTATION SOURCES and EXECUTION DATA

Return a complete Markdown file."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_instruction_names_parser_labels() {
        let p = code_instruction("authentication", "login.py");
        assert!(p.contains("**Pattern Name**"));
        assert!(p.contains("**What it does**"));
        assert!(p.contains("**Code example**"));
        assert!(p.contains("File: login.py"));
    }

    #[test]
    fn doc_instruction_appends_type_specific_text() {
        assert!(doc_instruction(DocType::Api).contains("API documentation"));
        assert_eq!(doc_instruction(DocType::General), DOC_BASE);
    }

    #[test]
    fn structured_data_gets_api_addendum() {
        assert!(data_instruction(FileCategory::StructuredData).contains("API documentation"));
        assert!(!data_instruction(FileCategory::Config).contains("API documentation"));
    }
}
