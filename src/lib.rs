//! # Know Pipe
//!
//! Turns unlabeled code, documentation, images and logs into a
//! cross-linked library of "how to build X" guides.
//!
//! Know Pipe samples each input so that only bounded excerpts reach an
//! external analysis service, parses the free-form answers back into typed
//! records, and assembles those records into Markdown guides.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ Scanner  │──▶│ Sampler  │──▶│ Gateway  │──▶│  Parser  │
//! │ classify │   │ excerpts │   │ analysis │   │ records  │
//! └──────────┘   └──────────┘   └──────────┘   └────┬─────┘
//!                                                   │
//!                ┌──────────┐   ┌──────────┐        │
//!                │ Library  │◀──│Assembler │◀───────┘
//!                │  (.md)   │   │ + Grouper│
//!                └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kp init                                   # create the library layout
//! kp scan ./data                            # see what would be sampled
//! kp run --manifest intake/SOURCE_ANALYSIS.md
//! kp discover ./data "JSON API docs for our integrations"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core record types |
//! | [`scanner`] | Inventory scanner and file classification |
//! | [`sampler`] | Bounded content sampling |
//! | [`parser`] | Analysis-text parser shared by every stream |
//! | [`grouper`] | Feature grouping of source files |
//! | [`relate`] | Pluggable feature ↔ insight relatedness |
//! | [`gateway`] | Analysis service abstraction |
//! | [`prompts`] | Analysis instructions |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`stream_code`] | Code stream |
//! | [`stream_docs`] | Documentation stream |
//! | [`stream_media`] | Image, document and log stream |
//! | [`discovery`] | Data discovery stream |
//! | [`manifest`] | Source-analysis manifest reader |
//! | [`source_analysis`] | Manifest generation for auto mode |
//! | [`render`] | Guide templates |
//! | [`assembler`] | Guide assembly across streams |
//! | [`library`] | Output directory layout and persistence |
//! | [`pipeline`] | Run orchestration and summary |
//! | [`progress`] | Progress reporting on stderr |

pub mod assembler;
pub mod config;
pub mod discovery;
pub mod extract;
pub mod gateway;
pub mod grouper;
pub mod library;
pub mod manifest;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod relate;
pub mod render;
pub mod sampler;
pub mod scanner;
pub mod source_analysis;
pub mod stream_code;
pub mod stream_docs;
pub mod stream_media;
