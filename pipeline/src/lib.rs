//! # Redline Pipeline
//!
//! Orchestrates the two directions of a contract review:
//!
//! - **Read path**: DOCX → `DocumentAnalysis` (final text, revisions,
//!   comments) for a review generator
//! - **Write path**: review text → annotations → optional locator
//!   refinement → comments injected into a copy of the DOCX
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Review Pipeline                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  source.docx ──► DocumentAnalyzer ──► DocumentAnalysis (JSON)   │
//! │                                                                 │
//! │  review text ──► AnnotationParser ──► CommentLocator (opt.)     │
//! │                                            │                    │
//! │                                            ▼                    │
//! │  source.docx ──────────────────────► CommentInjector            │
//! │                                            │                    │
//! │                                            ▼                    │
//! │                               source_commented.docx             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redline_pipeline::{ReviewConfig, ReviewPipeline};
//!
//! let pipeline = ReviewPipeline::new(ReviewConfig::default())?;
//! let analysis = pipeline.analyze("contract.docx")?;
//! let outcome = pipeline.annotate_default("contract.docx", &review_text).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::{LocatorConfig, ReviewConfig};
pub use engine::{AnnotationOutcome, ReviewPipeline, default_output_path};
pub use error::{PipelineError, Result};

// Re-export from dependencies for convenience
pub use redline_docx::{DocumentAnalysis, InjectionReport, ReviewAnnotation};
pub use redline_locator::{CommentLocator, LocatedSpan};
