//! # Redline DOCX
//!
//! Revision-aware reading of DOCX packages and injection of review comments.
//!
//! ## Features
//!
//! - **Reconstruction**: Final paragraph text with tracked deletions removed
//!   and insertions kept, plus the revisions and comments touching each
//!   paragraph
//! - **Annotation Parsing**: `[paragraph N]` markers in free-text review output
//! - **Comment Injection**: Anchored comments written back into the package
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Redline DOCX                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DocxPackage ──► DocumentAnalyzer ──► DocumentAnalysis          │
//! │       │              │                                          │
//! │       │              ▼                                          │
//! │       │     CommentDirectory / NumberingDefinitions             │
//! │       ▼                                                         │
//! │  CommentInjector ◄── resolve ◄── AnnotationParser               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redline_docx::{AnnotationParser, CommentInjector, DocxPackage, InjectionOptions};
//!
//! let analysis = redline_docx::load_analysis("contract.docx")?;
//! let annotations = AnnotationParser::with_defaults()?.parse(&review_text);
//!
//! let mut injector = CommentInjector::new(DocxPackage::open("contract.docx")?, InjectionOptions::default())?;
//! let report = injector.inject(&annotations);
//! injector.finish()?.save("contract_commented.docx")?;
//! ```

pub mod annotation;
pub mod body;
pub mod comments;
pub mod error;
pub mod inject;
pub mod markup;
pub mod model;
pub mod numbering;
pub mod package;
pub mod reconstruct;
pub mod rels;
pub mod resolver;

pub use annotation::{AnnotationParser, CommentTarget, ParserConfig, ReviewAnnotation, group_by_paragraph};
pub use comments::{CommentDirectory, CommentRecord};
pub use error::{DocxError, InjectionError, Result};
pub use inject::{CommentInjector, InjectionOptions, InjectionReport, SkippedAnnotation};
pub use model::{ChangeEvent, ChangeKind, DocumentAnalysis, ListMembership, Paragraph};
pub use numbering::NumberingDefinitions;
pub use package::DocxPackage;
pub use reconstruct::{DocumentAnalyzer, ParagraphReconstructor, load_analysis};
pub use resolver::{RunSpan, resolve};
