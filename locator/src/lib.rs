//! # Redline Locator
//!
//! Optional refinement of whole-paragraph review comments: a text
//! generation model is asked which part of the paragraph each comment is
//! about, and answers with start/end phrases.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Comment Locator                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  paragraph text + comments ──► CommentLocator ──► LocatedSpan   │
//! │                                     │                │          │
//! │                                     ▼                ▼          │
//! │                               GeminiLocator      validate()     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod gemini;
pub mod locator;

pub use error::{LocatorError, Result};
pub use gemini::GeminiLocator;
pub use locator::{CommentLocator, LocatedSpan};
