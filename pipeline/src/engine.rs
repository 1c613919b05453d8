//! Review pipeline implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redline_docx::{
    AnnotationParser, CommentInjector, CommentTarget, DocumentAnalysis, DocumentAnalyzer, DocxPackage,
    InjectionReport, ReviewAnnotation, group_by_paragraph,
};
use redline_locator::CommentLocator;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReviewConfig;
use crate::error::{PipelineError, Result};

/// Read path and write path over one document at a time.
///
/// The document work is synchronous; only locator calls are awaited.
pub struct ReviewPipeline {
    /// Configuration.
    config: ReviewConfig,

    parser: AnnotationParser,

    /// Refines whole-paragraph annotations, when configured.
    locator: Option<Arc<dyn CommentLocator>>,
}

impl ReviewPipeline {
    /// Create a pipeline. The Gemini locator is attached when the locator
    /// is enabled and its API key is available.
    pub fn new(config: ReviewConfig) -> Result<Self> {
        config.validate()?;
        let parser = AnnotationParser::new(&config.parser_config())?;

        let locator: Option<Arc<dyn CommentLocator>> = if config.locator.enabled {
            let gemini = config.locator.build();
            if gemini.is_available() {
                info!("Comment locator enabled with model: {}", gemini.model());
                Some(Arc::new(gemini))
            } else {
                warn!(
                    "Comment locator enabled but {} is not set, comments stay on whole paragraphs",
                    config.locator.api_key_env
                );
                None
            }
        } else {
            None
        };

        Ok(Self {
            config,
            parser,
            locator,
        })
    }

    /// Use the given locator instead of the configured one.
    pub fn with_locator(mut self, locator: Arc<dyn CommentLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Never call a locator.
    pub fn without_locator(mut self) -> Self {
        self.locator = None;
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn has_locator(&self) -> bool {
        self.locator.is_some()
    }

    /// Reconstruct a document.
    pub fn analyze(&self, path: impl AsRef<Path>) -> Result<DocumentAnalysis> {
        Ok(DocumentAnalyzer::open(path)?.analyze()?)
    }

    /// Parse review text with the configured marker label.
    pub fn parse_review(&self, review_text: &str) -> Vec<ReviewAnnotation> {
        self.parser.parse(review_text)
    }

    /// Write the annotations in `review_text` into a copy of `source`.
    ///
    /// The output is published atomically and only once every annotation
    /// has been written or skipped.
    pub async fn annotate(
        &self,
        source: impl AsRef<Path>,
        review_text: &str,
        output: impl AsRef<Path>,
    ) -> Result<AnnotationOutcome> {
        let source = source.as_ref();
        let output = output.as_ref();
        if same_file(source, output) {
            return Err(PipelineError::Config(format!(
                "output would overwrite the source document {}",
                source.display()
            )));
        }

        let annotations = self.parse_review(review_text);
        info!("Parsed {} annotations for {}", annotations.len(), source.display());

        let package = DocxPackage::open(source)?;
        let mut injector = CommentInjector::new(package, self.config.injection_options())?;

        let (annotations, refined) = self.refine(&injector, annotations).await;
        let report = injector.inject(&annotations);
        injector.finish()?.save(output)?;

        info!(
            "Annotated {} -> {}: {} comments, {} skipped, {} refined",
            source.display(),
            output.display(),
            report.injected_count(),
            report.skipped.len(),
            refined
        );
        Ok(AnnotationOutcome {
            output: output.to_path_buf(),
            parsed: annotations.len(),
            refined,
            report,
        })
    }

    /// Write into the default output path next to `source`.
    pub async fn annotate_default(&self, source: impl AsRef<Path>, review_text: &str) -> Result<AnnotationOutcome> {
        let source = source.as_ref();
        let output = default_output_path(source, &self.config.output_suffix);
        self.annotate(source, review_text, output).await
    }

    /// Ask the locator to narrow whole-paragraph annotations.
    ///
    /// Annotations are sent one paragraph at a time. A failed call or an
    /// invalid span leaves the affected annotations on their whole
    /// paragraph. Returns the annotations grouped by paragraph and the
    /// number that were narrowed.
    async fn refine(
        &self,
        injector: &CommentInjector,
        annotations: Vec<ReviewAnnotation>,
    ) -> (Vec<ReviewAnnotation>, usize) {
        let grouped = group_by_paragraph(annotations);
        let Some(locator) = &self.locator else {
            return (grouped.into_values().flatten().collect(), 0);
        };

        let mut refined = 0;
        let mut result = Vec::new();
        for (index, mut batch) in grouped {
            let Some(paragraph_text) = injector.paragraph_text(index) else {
                result.extend(batch);
                continue;
            };
            let pending: Vec<usize> = batch
                .iter()
                .enumerate()
                .filter(|(_, annotation)| annotation.is_unresolved())
                .map(|(i, _)| i)
                .collect();
            if pending.is_empty() || paragraph_text.trim().is_empty() {
                result.extend(batch);
                continue;
            }

            let bodies: Vec<String> = pending
                .iter()
                .map(|&i| batch[i].comment_text().to_string())
                .collect();
            match locator.locate(&paragraph_text, &bodies).await {
                Ok(spans) if spans.len() == pending.len() => {
                    for (&i, span) in pending.iter().zip(spans) {
                        if let Some((start, end)) = span.validate(&paragraph_text) {
                            batch[i].target = CommentTarget::Range { start, end };
                            refined += 1;
                        } else if !span.is_empty() {
                            debug!("Discarding span {span:?} not found in paragraph {index}");
                        }
                    }
                }
                Ok(spans) => warn!(
                    "Locator {} returned {} spans for {} comments on paragraph {index}",
                    locator.name(),
                    spans.len(),
                    pending.len()
                ),
                Err(e) => warn!("Locator {} failed on paragraph {index}: {e}", locator.name()),
            }
            result.extend(batch);
        }
        (result, refined)
    }
}

/// What an annotation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationOutcome {
    /// Where the commented copy was written.
    pub output: PathBuf,

    /// Annotations found in the review text.
    pub parsed: usize,

    /// Annotations narrowed by the locator.
    pub refined: usize,

    pub report: InjectionReport,
}

/// Default location of the commented copy: `<stem><suffix>.docx` next to
/// the source.
pub fn default_output_path(source: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let source = source.as_ref();
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    source.with_file_name(format!("{stem}{suffix}.docx"))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
