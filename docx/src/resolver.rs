//! Mapping comment targets onto a paragraph's runs.

use serde::{Deserialize, Serialize};

use crate::annotation::CommentTarget;

/// A contiguous range of runs selected for a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpan {
    /// Index of the first selected run.
    pub first_run: usize,

    /// Index of the last selected run, inclusive.
    pub last_run: usize,

    /// Character offset where the first selected run starts in the
    /// concatenated run text.
    pub start: usize,

    /// Character offset where the last selected run ends, exclusive.
    pub end: usize,
}

/// Character extents of each run within the concatenated run text.
fn extents<S: AsRef<str>>(runs: &[S]) -> Vec<(usize, usize)> {
    let mut offset = 0;
    runs.iter()
        .map(|run| {
            let len = run.as_ref().chars().count();
            let extent = (offset, offset + len);
            offset += len;
            extent
        })
        .collect()
}

fn span(extents: &[(usize, usize)], first_run: usize, last_run: usize) -> RunSpan {
    RunSpan {
        first_run,
        last_run,
        start: extents[first_run].0,
        end: extents[last_run].1,
    }
}

/// Resolve `target` against the texts of a paragraph's runs.
///
/// Returns `None` only when there are no runs. Any target that cannot be
/// found falls back to the whole paragraph.
pub fn resolve<S: AsRef<str>>(runs: &[S], target: &CommentTarget) -> Option<RunSpan> {
    if runs.is_empty() {
        return None;
    }
    let extents = extents(runs);
    let whole = span(&extents, 0, runs.len() - 1);

    let resolved = match target {
        CommentTarget::Paragraph => None,
        CommentTarget::Literal { text } if !text.is_empty() => runs
            .iter()
            .position(|run| run.as_ref().contains(text.as_str()))
            .map(|i| span(&extents, i, i)),
        CommentTarget::Literal { .. } => None,
        CommentTarget::Range { start, end } => resolve_range(runs, &extents, start, end),
    };
    Some(resolved.unwrap_or(whole))
}

fn resolve_range<S: AsRef<str>>(
    runs: &[S],
    extents: &[(usize, usize)],
    start: &str,
    end: &str,
) -> Option<RunSpan> {
    if start.is_empty() || end.is_empty() {
        return None;
    }
    let text: String = runs.iter().map(AsRef::as_ref).collect();
    let start_byte = text.find(start)?;
    let end_byte = start_byte + text[start_byte..].find(end)? + end.len();

    let from = text[..start_byte].chars().count();
    let to = text[..end_byte].chars().count();

    let mut overlapping = extents
        .iter()
        .enumerate()
        .filter(|(_, (a, b))| *a < to && *b > from)
        .map(|(i, _)| i);
    let first = overlapping.next()?;
    let last = overlapping.last().unwrap_or(first);
    Some(span(extents, first, last))
}
