//! Turns a [`Segmentation`] into the writes that realize it.

use crate::model::{BlockContent, BlockUpdate, NewBlock, RichText, RichTextKind};
use crate::segment::{Region, Segment, Segmentation};

/// Longest text run the store accepts; longer text is spread over several runs.
pub const MAX_TEXT_RUN_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementPlan {
    /// No equation was recognized; the block is left alone.
    Unchanged,
    /// Same block, new rich text.
    InPlaceUpdate(BlockUpdate),
    /// The block is replaced by these siblings, in order.
    SplitIntoNodes(Vec<NewBlock>),
}

impl ReplacementPlan {
    pub fn is_effective(&self) -> bool {
        match self {
            ReplacementPlan::Unchanged => false,
            ReplacementPlan::InPlaceUpdate(_) => true,
            ReplacementPlan::SplitIntoNodes(blocks) => !blocks.is_empty(),
        }
    }
}

/// Decides how the block holding `original` should be rewritten.
///
/// Inline-only math keeps the block (and its kind, and a to-do's `checked`
/// state) and swaps its runs. Display math splits the block into paragraphs
/// and equation blocks, one equation block per display equation.
pub fn build(segmentation: &Segmentation, original: &BlockContent) -> ReplacementPlan {
    if !segmentation.changed {
        return ReplacementPlan::Unchanged;
    }

    if !segmentation.requires_split() {
        let BlockContent::Text(kind, body) = original else {
            return ReplacementPlan::Unchanged;
        };
        let rich_text = runs_from_segments(&segmentation.segments());
        return ReplacementPlan::InPlaceUpdate(BlockUpdate::RichText {
            kind: *kind,
            rich_text,
            checked: body.checked,
        });
    }

    let blocks: Vec<NewBlock> = segmentation
        .regions
        .iter()
        .filter_map(|region| match region {
            Region::Block(expression) => Some(NewBlock::Equation(expression.clone())),
            Region::Inline(segments) => paragraph(segments),
        })
        .collect();

    if blocks.is_empty() {
        ReplacementPlan::Unchanged
    } else {
        ReplacementPlan::SplitIntoNodes(blocks)
    }
}

/// Maps segments one-to-one onto runs, dropping empty text.
pub fn runs_from_segments(segments: &[Segment]) -> Vec<RichText> {
    let mut runs = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            Segment::Text(text) => push_text_runs(&mut runs, text),
            Segment::Equation(expression) => runs.push(RichText::equation(expression.as_str())),
        }
    }
    runs
}

/// Whether a run list shows anything: an equation or non-blank text.
pub fn has_meaningful_content(runs: &[RichText]) -> bool {
    runs.iter().any(|run| match &run.kind {
        RichTextKind::Text { text } => !text.content.trim().is_empty(),
        _ => true,
    })
}

fn paragraph(segments: &[Segment]) -> Option<NewBlock> {
    let mut segments = segments.to_vec();
    if let Some(Segment::Text(first)) = segments.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        *last = last.trim_end().to_string();
    }

    let runs = runs_from_segments(&segments);
    has_meaningful_content(&runs).then_some(NewBlock::Paragraph(runs))
}

fn push_text_runs(runs: &mut Vec<RichText>, text: &str) {
    let mut rest = text;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(MAX_TEXT_RUN_CHARS)
            .map_or(rest.len(), |(index, _)| index);
        let (head, tail) = rest.split_at(split);
        runs.push(RichText::text(head));
        rest = tail;
    }
}
