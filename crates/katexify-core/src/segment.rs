//! Detection of `$$block$$` and `$inline$` math in flattened text.
//!
//! Block markup is recognized first. Each `$$..$$` match with real content
//! becomes a [`Region::Block`]; everything else (including malformed block
//! matches such as `$$ $$`) is scanned for inline markup and collected into
//! [`Region::Inline`] runs. A text with at least one block region has to be
//! split into several sibling blocks, a text with only inline equations can be
//! rewritten in place.

use std::sync::LazyLock;

use regex::Regex;

/// `$$`, then one or more characters (line breaks included), then `$$`.
/// Lazy so that `$$a$$ $$b$$` yields two matches.
pub static BLOCK_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$.+?\$\$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Equation(String),
}

impl Segment {
    pub fn is_equation(&self) -> bool {
        matches!(self, Segment::Equation(_))
    }

    fn is_blank(&self) -> bool {
        match self {
            Segment::Text(text) => text.trim().is_empty(),
            Segment::Equation(_) => false,
        }
    }
}

/// A stretch of the input that maps to one block when the text is split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    /// Text with zero or more inline equations.
    Inline(Vec<Segment>),
    /// A display equation that stands on its own.
    Block(String),
}

impl Region {
    pub fn has_equation(&self) -> bool {
        match self {
            Region::Inline(segments) => segments.iter().any(Segment::is_equation),
            Region::Block(_) => true,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Region::Inline(segments) => segments.iter().all(Segment::is_blank),
            Region::Block(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    pub regions: Vec<Region>,
    /// At least one equation was recognized.
    pub changed: bool,
}

impl Segmentation {
    /// True when the text contains display math and must become several blocks.
    pub fn requires_split(&self) -> bool {
        self.regions.iter().any(|r| matches!(r, Region::Block(_)))
    }

    /// The regions flattened into one ordered segment sequence.
    pub fn segments(&self) -> Vec<Segment> {
        let mut out = Vec::new();
        for region in &self.regions {
            match region {
                Region::Inline(segments) => out.extend(segments.iter().cloned()),
                Region::Block(expression) => out.push(Segment::Equation(expression.clone())),
            }
        }
        out
    }
}

/// Splits `text` into block and inline math regions.
pub fn segment(text: &str) -> Segmentation {
    let mut regions: Vec<Region> = Vec::new();
    let mut last = 0;

    for found in BLOCK_MATH_RE.find_iter(text) {
        push_inline(&mut regions, &text[last..found.start()]);
        match block_expression(found.as_str()) {
            Some(expression) => regions.push(Region::Block(expression.to_string())),
            // Not salvageable as display math; keep the raw text.
            None => push_inline(&mut regions, found.as_str()),
        }
        last = found.end();
    }
    push_inline(&mut regions, &text[last..]);

    if regions.iter().any(|r| matches!(r, Region::Block(_))) {
        regions.retain(|r| !r.is_blank());
    }

    let changed = regions.iter().any(Region::has_equation);
    Segmentation { regions, changed }
}

/// Inline-only scan: `$expr$` where neither marker belongs to a `$$` pair.
///
/// Empty text segments are never produced and adjacent text is merged, so an
/// input without recognizable markup comes back as a single text segment.
pub fn segment_inline(text: &str) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('$') {
        let open = pos + offset;
        if is_doubled(bytes, open) {
            pos = open + 1;
            continue;
        }
        let Some(close_offset) = text[open + 1..].find('$') else {
            break;
        };
        let close = open + 1 + close_offset;
        if bytes.get(close + 1) == Some(&b'$') {
            pos = close;
            continue;
        }
        let expression = text[open + 1..close].trim();
        if expression.is_empty() {
            // `$ $` is not math; the closing marker may still open one.
            pos = close;
            continue;
        }

        push_segment(&mut segments, Segment::Text(text[text_start..open].to_string()));
        segments.push(Segment::Equation(expression.to_string()));
        text_start = close + 1;
        pos = close + 1;
    }

    push_segment(&mut segments, Segment::Text(text[text_start..].to_string()));
    segments
}

/// Content of a `$$..$$` match, if it is usable as an equation.
fn block_expression(matched: &str) -> Option<&str> {
    let inner = matched.strip_prefix("$$")?.strip_suffix("$$")?;
    let expression = inner.trim();
    if expression.is_empty() || expression.chars().all(|c| c == '$') {
        None
    } else {
        Some(expression)
    }
}

fn is_doubled(bytes: &[u8], at: usize) -> bool {
    (at > 0 && bytes[at - 1] == b'$') || bytes.get(at + 1) == Some(&b'$')
}

fn push_inline(regions: &mut Vec<Region>, raw: &str) {
    let segments = segment_inline(raw);
    if segments.is_empty() {
        return;
    }
    if let Some(Region::Inline(previous)) = regions.last_mut() {
        for segment in segments {
            push_segment(previous, segment);
        }
    } else {
        regions.push(Region::Inline(segments));
    }
}

fn push_segment(segments: &mut Vec<Segment>, segment: Segment) {
    match segment {
        Segment::Text(text) if text.is_empty() => {}
        Segment::Text(text) => match segments.last_mut() {
            Some(Segment::Text(previous)) => previous.push_str(&text),
            _ => segments.push(Segment::Text(text)),
        },
        equation => segments.push(equation),
    }
}
