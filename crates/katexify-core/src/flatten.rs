use crate::model::{RichText, RichTextKind};

/// Concatenates the displayable text of a run list.
///
/// The store's own `plain_text` wins when present. Otherwise text runs yield
/// their content, equation runs their bare expression, and mentions nothing.
pub fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(run_text).collect()
}

fn run_text(run: &RichText) -> &str {
    if let Some(plain) = &run.plain_text {
        return plain;
    }
    match &run.kind {
        RichTextKind::Text { text } => &text.content,
        RichTextKind::Equation { equation } => &equation.expression,
        RichTextKind::Mention { .. } => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_runs_in_order() {
        let runs = vec![
            RichText::text("area "),
            RichText::equation(r"\pi r^2"),
            RichText::text(" here"),
        ];
        assert_eq!(plain_text(&runs), r"area \pi r^2 here");
    }

    #[test]
    fn prefers_reported_plain_text() {
        let mut run = RichText::text("ignored");
        run.plain_text = Some("$x$".into());
        assert_eq!(plain_text(&[run]), "$x$");
    }

    #[test]
    fn empty_list_is_empty_text() {
        assert_eq!(plain_text(&[]), "");
    }
}
