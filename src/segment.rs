//! Masked output segmentation
//!
//! Splits the masked text returned by the service into plain and masked
//! spans for highlighted rendering.

/// Marker the masking service substitutes for every redacted value.
///
/// Occurrences are matched as a literal, non-overlapping substring scan, so a
/// run of five block characters is one marker followed by one plain block.
pub const MASK_MARKER: &str = "████";

/// Whether a span is ordinary text or a redaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Plain,
    Masked,
}

/// A contiguous run of masked output, borrowed from the source string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: SpanKind,
    pub text: &'a str,
}

impl<'a> Span<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self { kind: SpanKind::Plain, text }
    }

    pub fn masked(text: &'a str) -> Self {
        Self { kind: SpanKind::Masked, text }
    }

    pub fn is_masked(&self) -> bool {
        self.kind == SpanKind::Masked
    }
}

/// Split `masked_text` into spans using [`MASK_MARKER`].
pub fn segment_masked_text(masked_text: &str) -> Vec<Span<'_>> {
    segment_with_marker(masked_text, MASK_MARKER)
}

/// Split `text` into spans around every literal occurrence of `marker`.
///
/// Empty plain runs are never emitted, and concatenating the span texts
/// always reproduces `text`. An empty marker yields the whole input as one
/// plain span.
pub fn segment_with_marker<'a>(text: &'a str, marker: &str) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    if text.is_empty() {
        return spans;
    }
    if marker.is_empty() {
        spans.push(Span::plain(text));
        return spans;
    }

    let mut cursor = 0;
    for (idx, matched) in text.match_indices(marker) {
        if idx > cursor {
            spans.push(Span::plain(&text[cursor..idx]));
        }
        spans.push(Span::masked(matched));
        cursor = idx + matched.len();
    }
    if cursor < text.len() {
        spans.push(Span::plain(&text[cursor..]));
    }

    spans
}

/// Number of redactions in `masked_text`.
pub fn masked_span_count(masked_text: &str) -> usize {
    masked_text.matches(MASK_MARKER).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn join(spans: &[Span<'_>]) -> String {
        spans.iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_alice_called_bob() {
        let spans = segment_masked_text("████ called ████");
        assert_eq!(
            spans,
            vec![
                Span::masked("████"),
                Span::plain(" called "),
                Span::masked("████"),
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_no_spans() {
        assert!(segment_masked_text("").is_empty());
    }

    #[test]
    fn test_no_marker_is_single_plain_span() {
        let spans = segment_masked_text("nothing to hide");
        assert_eq!(spans, vec![Span::plain("nothing to hide")]);
    }

    #[test]
    fn test_five_blocks_is_one_marker_and_a_leftover() {
        let spans = segment_masked_text("a█████b");
        assert_eq!(
            spans,
            vec![
                Span::plain("a"),
                Span::masked("████"),
                Span::plain("█b"),
            ]
        );
    }

    #[test]
    fn test_adjacent_markers_stay_separate() {
        let spans = segment_masked_text("████████");
        assert_eq!(spans, vec![Span::masked("████"), Span::masked("████")]);
    }

    #[test]
    fn test_three_blocks_are_plain() {
        let spans = segment_masked_text("x███y");
        assert_eq!(spans, vec![Span::plain("x███y")]);
    }

    #[test]
    fn test_round_trip_reproduces_input() {
        let inputs = [
            "",
            "plain",
            "████",
            "████ leading",
            "trailing ████",
            "mid ████ dle",
            "█████████",
            "电话 ████，邮箱 ████。",
            "\n████\n",
        ];
        for input in inputs {
            assert_eq!(join(&segment_masked_text(input)), input, "input {:?}", input);
        }
    }

    #[test]
    fn test_masked_count_matches_marker_occurrences() {
        let inputs = [
            ("", 0),
            ("no markers", 0),
            ("████", 1),
            ("a████b████c████", 3),
            ("█████████", 2),
        ];
        for (input, expected) in inputs {
            let spans = segment_masked_text(input);
            let masked = spans.iter().filter(|s| s.is_masked()).count();
            assert_eq!(masked, expected, "input {:?}", input);
            assert_eq!(masked_span_count(input), expected);
        }
    }

    proptest! {
        #[test]
        fn spans_concatenate_to_input(input in "(████|██|█|[ab ]|é){0,24}") {
            let spans = segment_masked_text(&input);
            prop_assert_eq!(join(&spans), input.clone());
            prop_assert!(spans.iter().all(|s| !s.text.is_empty()));
            prop_assert!(spans.iter().filter(|s| s.is_masked()).all(|s| s.text == MASK_MARKER));
        }

        #[test]
        fn masked_spans_match_marker_occurrences(input in "(████|█|[xy]){0,24}") {
            let spans = segment_masked_text(&input);
            let masked = spans.iter().filter(|s| s.is_masked()).count();
            prop_assert_eq!(masked, input.match_indices(MASK_MARKER).count());
            prop_assert_eq!(masked_span_count(&input), masked);
        }

        #[test]
        fn arbitrary_text_round_trips(input in any::<String>()) {
            prop_assert_eq!(join(&segment_masked_text(&input)), input.clone());
        }
    }

    #[test]
    fn test_custom_marker() {
        let spans = segment_with_marker("call [X] now", "[X]");
        assert_eq!(
            spans,
            vec![Span::plain("call "), Span::masked("[X]"), Span::plain(" now")]
        );
        assert_eq!(segment_with_marker("abc", ""), vec![Span::plain("abc")]);
    }
}
