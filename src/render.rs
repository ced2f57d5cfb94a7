/// One displayable piece of a tutor response.
///
/// The solver prompt asks the model to mark solution steps with `STEP:` and
/// the final answer with `ANSWER:`; everything else is explanatory prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Step(String),
    Answer(String),
    Paragraph(String),
}

/// Split a response into ordered segments by line-prefix markers.
///
/// Lines are trimmed before classification; blank lines produce nothing.
/// If no line classifies at all (empty or whitespace-only response), the raw
/// text is returned as a single paragraph so the user still sees whatever
/// came back. This function cannot fail.
pub fn render(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("STEP:") {
            segments.push(Segment::Step(rest.trim().to_string()));
        } else if let Some(rest) = line.strip_prefix("ANSWER:") {
            segments.push(Segment::Answer(rest.trim().to_string()));
        } else if !line.is_empty() {
            segments.push(Segment::Paragraph(line.to_string()));
        }
    }

    if segments.is_empty() && !text.is_empty() {
        segments.push(Segment::Paragraph(text.to_string()));
    }

    segments
}
