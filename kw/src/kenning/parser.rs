//! Line scanner that segments kenning markdown into frames

use tracing::{debug, warn};

use super::{Frame, Kenning, UNKNOWN_IDENTIFIER};

const IDENTIFIER_PREFIX: &str = "# Kenning:";
const FRAME_PREFIX: &str = "## Frame ";

/// Headings that end a frame body without starting a new frame
const STOP_PREFIXES: [&str; 3] = ["## Task", "## Reflection", "## Meta"];

/// What a single line means to the scanner
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    /// `## Frame <n>: <title>`
    FrameStart { number: u64, title: &'a str },
    /// `## Task`, `## Reflection` or `## Meta`
    Stop,
    /// Anything else
    Text(&'a str),
}

impl<'a> Line<'a> {
    fn classify(line: &'a str) -> Self {
        if let Some((number, title)) = frame_marker(line) {
            return Line::FrameStart { number, title };
        }
        if STOP_PREFIXES.iter().any(|p| line.starts_with(p)) {
            return Line::Stop;
        }
        Line::Text(line)
    }
}

/// Parse `## Frame <digits>:<title>`, returning the ordinal and trimmed title
fn frame_marker(line: &str) -> Option<(u64, &str)> {
    let rest = line.strip_prefix(FRAME_PREFIX)?;
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let title = rest[digits..].strip_prefix(':')?;
    match rest[..digits].parse() {
        Ok(number) => Some((number, title.trim())),
        Err(e) => {
            warn!(%line, error = %e, "Frame ordinal out of range, treating heading as body text");
            None
        }
    }
}

/// Identifier from the first `# Kenning: <id>` line that names one
fn identifier(text: &str) -> Option<&str> {
    text.lines()
        .filter_map(|line| line.strip_prefix(IDENTIFIER_PREFIX))
        .map(str::trim)
        .find(|id| !id.is_empty())
}

/// A dash-only line of three or more dashes, optionally padded with whitespace
fn is_horizontal_rule(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

/// Trim the body and blank out horizontal rules used as separators inside it
///
/// A rule and any blank lines right after it collapse into one empty line,
/// so the paragraphs on either side stay apart.
fn clean_body(lines: &[&str]) -> String {
    let joined = lines.join("\n");
    let mut kept = Vec::new();
    let mut after_rule = false;
    for line in joined.trim().lines() {
        if is_horizontal_rule(line) {
            kept.push("");
            after_rule = true;
        } else if after_rule && line.trim().is_empty() {
            continue;
        } else {
            kept.push(line);
            after_rule = false;
        }
    }
    kept.join("\n").trim().to_string()
}

/// Frame being collected while scanning
struct OpenFrame<'a> {
    number: u64,
    title: &'a str,
    body: Vec<&'a str>,
}

impl OpenFrame<'_> {
    fn close(self) -> Frame {
        Frame {
            number: self.number,
            title: self.title.to_string(),
            prompt: clean_body(&self.body),
        }
    }
}

pub(super) fn parse(text: &str) -> Kenning {
    debug!(text_len = text.len(), "parse: called");
    let identifier = identifier(text).unwrap_or(UNKNOWN_IDENTIFIER).to_string();

    let mut frames = Vec::new();
    let mut open: Option<OpenFrame> = None;

    for line in text.lines() {
        match Line::classify(line) {
            Line::FrameStart { number, title } => {
                frames.extend(open.take().map(OpenFrame::close));
                open = Some(OpenFrame {
                    number,
                    title,
                    body: Vec::new(),
                });
            }
            Line::Stop => {
                frames.extend(open.take().map(OpenFrame::close));
            }
            Line::Text(body_line) => {
                if let Some(frame) = open.as_mut() {
                    frame.body.push(body_line);
                }
            }
        }
    }
    frames.extend(open.take().map(OpenFrame::close));

    // Stable: equal ordinals keep document order
    frames.sort_by_key(|f| f.number);

    debug!(%identifier, frame_count = frames.len(), "parse: done");
    Kenning { identifier, frames }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_frame_marker() {
        assert_eq!(
            Line::classify("## Frame 12: The *parser* `core`"),
            Line::FrameStart {
                number: 12,
                title: "The *parser* `core`"
            }
        );
        assert_eq!(
            Line::classify("## Frame 3:no space"),
            Line::FrameStart {
                number: 3,
                title: "no space"
            }
        );
    }

    #[test]
    fn test_classify_not_a_marker() {
        assert_eq!(Line::classify("## Frame one: words"), Line::Text("## Frame one: words"));
        assert_eq!(Line::classify("## Frame 4 missing colon"), Line::Text("## Frame 4 missing colon"));
        assert_eq!(Line::classify("### Frame 1: deeper"), Line::Text("### Frame 1: deeper"));
        assert_eq!(Line::classify(" ## Frame 1: indented"), Line::Text(" ## Frame 1: indented"));
        assert_eq!(
            Line::classify("## Frame 99999999999999999999999: overflow"),
            Line::Text("## Frame 99999999999999999999999: overflow")
        );
    }

    #[test]
    fn test_classify_wide_ordinal() {
        assert_eq!(
            Line::classify("## Frame 99999999999: Past u32"),
            Line::FrameStart {
                number: 99_999_999_999,
                title: "Past u32"
            }
        );
    }

    #[test]
    fn test_classify_stop_markers() {
        assert_eq!(Line::classify("## Task"), Line::Stop);
        assert_eq!(Line::classify("## Reflection"), Line::Stop);
        assert_eq!(Line::classify("## Meta"), Line::Stop);
        assert_eq!(Line::classify("## Metadata"), Line::Stop);
        assert_eq!(Line::classify("## Notes"), Line::Text("## Notes"));
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("# Kenning: core/foo\n"), Some("core/foo"));
        assert_eq!(identifier("intro\n# Kenning:   spaced/id  \n"), Some("spaced/id"));
        assert_eq!(identifier("# Kenning:\n# Kenning: second\n"), Some("second"));
        assert_eq!(identifier("# Ken: nope\n"), None);
    }

    #[test]
    fn test_is_horizontal_rule() {
        assert!(is_horizontal_rule("---"));
        assert!(is_horizontal_rule("----------"));
        assert!(is_horizontal_rule("  ---  "));
        assert!(!is_horizontal_rule("--"));
        assert!(!is_horizontal_rule("--- not a rule"));
        assert!(!is_horizontal_rule("- - -"));
    }

    #[test]
    fn test_clean_body() {
        let lines = ["", "Read the code.", "", "---", "", "Then explain it.", "  ", "---", ""];
        assert_eq!(clean_body(&lines), "Read the code.\n\n\nThen explain it.");
        assert_eq!(clean_body(&["Alpha", "---", "Omega"]), "Alpha\n\nOmega");
        assert_eq!(clean_body(&["Alpha", "---", "", "  ", "Omega"]), "Alpha\n\nOmega");
        assert_eq!(clean_body(&["Alpha", "---", "---", "Omega"]), "Alpha\n\n\nOmega");
        assert_eq!(clean_body(&["", "---", ""]), "");
        assert_eq!(clean_body(&[]), "");
    }
}
