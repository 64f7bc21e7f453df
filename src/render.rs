use crate::mode::Mode;
use crate::session::{Message, MessageKind, Role};

const EMPHASIS_MARKER: &str = "**";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Emphasis(&'a str),
}

/// Splits `text` into plain and emphasised runs around `**...**` pairs.
/// Markers are dropped; a marker without a partner is kept as plain text.
pub fn split_emphasis(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(EMPHASIS_MARKER) {
        let after_open = &rest[open + EMPHASIS_MARKER.len()..];
        let Some(close) = after_open.find(EMPHASIS_MARKER) else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Plain(&rest[..open]));
        }
        if close > 0 {
            segments.push(Segment::Emphasis(&after_open[..close]));
        }
        rest = &after_open[close + EMPHASIS_MARKER.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Plain(rest));
    }
    segments
}

pub fn render_text(text: &str) -> String {
    split_emphasis(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(s) => s.to_string(),
            Segment::Emphasis(s) => format!("{}{}{}", BOLD, s, RESET),
        })
        .collect()
}

/// Terminal rendering of one transcript entry. RAG references are only shown
/// while the session is in RAG mode.
pub fn render_message(message: &Message, current_mode: Mode) -> String {
    let label = match message.role {
        Role::User => "you",
        Role::Bot => "bot",
    };
    let mut out = format!("{}{}>{} {}", BOLD, label, RESET, render_text(&message.content));

    if let Some(sources) = &message.sources {
        if message.kind == Some(MessageKind::RetrievalResult) {
            for source in sources {
                out.push_str(&format!("\n    [doc] {}", source));
            }
        } else if current_mode == Mode::Rag && message.is_bot() && !sources.is_empty() {
            out.push_str("\n    References:");
            for source in sources {
                out.push_str(&format!("\n      • {}", source));
            }
        }
    }

    if let Some(elapsed) = message.elapsed_seconds {
        out.push_str(&format!("\n    {}({:.2}s){}", DIM, elapsed, RESET));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(content: &str, kind: MessageKind, sources: &[&str]) -> Message {
        Message {
            role: Role::Bot,
            content: content.to_string(),
            kind: Some(kind),
            sources: Some(sources.iter().map(|s| s.to_string()).collect()),
            elapsed_seconds: Some(1.5),
        }
    }

    #[test]
    fn test_split_alternating_runs() {
        assert_eq!(
            split_emphasis("Sales rose **sharply** in **Q3**."),
            vec![
                Segment::Plain("Sales rose "),
                Segment::Emphasis("sharply"),
                Segment::Plain(" in "),
                Segment::Emphasis("Q3"),
                Segment::Plain("."),
            ]
        );
    }

    #[test]
    fn test_split_without_markers() {
        assert_eq!(split_emphasis("plain"), vec![Segment::Plain("plain")]);
        assert!(split_emphasis("").is_empty());
    }

    #[test]
    fn test_unmatched_marker_stays_literal() {
        assert_eq!(
            split_emphasis("**bold** and **dangling"),
            vec![
                Segment::Emphasis("bold"),
                Segment::Plain(" and **dangling"),
            ]
        );
    }

    #[test]
    fn test_single_asterisk_inside_emphasis() {
        assert_eq!(
            split_emphasis("rumus **a*b** dipakai"),
            vec![
                Segment::Plain("rumus "),
                Segment::Emphasis("a*b"),
                Segment::Plain(" dipakai"),
            ]
        );
    }

    #[test]
    fn test_render_text_strips_markers() {
        let rendered = render_text("a **b** c");
        assert!(!rendered.contains("**"));
        assert!(rendered.contains(&format!("{}b{}", BOLD, RESET)));
    }

    #[test]
    fn test_retrieval_sources_listed() {
        let message = bot("Found:", MessageKind::RetrievalResult, &["a.pdf", "b.xlsx"]);
        let rendered = render_message(&message, Mode::Retrieval);
        assert!(rendered.contains("[doc] a.pdf"));
        assert!(rendered.contains("[doc] b.xlsx"));
        assert!(rendered.contains("(1.50s)"));
    }

    #[test]
    fn test_rag_references_follow_current_mode() {
        let message = bot("Trend up", MessageKind::Plain, &["Memo.docx"]);
        assert!(render_message(&message, Mode::Rag).contains("References:"));
        assert!(!render_message(&message, Mode::Generative).contains("References:"));
    }

    #[test]
    fn test_user_message_has_no_footer() {
        let rendered = render_message(&Message::user("Halo"), Mode::Rag);
        assert!(rendered.ends_with("Halo"));
    }
}
