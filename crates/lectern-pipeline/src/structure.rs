//! Line-level heading detection
//!
//! Splits raw text into heading and text blocks, tracking the heading path
//! each block sits under.

use lectern_domain::ContentBlock;
use regex::Regex;
use std::sync::LazyLock;

/// Deepest heading level the parser reports
pub const MAX_HEADING_LEVEL: u8 = 5;

/// Headings detected by shape (all caps, trailing colon) must be shorter than this
const SHORT_LINE_CHARS: usize = 80;

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*)\.?\s+(\S.*)$").expect("hardcoded regex pattern is valid")
});

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Chapter|Section|Part|Unit|Lesson|Module|Theorem|Lemma|Definition|Example|Appendix)\b")
        .expect("hardcoded regex pattern is valid")
});

static MARKDOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(\S.*?)\s*#*$").expect("hardcoded regex pattern is valid"));

/// Heading level of `line`, or `None` for body text
///
/// Rules are tried in priority order: numbered sections, keyword headings,
/// markdown headings, all-caps lines, then short colon-terminated lines.
pub fn heading_level(line: &str) -> Option<(u8, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(caps) = NUMBERED.captures(line) {
        let depth = caps[1].split('.').count().min(MAX_HEADING_LEVEL as usize) as u8;
        return Some((depth, line.to_string()));
    }

    if let Some(caps) = KEYWORD.captures(line) {
        let level = match &caps[1] {
            "Chapter" | "Part" | "Unit" | "Module" => 1,
            "Section" | "Lesson" | "Appendix" => 2,
            _ => 3,
        };
        return Some((level, line.to_string()));
    }

    if let Some(caps) = MARKDOWN.captures(line) {
        let level = (caps[1].len() as u8).min(MAX_HEADING_LEVEL);
        return Some((level, caps[2].to_string()));
    }

    if is_all_caps_heading(line) {
        return Some((1, line.to_string()));
    }

    if line.ends_with(':') && line.chars().count() < SHORT_LINE_CHARS {
        return Some((3, line.trim_end_matches(':').trim().to_string()));
    }

    None
}

fn is_all_caps_heading(line: &str) -> bool {
    if line.chars().count() >= SHORT_LINE_CHARS {
        return false;
    }
    let words = line.split_whitespace().filter(|w| w.chars().any(char::is_alphabetic)).count();
    words >= 2 && line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}

/// Parse text into content blocks
///
/// Never fails. Text without any heading becomes a single text block with an
/// empty heading path.
///
/// # Examples
///
/// ```
/// use lectern_pipeline::structure::parse;
///
/// let blocks = parse("## Optics\nLight bends.\n## Waves\nSound travels.");
/// assert_eq!(blocks.len(), 4);
/// assert_eq!(blocks[3].heading_path, vec!["Waves"]);
/// ```
pub fn parse(text: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut stack: Vec<(u8, String)> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut pending_offset = 0;
    let mut offset = 0;

    for raw in text.split_inclusive('\n') {
        let line_offset = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            if !pending.is_empty() {
                pending.push("");
            }
            continue;
        }

        match heading_level(line) {
            Some((level, title)) => {
                flush(&mut blocks, &mut pending, pending_offset, &stack);
                while stack.last().is_some_and(|(l, _)| *l >= level) {
                    stack.pop();
                }
                let path = stack.iter().map(|(_, t)| t.clone()).collect();
                blocks.push(ContentBlock::heading(title.clone(), level, path, line_offset));
                stack.push((level, title));
            }
            None => {
                if pending.is_empty() {
                    pending_offset = line_offset;
                }
                pending.push(line);
            }
        }
    }
    flush(&mut blocks, &mut pending, pending_offset, &stack);
    blocks
}

fn flush(blocks: &mut Vec<ContentBlock>, pending: &mut Vec<&str>, offset: usize, stack: &[(u8, String)]) {
    while pending.last().is_some_and(|l| l.is_empty()) {
        pending.pop();
    }
    if pending.is_empty() {
        return;
    }
    let content = pending.join("\n");
    let path = stack.iter().map(|(_, t)| t.clone()).collect();
    blocks.push(ContentBlock::text(content, path, offset));
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_heading_depth() {
        assert_eq!(heading_level("1 Introduction").map(|h| h.0), Some(1));
        assert_eq!(heading_level("2.3.1 Boundary Cases").map(|h| h.0), Some(3));
        assert_eq!(heading_level("1.2.3.4.5.6.7 Deep").map(|h| h.0), Some(5));
    }

    #[test]
    fn test_keyword_heading_levels() {
        assert_eq!(heading_level("Chapter 4 Energy").map(|h| h.0), Some(1));
        assert_eq!(heading_level("Section 2").map(|h| h.0), Some(2));
        assert_eq!(heading_level("Theorem 3 (Bayes)").map(|h| h.0), Some(3));
    }

    #[test]
    fn test_markdown_heading_strips_hashes() {
        assert_eq!(heading_level("### Rates ###"), Some((3, "Rates".to_string())));
        assert_eq!(heading_level("###### Tiny"), Some((5, "Tiny".to_string())));
    }

    #[test]
    fn test_shape_based_headings() {
        assert_eq!(heading_level("THERMAL PHYSICS"), Some((1, "THERMAL PHYSICS".to_string())));
        assert_eq!(heading_level("Key results:"), Some((3, "Key results".to_string())));
        assert_eq!(heading_level("NASA"), None);
        assert_eq!(heading_level("An ordinary sentence of prose."), None);
    }

    #[test]
    fn test_text_without_headings_is_one_block() {
        let blocks = parse("first line\nsecond line\n\nthird paragraph");
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].is_heading());
        assert!(blocks[0].heading_path.is_empty());
        assert_eq!(blocks[0].content, "first line\nsecond line\n\nthird paragraph");
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("\n \n").is_empty());
    }

    #[test]
    fn test_heading_path_pops_to_level() {
        let text = "# Physics\nintro\n## Optics\nlight\n## Waves\nsound\n# Chemistry\natoms";
        let blocks = parse(text);
        let waves_text = blocks.iter().find(|b| b.content == "sound").unwrap();
        assert_eq!(waves_text.heading_path, vec!["Physics", "Waves"]);
        let chem_heading = blocks.iter().find(|b| b.content == "Chemistry").unwrap();
        assert!(chem_heading.heading_path.is_empty());
        let atoms = blocks.iter().find(|b| b.content == "atoms").unwrap();
        assert_eq!(atoms.heading_path, vec!["Chemistry"]);
    }

    #[test]
    fn test_shallower_heading_pops_every_deeper_entry() {
        let text = "## Mechanics\n### Kinematics\nvelocity\n#### Projectiles\narcs\n## Energy\nwork";
        let blocks = parse(text);
        let energy = blocks.iter().find(|b| b.content == "Energy").unwrap();
        assert!(energy.heading_path.is_empty());
        let work = blocks.iter().find(|b| b.content == "work").unwrap();
        assert_eq!(work.heading_path, vec!["Energy"]);

        // skipped levels leave the path shorter than level - 1
        let blocks = parse("# Physics\n### Lenses\nfocus\n## Waves\nsound");
        let sound = blocks.iter().find(|b| b.content == "sound").unwrap();
        assert_eq!(sound.heading_path, vec!["Physics", "Waves"]);
        let focus = blocks.iter().find(|b| b.content == "focus").unwrap();
        assert_eq!(focus.heading_path, vec!["Physics", "Lenses"]);
    }

    #[test]
    fn test_offsets_point_into_source() {
        let text = "intro text\n## Optics\nlight bends";
        let blocks = parse(text);
        for block in &blocks {
            assert!(text[block.offset..].starts_with(block.content.lines().next().unwrap_or("")) || block.is_heading());
        }
        assert_eq!(blocks[1].offset, 11);
        assert_eq!(blocks[2].offset, 21);
    }
}
