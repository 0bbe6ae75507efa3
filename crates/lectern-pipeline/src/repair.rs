//! Salvage JSON from model output
//!
//! Models wrap JSON in code fences, surround it with prose, and get cut off
//! mid-structure when they run out of tokens. `parse_robust` tries
//! progressively more invasive repairs and returns the first value that parses.

use crate::error::PipelineError;
use serde_json::Value;
use tracing::debug;

/// Characters removed per truncation attempt
const TRUNCATION_STEP: usize = 64;

/// Shortest candidate tried during truncation
const MIN_CANDIDATE_CHARS: usize = 2;

/// Parse model output into JSON, repairing it when needed
///
/// Strategies, in order:
/// 1. direct parse
/// 2. strip code fences and isolate the outermost `{...}` span
/// 3. the same span with open strings closed and missing closers appended
/// 4. progressive truncation from the end, re-balancing each candidate
///
/// Smart quotes are normalized before any repair.
///
/// # Examples
///
/// ```
/// use lectern_pipeline::repair::parse_robust;
///
/// let value = parse_robust("```json\n{\"concepts\": [{\"term\": \"Force\"").unwrap();
/// assert_eq!(value["concepts"][0]["term"], "Force");
/// ```
pub fn parse_robust(text: &str) -> Result<Value, PipelineError> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(value);
    }

    let normalized = normalize_quotes(text);
    let unfenced = strip_fences(&normalized);

    if let Ok(value) = serde_json::from_str::<Value>(unfenced.trim()) {
        debug!("JSON recovered after quote and fence cleanup");
        return Ok(value);
    }

    let Some(start) = unfenced.find('{') else {
        return Err(unparsable(text));
    };
    let tail = &unfenced[start..];

    if let Some(span) = outermost_object(tail) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            debug!("JSON recovered from outermost object span");
            return Ok(value);
        }
    }

    if let Ok(value) = serde_json::from_str::<Value>(&balance(tail)) {
        debug!("JSON recovered by balancing");
        return Ok(value);
    }

    let boundaries: Vec<usize> = tail.char_indices().map(|(i, _)| i).collect();
    let mut keep = boundaries.len().saturating_sub(TRUNCATION_STEP);
    while keep >= MIN_CANDIDATE_CHARS {
        let candidate = &tail[..boundaries[keep]];
        if let Ok(value) = serde_json::from_str::<Value>(&balance(candidate)) {
            debug!("JSON recovered by truncating to {} chars", keep);
            return Ok(value);
        }
        keep = keep.saturating_sub(TRUNCATION_STEP);
    }

    Err(unparsable(text))
}

fn unparsable(text: &str) -> PipelineError {
    let preview: String = text.trim().chars().take(120).collect();
    PipelineError::UnparsableOutput(preview)
}

/// Replace typographic quotes with ASCII ones
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect()
}

/// Content of the first fenced block, or the whole text without fences
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];
    // Skip the language tag on the fence line
    let body_start = after_open.find('\n').map_or(after_open.len(), |i| i + 1);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

#[derive(Debug, Default)]
struct ScanState {
    closers: Vec<char>,
    in_string: bool,
    escaped: bool,
    /// Byte index just past the object that closed the outermost brace
    complete_at: Option<usize>,
}

fn scan(text: &str) -> ScanState {
    let mut state = ScanState::default();
    for (i, c) in text.char_indices() {
        if state.in_string {
            if state.escaped {
                state.escaped = false;
            } else if c == '\\' {
                state.escaped = true;
            } else if c == '"' {
                state.in_string = false;
            }
            continue;
        }
        match c {
            '"' => state.in_string = true,
            '{' => state.closers.push('}'),
            '[' => state.closers.push(']'),
            '}' | ']' => {
                state.closers.pop();
                if state.closers.is_empty() && state.complete_at.is_none() {
                    state.complete_at = Some(i + 1);
                }
            }
            _ => {}
        }
    }
    state
}

/// The first complete `{...}` span of text starting at a `{`
fn outermost_object(text: &str) -> Option<&str> {
    scan(text).complete_at.map(|end| &text[..end])
}

/// Close open strings, drop dangling separators and append missing closers
fn balance(text: &str) -> String {
    let state = scan(text);
    let mut out = match state.complete_at {
        Some(end) => return text[..end].to_string(),
        None => text.to_string(),
    };

    if state.in_string {
        if state.escaped {
            out.pop();
        }
        out.push('"');
    }

    loop {
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
        if out.ends_with(',') || out.ends_with(':') {
            out.pop();
        } else {
            break;
        }
    }

    out.extend(state.closers.iter().rev());
    out
}
