//! Lightweight markdown for assistant replies.
//!
//! Replies from the webhook are formatted text: headings, emphasis, lists,
//! inline code and line breaks.  This module parses that subset into blocks
//! and renders it for a terminal, with or without ANSI styling.  Anything it
//! does not recognize, including raw HTML, is shown literally.

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_UNDERLINE: &str = "\x1b[4m";
const ANSI_CYAN: &str = "\x1b[36m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

/// An inline span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Literal text.
    Text(String),
    /// `**strong**` or `__strong__`.
    Strong(Vec<Inline>),
    /// `*emphasis*` or `_emphasis_`.
    Emphasis(Vec<Inline>),
    /// `` `code` ``.
    Code(String),
    /// `[label](url)`.
    Link {
        /// The visible label.
        label: Vec<Inline>,
        /// The target, shown after the label.
        url: String,
    },
}

/// A block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `#` through `######` headings.
    Heading {
        /// Heading level, 1 to 6.
        level: u8,
        /// Heading text.
        content: Vec<Inline>,
    },
    /// Consecutive text lines; each source line stays its own line.
    Paragraph(Vec<Vec<Inline>>),
    /// `-`, `*` or `+` list item.
    Bullet(Vec<Inline>),
    /// `1.` style list item.
    Numbered {
        /// The number as written.
        number: u64,
        /// Item text.
        content: Vec<Inline>,
    },
    /// Fenced code, lines kept verbatim.
    Code(Vec<String>),
    /// `---`, `***` or `___`.
    Rule,
    /// One or more blank lines.
    Blank,
}

/// Parses text into blocks.
pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<Vec<Inline>> = Vec::new();
    let mut code: Option<Vec<String>> = None;

    for line in text.lines() {
        if let Some(lines) = code.as_mut() {
            if line.trim_start().starts_with("```") {
                blocks.push(Block::Code(code.take().unwrap_or_default()));
            } else {
                lines.push(line.to_string());
            }
            continue;
        }

        let trimmed = line.trim();
        let block = if trimmed.starts_with("```") {
            code = Some(Vec::new());
            None
        } else if trimmed.is_empty() {
            Some(Block::Blank)
        } else if is_rule(trimmed) {
            Some(Block::Rule)
        } else if let Some((level, rest)) = heading(trimmed) {
            Some(Block::Heading {
                level,
                content: parse_inline(rest),
            })
        } else if let Some(rest) = bullet(trimmed) {
            Some(Block::Bullet(parse_inline(rest)))
        } else if let Some((number, rest)) = numbered(trimmed) {
            Some(Block::Numbered {
                number,
                content: parse_inline(rest),
            })
        } else {
            paragraph.push(parse_inline(trimmed));
            continue;
        };

        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(std::mem::take(&mut paragraph)));
        }
        match block {
            Some(Block::Blank) if matches!(blocks.last(), Some(Block::Blank) | None) => {}
            Some(block) => blocks.push(block),
            None => {}
        }
    }

    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(paragraph));
    }
    // An unterminated fence runs to the end of the reply.
    if let Some(lines) = code {
        blocks.push(Block::Code(lines));
    }
    while matches!(blocks.last(), Some(Block::Blank)) {
        blocks.pop();
    }
    blocks
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|&marker| compact.chars().all(|c| c == marker))
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level as u8, ""));
    }
    rest.strip_prefix(' ')
        .map(|rest| (level as u8, rest.trim().trim_end_matches('#').trim_end()))
}

fn bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim_start)
}

fn numbered(line: &str) -> Option<(u64, &str)> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = line[digits..]
        .strip_prefix(". ")
        .or_else(|| line[digits..].strip_prefix(") "))?;
    let number = line[..digits].parse().ok()?;
    Some((number, rest.trim_start()))
}

/// Parses inline markup.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let chars: Vec<char> = text.chars().collect();
    parse_span(&chars)
}

fn parse_span(chars: &[char]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' && chars.get(i + 1).is_some_and(|n| n.is_ascii_punctuation()) {
            buf.push(chars[i + 1]);
            i += 2;
            continue;
        }

        if c == '`'
            && let Some(end) = find(chars, i + 1, &['`'])
        {
            flush(&mut buf, &mut out);
            out.push(Inline::Code(chars[i + 1..end].iter().collect()));
            i = end + 1;
            continue;
        }

        if (c == '*' || c == '_') && chars.get(i + 1) == Some(&c) && opens(chars, i, c) {
            if let Some(end) = find(chars, i + 2, &[c, c])
                && end > i + 2
            {
                flush(&mut buf, &mut out);
                out.push(Inline::Strong(parse_span(&chars[i + 2..end])));
                i = end + 2;
                continue;
            }
        }

        if (c == '*' || c == '_')
            && opens(chars, i, c)
            && let Some(end) = find_single(chars, i + 1, c)
        {
            flush(&mut buf, &mut out);
            out.push(Inline::Emphasis(parse_span(&chars[i + 1..end])));
            i = end + 1;
            continue;
        }

        if c == '['
            && let Some(close) = find(chars, i + 1, &[']'])
            && chars.get(close + 1) == Some(&'(')
            && let Some(paren) = find(chars, close + 2, &[')'])
        {
            flush(&mut buf, &mut out);
            out.push(Inline::Link {
                label: parse_span(&chars[i + 1..close]),
                url: chars[close + 2..paren].iter().collect(),
            });
            i = paren + 1;
            continue;
        }

        buf.push(c);
        i += 1;
    }

    flush(&mut buf, &mut out);
    out
}

fn flush(buf: &mut String, out: &mut Vec<Inline>) {
    if !buf.is_empty() {
        out.push(Inline::Text(std::mem::take(buf)));
    }
}

// An opening delimiter must be followed by non-space, and `_` must not sit
// inside a word (snake_case stays literal).
fn opens(chars: &[char], at: usize, marker: char) -> bool {
    let width = if chars.get(at + 1) == Some(&marker) { 2 } else { 1 };
    let next_ok = chars.get(at + width).is_some_and(|n| !n.is_whitespace());
    let prev_ok = marker != '_' || at == 0 || !chars[at - 1].is_alphanumeric();
    next_ok && prev_ok
}

fn find(chars: &[char], from: usize, pattern: &[char]) -> Option<usize> {
    if pattern.is_empty() || from >= chars.len() {
        return None;
    }
    (from..=chars.len().saturating_sub(pattern.len())).find(|&j| chars[j..].starts_with(pattern))
}

fn find_single(chars: &[char], from: usize, marker: char) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        if chars[j] == marker {
            if chars.get(j + 1) == Some(&marker) {
                // Skip a nested strong run entirely.
                j = find(chars, j + 2, &[marker, marker]).map(|end| end + 2)?;
                continue;
            }
            let closes = j > from
                && !chars[j - 1].is_whitespace()
                && (marker != '_' || chars.get(j + 1).is_none_or(|n| !n.is_alphanumeric()));
            if closes {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

/// Formats markdown text for a terminal.
pub fn format_markdown(text: &str, use_color: bool) -> String {
    let blocks = parse(text);
    let mut lines: Vec<String> = Vec::new();
    for block in &blocks {
        match block {
            Block::Heading { level, content } => {
                let body = render_inline(content, use_color, &mut Vec::new());
                if use_color {
                    let style = if *level <= 2 {
                        format!("{ANSI_BOLD}{ANSI_UNDERLINE}")
                    } else {
                        ANSI_BOLD.to_string()
                    };
                    lines.push(format!("{style}{body}{ANSI_RESET}"));
                } else {
                    lines.push(body.clone());
                    if *level <= 2 {
                        let marker = if *level == 1 { "=" } else { "-" };
                        lines.push(marker.repeat(body.chars().count().max(3)));
                    }
                }
            }
            Block::Paragraph(paragraph) => {
                for line in paragraph {
                    lines.push(render_inline(line, use_color, &mut Vec::new()));
                }
            }
            Block::Bullet(content) => {
                let marker = if use_color { "•" } else { "-" };
                let body = render_inline(content, use_color, &mut Vec::new());
                lines.push(format!("  {marker} {body}"));
            }
            Block::Numbered { number, content } => {
                let body = render_inline(content, use_color, &mut Vec::new());
                lines.push(format!("  {number}. {body}"));
            }
            Block::Code(code) => {
                for line in code {
                    if use_color {
                        lines.push(format!("    {ANSI_CYAN}{line}{ANSI_RESET}"));
                    } else {
                        lines.push(format!("    {line}"));
                    }
                }
            }
            Block::Rule => {
                if use_color {
                    lines.push(format!("{ANSI_DIM}{}{ANSI_RESET}", "─".repeat(40)));
                } else {
                    lines.push("-".repeat(40));
                }
            }
            Block::Blank => lines.push(String::new()),
        }
    }
    lines.join("\n")
}

// `active` is the stack of styles currently open, so a nested reset can
// restore the outer styles.
fn render_inline(spans: &[Inline], use_color: bool, active: &mut Vec<&'static str>) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Inline::Text(text) => out.push_str(text),
            Inline::Strong(inner) => styled(&mut out, inner, ANSI_BOLD, use_color, active),
            Inline::Emphasis(inner) => styled(&mut out, inner, ANSI_ITALIC, use_color, active),
            Inline::Code(code) => {
                if use_color {
                    out.push_str(ANSI_CYAN);
                    out.push_str(code);
                    out.push_str(ANSI_RESET);
                    active.iter().for_each(|s| out.push_str(s));
                } else {
                    out.push_str(code);
                }
            }
            Inline::Link { label, url } => {
                let label = render_inline(label, use_color, active);
                if label.is_empty() || label == *url {
                    out.push_str(url);
                } else {
                    out.push_str(&format!("{label} ({url})"));
                }
            }
        }
    }
    out
}

fn styled(
    out: &mut String,
    inner: &[Inline],
    style: &'static str,
    use_color: bool,
    active: &mut Vec<&'static str>,
) {
    if !use_color {
        out.push_str(&render_inline(inner, false, active));
        return;
    }
    out.push_str(style);
    active.push(style);
    out.push_str(&render_inline(inner, true, active));
    active.pop();
    out.push_str(ANSI_RESET);
    active.iter().for_each(|s| out.push_str(s));
}
