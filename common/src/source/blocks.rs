//! Indentation and compound-statement checks over logical lines.

use super::SyntaxError;
use super::scanner::LogicalLine;

const COMPOUND_KEYWORDS: &[&str] = &[
    "def", "class", "if", "elif", "else", "for", "while", "with", "try", "except", "finally",
];

/// Keywords that only open a block when used as a statement header.
const SOFT_KEYWORDS: &[&str] = &["match", "case"];

pub(super) fn check_blocks(lines: &[LogicalLine]) -> Result<(), SyntaxError> {
    let mut stack = vec![0_usize];
    let mut open_block: Option<(&'static str, usize)> = None;

    for line in lines {
        let top = stack.last().copied().unwrap_or(0);
        if let Some((keyword, header_line)) = open_block.take() {
            if line.indent() <= top {
                return Err(missing_block(keyword, header_line, line.line()));
            }
            stack.push(line.indent());
        } else if line.indent() > top {
            return Err(SyntaxError::new("unexpected indent", line.line()));
        } else if line.indent() < top {
            while stack.last().is_some_and(|&level| level > line.indent()) {
                stack.pop();
            }
            if stack.last().copied() != Some(line.indent()) {
                return Err(SyntaxError::new(
                    "unindent does not match any outer indentation level",
                    line.line(),
                ));
            }
        }

        let header = if let Some(keyword) = compound_keyword(line.text()) {
            check_header_shape(keyword, line)?;
            let colon = top_level_colon(line.text())
                .ok_or_else(|| SyntaxError::new("expected ':'", line.line()))?;
            Some((keyword, colon))
        } else {
            soft_keyword_header(line.text())
        };
        let opens_block = |&(_, colon): &(&str, usize)| line.text()[colon + 1..].trim().is_empty();
        if let Some((keyword, _)) = header.filter(opens_block) {
            open_block = Some((keyword, line.line()));
        }
    }

    match (open_block, lines.last()) {
        (Some((keyword, header_line)), Some(last)) => {
            Err(missing_block(keyword, header_line, last.line() + 1))
        }
        _ => Ok(()),
    }
}

fn missing_block(keyword: &str, header_line: usize, line: usize) -> SyntaxError {
    SyntaxError::new(
        format!("expected an indented block after '{keyword}' statement on line {header_line}"),
        line,
    )
}

fn compound_keyword(text: &str) -> Option<&'static str> {
    let text = text.strip_prefix("async ").map_or(text, str::trim_start);
    let word: &str = text
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .next()
        .unwrap_or_default();
    COMPOUND_KEYWORDS.iter().copied().find(|&keyword| keyword == word)
}

/// Recognises `match subject:` and `case pattern:` headers.
///
/// Both words stay ordinary names unless a subject follows them and the
/// line has a top-level `:`, so `match = re.match(p, s)` and `match: int`
/// are plain statements.
fn soft_keyword_header(text: &str) -> Option<(&'static str, usize)> {
    let keyword = SOFT_KEYWORDS
        .iter()
        .copied()
        .find(|&keyword| starts_word(text, 0, keyword))?;
    let colon = top_level_colon(text)?;
    let subject = text.get(keyword.len()..colon)?.trim();
    let names_the_word = subject.is_empty() || subject.starts_with(['=', '.', ',', ')', ']', '}']);
    (!names_the_word).then_some((keyword, colon))
}

fn check_header_shape(keyword: &str, line: &LogicalLine) -> Result<(), SyntaxError> {
    if !matches!(keyword, "def" | "class") {
        return Ok(());
    }
    let text = line.text().strip_prefix("async ").unwrap_or(line.text());
    let rest = text.get(keyword.len()..).unwrap_or_default().trim_start();
    let name_len = rest
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .unwrap_or(rest.len());
    let after_name = rest.get(name_len..).unwrap_or_default().trim_start();
    let valid = name_len > 0
        && !rest.starts_with(|ch: char| ch.is_ascii_digit())
        && match keyword {
            "def" => after_name.starts_with('('),
            _ => after_name.starts_with('(') || after_name.starts_with(':'),
        };
    if valid {
        Ok(())
    } else {
        Err(SyntaxError::new("invalid syntax", line.line()))
    }
}

/// Byte offset of the first `:` outside any brackets, ignoring `lambda`
/// parameter lists and walrus operators.
pub(super) fn top_level_colon(text: &str) -> Option<usize> {
    let mut depth = 0_usize;
    let mut pending_lambdas = 0_usize;
    let bytes = text.as_bytes();
    for (pos, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            'l' if depth == 0 && starts_word(text, pos, "lambda") => pending_lambdas += 1,
            ':' if depth == 0 => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    continue;
                }
                if pending_lambdas > 0 {
                    pending_lambdas -= 1;
                    continue;
                }
                return Some(pos);
            }
            _ => {}
        }
    }
    None
}

fn starts_word(text: &str, pos: usize, word: &str) -> bool {
    let is_ident = |ch: char| ch.is_alphanumeric() || ch == '_';
    let before_ok = text
        .get(..pos)
        .and_then(|head| head.chars().last())
        .is_none_or(|ch| !is_ident(ch));
    let after_ok = text
        .get(pos..)
        .and_then(|tail| tail.strip_prefix(word))
        .is_some_and(|tail| tail.chars().next().is_none_or(|ch| !is_ident(ch)));
    before_ok && after_ok
}
