//! Splits source text into logical lines.
//!
//! Comments are dropped, bracketed and backslash continuations are joined
//! with a single space, and string literals are masked: the quotes survive,
//! while the contents are kept only when they are plain dotted identifiers
//! (so forward-reference annotations such as `"Item"` stay readable). Every
//! other literal collapses to an empty string so its contents can never be
//! mistaken for code.

use super::SyntaxError;

/// One logical line of code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalLine {
    text: String,
    indent: usize,
    starts: Vec<(usize, usize)>,
}

impl LogicalLine {
    /// The masked code text, without leading indentation.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Indentation width of the first physical line (tabs stop every 8).
    #[must_use]
    pub const fn indent(&self) -> usize {
        self.indent
    }

    /// One-based physical line on which this logical line starts.
    #[must_use]
    pub fn line(&self) -> usize {
        self.starts.first().map_or(1, |&(_, line)| line)
    }

    /// Physical line containing the given byte offset into [`Self::text`].
    #[must_use]
    pub fn line_at(&self, offset: usize) -> usize {
        self.starts
            .iter()
            .take_while(|&&(start, _)| start <= offset)
            .last()
            .map_or_else(|| self.line(), |&(_, line)| line)
    }
}

const TAB_STOP: usize = 8;

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Cursor {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_to_newline(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.pos += 1;
        }
    }
}

struct Builder {
    text: String,
    indent: usize,
    starts: Vec<(usize, usize)>,
}

impl Builder {
    fn new(indent: usize, line: usize) -> Self {
        Self {
            text: String::new(),
            indent,
            starts: vec![(0, line)],
        }
    }

    fn continue_on(&mut self, line: usize) {
        if !self.text.ends_with(' ') {
            self.text.push(' ');
        }
        self.starts.push((self.text.len(), line));
    }

    fn finish(self) -> Option<LogicalLine> {
        let text = self.text.trim_end().to_owned();
        if text.is_empty() {
            return None;
        }
        Some(LogicalLine {
            text,
            indent: self.indent,
            starts: self.starts,
        })
    }
}

/// Scans `source` into logical lines.
///
/// # Errors
///
/// Returns a [`SyntaxError`] for unterminated strings, mismatched or unclosed
/// brackets, and stray characters after a line-continuation backslash.
pub fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, SyntaxError> {
    let normalised = source.replace("\r\n", "\n");
    let mut cursor = Cursor {
        chars: normalised.chars().collect(),
        pos: 0,
        line: 1,
    };
    let mut lines = Vec::new();
    let mut brackets: Vec<(char, usize)> = Vec::new();
    let mut current: Option<Builder> = None;

    loop {
        let mut builder = match current.take() {
            Some(builder) => builder,
            None => {
                let indent = measure_indent(&mut cursor);
                match cursor.peek() {
                    None => break,
                    Some('\n') => {
                        cursor.bump();
                        continue;
                    }
                    Some('#') => {
                        cursor.skip_to_newline();
                        continue;
                    }
                    Some(_) => Builder::new(indent, cursor.line),
                }
            }
        };
        let Some(ch) = cursor.peek() else {
            current = Some(builder);
            break;
        };

        match ch {
            '#' => cursor.skip_to_newline(),
            '\n' => {
                cursor.bump();
                if brackets.is_empty() {
                    lines.extend(builder.finish());
                    continue;
                }
                builder.continue_on(cursor.line);
                skip_blanks(&mut cursor);
            }
            '\\' => {
                let line = cursor.line;
                cursor.bump();
                if cursor.peek() != Some('\n') {
                    return Err(SyntaxError::new(
                        "unexpected character after line continuation character",
                        line,
                    ));
                }
                cursor.bump();
                builder.continue_on(cursor.line);
                skip_blanks(&mut cursor);
            }
            '\'' | '"' => read_string(&mut cursor, &mut builder.text)?,
            '(' | '[' | '{' => {
                brackets.push((ch, cursor.line));
                builder.text.push(ch);
                cursor.bump();
            }
            ')' | ']' | '}' => {
                close_bracket(&mut brackets, ch, cursor.line)?;
                builder.text.push(ch);
                cursor.bump();
            }
            _ => {
                builder.text.push(ch);
                cursor.bump();
            }
        }
        current = Some(builder);
    }

    if let Some(&(open, line)) = brackets.last() {
        return Err(SyntaxError::new(format!("'{open}' was never closed"), line));
    }
    if let Some(line) = current.and_then(Builder::finish) {
        lines.push(line);
    }
    Ok(lines)
}

fn measure_indent(cursor: &mut Cursor) -> usize {
    let mut width = 0;
    while let Some(ch) = cursor.peek() {
        match ch {
            ' ' => width += 1,
            '\t' => width = (width / TAB_STOP + 1) * TAB_STOP,
            '\u{c}' => width = 0,
            _ => break,
        }
        cursor.bump();
    }
    width
}

fn skip_blanks(cursor: &mut Cursor) {
    while matches!(cursor.peek(), Some(' ' | '\t' | '\u{c}')) {
        cursor.bump();
    }
}

fn close_bracket(
    brackets: &mut Vec<(char, usize)>,
    close: char,
    line: usize,
) -> Result<(), SyntaxError> {
    let expected_open = match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    };
    match brackets.pop() {
        Some((open, _)) if open == expected_open => Ok(()),
        Some((open, _)) => Err(SyntaxError::new(
            format!("closing parenthesis '{close}' does not match opening parenthesis '{open}'"),
            line,
        )),
        None => Err(SyntaxError::new(format!("unmatched '{close}'"), line)),
    }
}

fn read_string(cursor: &mut Cursor, text: &mut String) -> Result<(), SyntaxError> {
    let start_line = cursor.line;
    let Some(quote) = cursor.bump() else {
        return Ok(());
    };
    let triple = cursor.peek() == Some(quote) && cursor.peek_at(1) == Some(quote);
    if triple {
        cursor.bump();
        cursor.bump();
    }

    let mut contents = String::new();
    loop {
        let Some(ch) = cursor.bump() else {
            let message = if triple {
                "unterminated triple-quoted string literal"
            } else {
                "unterminated string literal"
            };
            return Err(SyntaxError::new(message, start_line));
        };
        match ch {
            '\\' => {
                cursor.bump();
                contents.push('\\');
            }
            '\n' if !triple => {
                return Err(SyntaxError::new("unterminated string literal", start_line));
            }
            c if c == quote => {
                if !triple {
                    break;
                }
                if cursor.peek() == Some(quote) && cursor.peek_at(1) == Some(quote) {
                    cursor.bump();
                    cursor.bump();
                    break;
                }
                contents.push(c);
            }
            c => contents.push(c),
        }
    }

    text.push(quote);
    if is_plain_reference(&contents) {
        text.push_str(&contents);
    }
    text.push(quote);
    Ok(())
}

fn is_plain_reference(contents: &str) -> bool {
    !contents.is_empty()
        && contents
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.')
}
