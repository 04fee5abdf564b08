//! Serialized list fields and ingredient text normalization.
//!
//! Recipe datasets store ingredient and direction lists as Python-style list
//! literals (`['1 cup flour', "2 eggs"]`). [`parse_list_literal`] reads that
//! form back into owned strings; [`format_list_literal`] writes a form it can
//! read.

/// Parse a list literal of quoted strings.
///
/// Accepts single- or double-quoted items, backslash escapes (`\n`, `\t`, `\r`,
/// `\\`, `\'`, `\"`, `\uXXXX`), surrounding whitespace, a trailing comma, and
/// `[]`. Anything else is an error describing the byte offset of the problem.
pub fn parse_list_literal(input: &str) -> Result<Vec<String>, String> {
    let mut parser = Parser {
        chars: input.char_indices().peekable(),
    };

    parser.skip_ws();
    parser.expect('[')?;

    let mut items = Vec::new();
    loop {
        parser.skip_ws();
        match parser.peek() {
            Some(']') => {
                parser.bump();
                break;
            }
            Some('\'') | Some('"') => {
                items.push(parser.string()?);
                parser.skip_ws();
                match parser.bump() {
                    Some((_, ',')) => continue,
                    Some((_, ']')) => break,
                    Some((pos, c)) => return Err(format!("expected ',' or ']' at {pos}, found {c:?}")),
                    None => return Err("unterminated list".into()),
                }
            }
            Some(c) => {
                return Err(format!(
                    "expected quoted string at {}, found {c:?}",
                    parser.offset()
                ))
            }
            None => return Err("unterminated list".into()),
        }
    }

    parser.skip_ws();
    if let Some((pos, c)) = parser.bump() {
        return Err(format!("unexpected {c:?} after list at {pos}"));
    }
    Ok(items)
}

/// Render items in a form [`parse_list_literal`] accepts.
pub fn format_list_literal<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    // A JSON array of strings is a valid double-quoted list literal.
    serde_json::to_string(&items).unwrap_or_else(|_| "[]".into())
}

/// Lowercase, turn commas into spaces, and collapse runs of whitespace.
pub fn preprocess_ingredients(ingredients: &str) -> String {
    ingredients
        .to_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|&(pos, _)| pos).unwrap_or(0)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        match self.bump() {
            Some((_, c)) if c == want => Ok(()),
            Some((pos, c)) => Err(format!("expected {want:?} at {pos}, found {c:?}")),
            None => Err(format!("expected {want:?}, found end of input")),
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let (start, quote) = self.bump().ok_or("expected string")?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some((_, c)) if c == quote => return Ok(out),
                Some((_, '\\')) => self.escape(&mut out)?,
                Some((_, c)) => out.push(c),
                None => return Err(format!("unterminated string starting at {start}")),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), String> {
        match self.bump() {
            Some((_, 'n')) => out.push('\n'),
            Some((_, 't')) => out.push('\t'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, '\\')) => out.push('\\'),
            Some((_, '\'')) => out.push('\''),
            Some((_, '"')) => out.push('"'),
            Some((_, '/')) => out.push('/'),
            Some((pos, 'u')) => {
                let hex: String = (0..4).filter_map(|_| self.bump().map(|(_, c)| c)).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| format!("bad \\u escape at {pos}"))?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            // Unknown escapes keep the backslash.
            Some((_, c)) => {
                out.push('\\');
                out.push(c);
            }
            None => return Err("dangling backslash".into()),
        }
        Ok(())
    }
}
