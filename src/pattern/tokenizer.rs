//! Option block tokenizer
//!
//! Splits the text between `{` and `}` of a directive into options. Options
//! are separated by commas and trimmed. A `'` or `"` quote keeps commas and
//! surrounding blanks verbatim; inside quotes a backslash escapes the quote
//! character, a comma or another backslash.

use crate::core::{LoggerError, Result};

enum State {
    Expecting,
    Collecting,
    Quoted(char),
}

/// Tokenize one option block (without its braces)
///
/// ```
/// use hierlog::pattern::tokenize_options;
///
/// let options = tokenize_options(r#"HH:mm:ss, 'UTC', "a, b""#).unwrap();
/// assert_eq!(options, vec!["HH:mm:ss", "UTC", "a, b"]);
/// ```
pub fn tokenize_options(block: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // length of `current` that came from quotes and must survive trimming
    let mut quoted_end = 0;
    let mut state = State::Expecting;
    let mut chars = block.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Expecting => match c {
                ' ' | '\t' | '\r' | '\n' | ',' => {}
                '\'' | '"' => state = State::Quoted(c),
                _ => {
                    current.push(c);
                    state = State::Collecting;
                }
            },
            State::Collecting => match c {
                ',' => {
                    tokens.push(finish(&mut current, quoted_end));
                    quoted_end = 0;
                    state = State::Expecting;
                }
                '\'' | '"' => state = State::Quoted(c),
                _ => current.push(c),
            },
            State::Quoted(quote) => {
                if c == quote {
                    quoted_end = current.len();
                    state = State::Collecting;
                } else if c == '\\' {
                    match chars.next() {
                        Some(next) if next == quote || next == '\\' || next == ',' => current.push(next),
                        Some(next) => {
                            current.push('\\');
                            current.push(next);
                        }
                        None => current.push('\\'),
                    }
                } else {
                    current.push(c);
                }
            }
        }
    }

    match state {
        State::Expecting => {}
        State::Collecting => tokens.push(finish(&mut current, quoted_end)),
        State::Quoted(_) => {
            return Err(LoggerError::pattern(block, block.len(), "unterminated quoted option"));
        }
    }
    Ok(tokens)
}

fn finish(current: &mut String, quoted_end: usize) -> String {
    let token = std::mem::take(current);
    // trailing blanks after the last quote are dropped, quoted blanks are kept
    let trimmed_tail = token[quoted_end..].trim_end().len() + quoted_end;
    token[..trimmed_tail].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_options_are_trimmed() {
        assert_eq!(
            tokenize_options(" a , b=c,  d ").unwrap(),
            vec!["a", "b=c", "d"]
        );
    }

    #[test]
    fn test_empty_block() {
        assert!(tokenize_options("").unwrap().is_empty());
        assert!(tokenize_options("   ").unwrap().is_empty());
    }

    #[test]
    fn test_quoted_options_keep_commas_and_spaces() {
        assert_eq!(tokenize_options("' x, y '").unwrap(), vec![" x, y "]);
        assert_eq!(tokenize_options(r#""a\"b", c"#).unwrap(), vec!["a\"b", "c"]);
        assert_eq!(tokenize_options(r"'a\,b'").unwrap(), vec!["a,b"]);
    }

    #[test]
    fn test_quoted_value_after_key() {
        assert_eq!(
            tokenize_options(r#"APPNAME="my, app", MESSAGEID=x"#).unwrap(),
            vec!["APPNAME=my, app", "MESSAGEID=x"]
        );
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        assert!(tokenize_options("'open").is_err());
    }
}
