//! Pattern string parser
//!
//! Turns `%d{HH:mm:ss} [%thread] %-5level %logger{36} - %msg%n` into a flat
//! list of literal and directive nodes.

use super::format_info::FormatInfo;
use super::tokenizer::tokenize_options;
use crate::core::{LoggerError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Literal(String),
    Directive {
        keyword: String,
        format: Option<FormatInfo>,
        options: Vec<String>,
    },
}

impl Node {
    fn directive(keyword: &str, format: Option<FormatInfo>, options: Vec<String>) -> Self {
        Node::Directive {
            keyword: keyword.to_string(),
            format,
            options,
        }
    }
}

/// Parse a whole pattern
pub fn parse_pattern(pattern: &str) -> Result<Vec<Node>> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut nodes = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1) {
                    Some('%') => literal.push('%'),
                    Some('\\') => literal.push('\\'),
                    Some('n') => literal.push('\n'),
                    Some('t') => literal.push('\t'),
                    Some(&other) => {
                        literal.push('\\');
                        literal.push(other);
                    }
                    None => literal.push('\\'),
                }
                i += 2;
            }
            '%' => {
                if !literal.is_empty() {
                    nodes.push(Node::Literal(std::mem::take(&mut literal)));
                }
                let (node, next) = parse_directive(pattern, &chars, i + 1)?;
                nodes.push(node);
                i = next;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        nodes.push(Node::Literal(literal));
    }
    Ok(nodes)
}

fn parse_directive(pattern: &str, chars: &[char], start: usize) -> Result<(Node, usize)> {
    let mut i = start;

    while i < chars.len() && (chars[i] == '-' || chars[i] == '.' || chars[i].is_ascii_digit()) {
        i += 1;
    }
    let modifier: String = chars[start..i].iter().collect();
    let format = if modifier.is_empty() {
        None
    } else {
        Some(FormatInfo::parse(&modifier).ok_or_else(|| {
            LoggerError::pattern(pattern, start, format!("invalid format modifier '{}'", modifier))
        })?)
    };

    let keyword_start = i;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    if i == keyword_start {
        return Err(LoggerError::pattern(
            pattern,
            keyword_start,
            "expected a conversion keyword after '%'",
        ));
    }
    let keyword: String = chars[keyword_start..i].iter().collect();

    if chars.get(i) != Some(&'{') {
        return Ok((Node::directive(&keyword, format, Vec::new()), i));
    }

    let block_start = i + 1;
    let block_end = find_block_end(chars, block_start)
        .ok_or_else(|| LoggerError::pattern(pattern, i, "unterminated option block"))?;
    let block: String = chars[block_start..block_end].iter().collect();
    let options = tokenize_options(&block)?;
    Ok((Node::directive(&keyword, format, options), block_end + 1))
}

/// Index of the `}` closing a block that starts at `from`, skipping quotes
fn find_block_end(chars: &[char], from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut i = from;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == '\\' {
                    i += 1;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '}' => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(node: &Node) -> &str {
        match node {
            Node::Directive { keyword, .. } => keyword,
            Node::Literal(_) => panic!("expected a directive, got {:?}", node),
        }
    }

    #[test]
    fn test_literal_and_directives() {
        let nodes = parse_pattern("%d{HH:mm:ss} [%thread] %-5level %logger{36} - %msg%n").unwrap();
        let keywords: Vec<&str> = nodes
            .iter()
            .filter(|n| matches!(n, Node::Directive { .. }))
            .map(keyword)
            .collect();
        assert_eq!(keywords, vec!["d", "thread", "level", "logger", "msg", "n"]);
        assert_eq!(nodes[1], Node::Literal(" [".to_string()));
    }

    #[test]
    fn test_format_modifier_and_options() {
        let nodes = parse_pattern("%-20.30logger{36}").unwrap();
        match &nodes[0] {
            Node::Directive { keyword, format, options } => {
                assert_eq!(keyword, "logger");
                let format = format.unwrap();
                assert_eq!((format.min, format.max), (20, 30));
                assert!(!format.left_pad);
                assert_eq!(options, &vec!["36".to_string()]);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_escapes() {
        let nodes = parse_pattern(r"100\% \\ done").unwrap();
        assert_eq!(nodes, vec![Node::Literal(r"100% \ done".to_string())]);
    }

    #[test]
    fn test_quoted_brace_inside_options() {
        let nodes = parse_pattern("%d{'}', UTC}x").unwrap();
        match &nodes[0] {
            Node::Directive { options, .. } => assert_eq!(options, &vec!["}".to_string(), "UTC".to_string()]),
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(nodes[1], Node::Literal("x".to_string()));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_pattern("%d{HH").unwrap_err(),
            LoggerError::PatternSyntax { .. }
        ));
        assert!(matches!(
            parse_pattern("abc %").unwrap_err(),
            LoggerError::PatternSyntax { position: 5, .. }
        ));
        assert!(parse_pattern("%5.level").is_err());
    }
}
