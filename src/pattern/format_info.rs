//! Width and justification modifiers (`%-20.30logger`)

/// Parsed `[-]min[.[-]max]` modifier
///
/// Padding goes on the left unless the modifier starts with `-`. Truncation
/// removes characters from the start unless the max part starts with `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub min: usize,
    pub max: usize,
    pub left_pad: bool,
    pub left_truncate: bool,
}

impl Default for FormatInfo {
    fn default() -> Self {
        Self {
            min: 0,
            max: usize::MAX,
            left_pad: true,
            left_truncate: true,
        }
    }
}

impl FormatInfo {
    /// Parse the modifier text between `%` and the keyword
    ///
    /// Returns `None` when the text is not a valid modifier.
    pub fn parse(text: &str) -> Option<Self> {
        let mut info = FormatInfo::default();
        let (min_part, max_part) = match text.split_once('.') {
            Some((min, max)) => (min, Some(max)),
            None => (text, None),
        };

        let min_digits = match min_part.strip_prefix('-') {
            Some(rest) => {
                info.left_pad = false;
                rest
            }
            None => min_part,
        };
        if !min_digits.is_empty() {
            info.min = min_digits.parse().ok()?;
        }

        if let Some(max_part) = max_part {
            let max_digits = match max_part.strip_prefix('-') {
                Some(rest) => {
                    info.left_truncate = false;
                    rest
                }
                None => max_part,
            };
            info.max = max_digits.parse().ok()?;
        }
        Some(info)
    }

    /// Append `value` to `out` with this modifier applied
    pub fn apply(&self, value: &str, out: &mut String) {
        let len = value.chars().count();

        if len > self.max {
            if self.left_truncate {
                let skip = len - self.max;
                out.extend(value.chars().skip(skip));
            } else {
                out.extend(value.chars().take(self.max));
            }
            return;
        }

        if len >= self.min {
            out.push_str(value);
            return;
        }

        let padding = self.min - len;
        if self.left_pad {
            out.extend(std::iter::repeat(' ').take(padding));
            out.push_str(value);
        } else {
            out.push_str(value);
            out.extend(std::iter::repeat(' ').take(padding));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(modifier: &str, value: &str) -> String {
        let mut out = String::new();
        FormatInfo::parse(modifier).unwrap().apply(value, &mut out);
        out
    }

    #[test]
    fn test_parse() {
        let info = FormatInfo::parse("-5").unwrap();
        assert_eq!(info.min, 5);
        assert!(!info.left_pad);

        let info = FormatInfo::parse("10.-20").unwrap();
        assert_eq!((info.min, info.max), (10, 20));
        assert!(info.left_pad);
        assert!(!info.left_truncate);

        let info = FormatInfo::parse(".3").unwrap();
        assert_eq!((info.min, info.max), (0, 3));

        assert!(FormatInfo::parse("5.").is_none());
        assert!(FormatInfo::parse("x").is_none());
    }

    #[test]
    fn test_padding() {
        assert_eq!(render("-5", "INFO"), "INFO ");
        assert_eq!(render("5", "INFO"), " INFO");
        assert_eq!(render("2", "INFO"), "INFO");
    }

    #[test]
    fn test_truncation() {
        assert_eq!(render(".3", "abcdef"), "def");
        assert_eq!(render(".-3", "abcdef"), "abc");
        assert_eq!(render("-8.10", "short"), "short   ");
    }
}
