use engagedb_core::Metric;

use crate::error::FormulaError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Metric(Metric),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl TokenKind {
    pub(crate) fn describe(self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Metric(m) => format!("metric '{m}'"),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Split formula text into tokens.
///
/// Identifiers are read greedily as `[A-Za-z_][A-Za-z0-9_]*` and must match a
/// metric name exactly, so `followers` or `dislike` are rejected rather than
/// partially matched.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, FormulaError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        let start = pos;

        let kind = match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'0'..=b'9' | b'.' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                    pos += 1;
                }
                let literal = &src[start..pos];
                let value = parse_number(literal).ok_or_else(|| FormulaError::InvalidNumber {
                    literal: literal.to_string(),
                    offset: start,
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset: start,
                });
                continue;
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let name = &src[start..pos];
                let metric =
                    Metric::from_name(name).ok_or_else(|| FormulaError::UnknownIdentifier {
                        name: name.to_string(),
                        offset: start,
                    })?;
                tokens.push(Token {
                    kind: TokenKind::Metric(metric),
                    offset: start,
                });
                continue;
            }
            _ => {
                let ch = src[start..].chars().next().unwrap_or('\u{fffd}');
                return Err(FormulaError::UnexpectedChar { ch, offset: start });
            }
        };

        tokens.push(Token {
            kind,
            offset: start,
        });
        pos += 1;
    }

    Ok(tokens)
}

/// Plain decimal literal: digits with at most one `.` and at least one digit.
fn parse_number(literal: &str) -> Option<f64> {
    let dots = literal.bytes().filter(|b| *b == b'.').count();
    let has_digit = literal.bytes().any(|b| b.is_ascii_digit());
    if dots > 1 || !has_digit {
        return None;
    }
    literal.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_default_formula() {
        assert_eq!(
            kinds("(like + comment) / view * 100"),
            vec![
                TokenKind::LParen,
                TokenKind::Metric(Metric::Like),
                TokenKind::Plus,
                TokenKind::Metric(Metric::Comment),
                TokenKind::RParen,
                TokenKind::Slash,
                TokenKind::Metric(Metric::View),
                TokenKind::Star,
                TokenKind::Number(100.0),
            ]
        );
    }

    #[test]
    fn identifiers_are_matched_whole() {
        let err = tokenize("followers * 2").unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownIdentifier {
                name: "followers".to_string(),
                offset: 0
            }
        );

        let err = tokenize("like + dislike").unwrap_err();
        assert!(matches!(err, FormulaError::UnknownIdentifier { ref name, offset: 7 } if name == "dislike"));
    }

    #[test]
    fn decimals_and_leading_dot_are_numbers() {
        assert_eq!(kinds("0.5 .25"), vec![TokenKind::Number(0.5), TokenKind::Number(0.25)]);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(matches!(
            tokenize("1.2.3").unwrap_err(),
            FormulaError::InvalidNumber { ref literal, offset: 0 } if literal == "1.2.3"
        ));
        assert!(matches!(
            tokenize("like + .").unwrap_err(),
            FormulaError::InvalidNumber { offset: 7, .. }
        ));
    }

    #[test]
    fn code_like_input_is_rejected() {
        assert_eq!(
            tokenize("like; process").unwrap_err(),
            FormulaError::UnexpectedChar { ch: ';', offset: 4 }
        );
        assert!(matches!(
            tokenize("like = 1").unwrap_err(),
            FormulaError::UnexpectedChar { ch: '=', offset: 5 }
        ));
    }
}
