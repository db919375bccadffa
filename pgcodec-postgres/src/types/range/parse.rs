//! Range and multirange text grammars.
//!
//! ```text
//! empty
//! [1,10)
//! (,"2024-01-01 00:00:00")
//! {[1,3), [5,7]}
//! ```
//!
//! A missing bound is unbounded. Bounds may be double-quoted, with `""` or `\` escaping a
//! quote inside; outside quotes `\` escapes the next character.
use std::iter::Peekable;
use std::str::CharIndices;

use pgcodec_core::error::{BoxDynError, Error};

use crate::host::BoundType;

/// The parts of a range literal, before its bounds are decoded.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RangeText {
    pub(crate) lower_type: BoundType,
    pub(crate) upper_type: BoundType,
    pub(crate) lower: Option<String>,
    pub(crate) upper: Option<String>,
}

impl RangeText {
    fn empty() -> Self {
        RangeText {
            lower_type: BoundType::Empty,
            upper_type: BoundType::Empty,
            lower: None,
            upper: None,
        }
    }
}

fn malformed(src: &str, msg: &str) -> BoxDynError {
    Error::protocol(format!("malformed range literal {src:?}: {msg}")).into()
}

pub(crate) fn parse_range(src: &str) -> Result<RangeText, BoxDynError> {
    let trimmed = src.trim_matches(|c: char| c.is_ascii_whitespace());

    if trimmed.eq_ignore_ascii_case("empty") {
        return Ok(RangeText::empty());
    }

    let mut chars = trimmed.char_indices().peekable();

    let lower_inclusive = match chars.next() {
        Some((_, '[')) => true,
        Some((_, '(')) => false,
        _ => return Err(malformed(src, "missing left parenthesis or bracket")),
    };

    let (lower, delimiter) = read_bound(src, &mut chars, &[','])?;
    if delimiter != ',' {
        return Err(malformed(src, "missing comma after lower bound"));
    }

    let (upper, close) = read_bound(src, &mut chars, &[')', ']'])?;
    let upper_inclusive = close == ']';

    if chars.next().is_some() {
        return Err(malformed(src, "junk after right parenthesis or bracket"));
    }

    let bound_type = |bound: &Option<String>, inclusive: bool| match (bound, inclusive) {
        (None, _) => BoundType::Unbounded,
        (Some(_), true) => BoundType::Inclusive,
        (Some(_), false) => BoundType::Exclusive,
    };

    Ok(RangeText {
        lower_type: bound_type(&lower, lower_inclusive),
        upper_type: bound_type(&upper, upper_inclusive),
        lower,
        upper,
    })
}

/// Read one bound up to (and consuming) one of `terminators`, returning the bound (`None` when
/// absent) and the terminator found.
fn read_bound(
    src: &str,
    chars: &mut Peekable<CharIndices<'_>>,
    terminators: &[char],
) -> Result<(Option<String>, char), BoxDynError> {
    let mut bound = String::new();
    let mut present = false;
    let mut in_quotes = false;

    loop {
        let (_, c) = chars
            .next()
            .ok_or_else(|| malformed(src, "unexpected end of input"))?;

        match c {
            '"' if in_quotes && chars.next_if(|(_, next)| *next == '"').is_some() => {
                bound.push('"');
            }
            '"' => {
                in_quotes = !in_quotes;
                present = true;
            }
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or_else(|| malformed(src, "unexpected end of input"))?;

                bound.push(escaped);
                present = true;
            }
            c if !in_quotes && terminators.contains(&c) => {
                return Ok((present.then_some(bound), c));
            }
            c if !in_quotes && matches!(c, '(' | ')' | '[' | ']' | ',') => {
                return Err(malformed(src, &format!("unexpected {c:?}")));
            }
            c => {
                bound.push(c);
                present = true;
            }
        }
    }
}

/// Append one bound, quoting it when the range grammar requires.
pub(crate) fn write_bound(bound: &str, out: &mut String) {
    let needs_quotes = bound.is_empty()
        || bound.chars().any(|c| {
            matches!(c, '"' | '\\' | '(' | ')' | '[' | ']' | ',') || c.is_ascii_whitespace()
        });

    if !needs_quotes {
        out.push_str(bound);
        return;
    }

    out.push('"');
    for c in bound.chars() {
        if c == '"' || c == '\\' {
            out.push(c);
        }
        out.push(c);
    }
    out.push('"');
}

/// Split `{r1, r2}` into the range literals it contains.
pub(crate) fn split_multirange(src: &str) -> Result<Vec<&str>, BoxDynError> {
    let malformed = |msg: &str| -> BoxDynError {
        Error::protocol(format!("malformed multirange literal {src:?}: {msg}")).into()
    };

    let body = src
        .trim_matches(|c: char| c.is_ascii_whitespace())
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| malformed("missing braces"))?;

    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_range = false;
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' if in_range => in_quotes = !in_quotes,
            '[' | '(' if !in_quotes && !in_range => in_range = true,
            ']' | ')' if !in_quotes && in_range => in_range = false,
            ',' if !in_quotes && !in_range => {
                ranges.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes || in_range {
        return Err(malformed("unterminated range"));
    }

    ranges.push(body[start..].trim());

    if ranges.iter().any(|r| r.is_empty()) {
        return Err(malformed("empty range literal"));
    }

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(
        lower_type: BoundType,
        lower: Option<&str>,
        upper_type: BoundType,
        upper: Option<&str>,
    ) -> RangeText {
        RangeText {
            lower_type,
            upper_type,
            lower: lower.map(str::to_owned),
            upper: upper.map(str::to_owned),
        }
    }

    #[test]
    fn it_parses_bounds() {
        use BoundType::*;

        assert_eq!(
            parse_range("[1,10)").unwrap(),
            range(Inclusive, Some("1"), Exclusive, Some("10"))
        );
        assert_eq!(
            parse_range("(,5]").unwrap(),
            range(Unbounded, None, Inclusive, Some("5"))
        );
        assert_eq!(
            parse_range("(,)").unwrap(),
            range(Unbounded, None, Unbounded, None)
        );
        assert_eq!(
            parse_range(r#"["2024-01-01 00:00:00","a""b\c")"#).unwrap(),
            range(
                Inclusive,
                Some("2024-01-01 00:00:00"),
                Exclusive,
                Some(r#"a"bc"#)
            )
        );
        assert_eq!(parse_range(" EMPTY ").unwrap(), RangeText::empty());
    }

    #[test]
    fn it_rejects_malformed_ranges() {
        for src in ["", "1,2", "[1,2", "[1;2]", "[1,2] x", "[1,2,3]", r#"["1,2]"#] {
            assert!(parse_range(src).is_err(), "{src}");
        }
    }

    #[test]
    fn it_quotes_bounds() {
        let mut out = String::new();

        for bound in ["7", "", "a b", "x,y", r#"q"x"#] {
            write_bound(bound, &mut out);
            out.push('|');
        }

        assert_eq!(out, r#"7|""|"a b"|"x,y"|"q""x"|"#);
    }

    #[test]
    fn it_splits_multiranges() {
        assert_eq!(
            split_multirange("{[1,3), (5,7], empty}").unwrap(),
            ["[1,3)", "(5,7]", "empty"]
        );
        assert_eq!(
            split_multirange(r#"{["a,b","c)d"]}"#).unwrap(),
            [r#"["a,b","c)d"]"#]
        );
        assert!(split_multirange("{}").unwrap().is_empty());
        assert!(split_multirange("{[1,3),}").is_err());
        assert!(split_multirange("[1,3)").is_err());
    }
}
