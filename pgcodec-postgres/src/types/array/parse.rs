//! The array text grammar.
//!
//! ```text
//! [1:2][0:1]={{a,"b c"},{NULL,"NULL"}}
//! ```
//!
//! An optional dimension decoration, then nested braces whose leaves are bare, double-quoted
//! (with `\` escapes) or the unquoted, case-insensitive `NULL`. Every sub-array at one level
//! must have the same length.
use std::iter::Peekable;
use std::str::Chars;

use pgcodec_core::error::{BoxDynError, Error};

use crate::host::ArrayDimension;

/// A parsed array literal: its dimensions and row-major elements, `None` for `NULL`.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ArrayText {
    pub(crate) dimensions: Vec<ArrayDimension>,
    pub(crate) elements: Vec<Option<String>>,
}

pub(crate) fn parse_array(src: &str, delimiter: char) -> Result<ArrayText, BoxDynError> {
    let mut parser = ArrayParser {
        src,
        chars: src.chars().peekable(),
        delimiter,
        lengths: Vec::new(),
        leaf_depth: None,
        elements: Vec::new(),
    };

    parser.skip_whitespace();
    let explicit = parser.parse_decoration()?;

    parser.skip_whitespace();
    parser.expect('{')?;
    parser.parse_level(0)?;

    parser.skip_whitespace();
    if parser.chars.peek().is_some() {
        return Err(parser.error("junk after closing right brace"));
    }

    let ArrayParser {
        lengths, elements, ..
    } = parser;

    // `{}` is the zero-dimensional empty array
    if elements.is_empty() {
        if explicit.is_some() {
            return Err(Error::protocol(format!(
                "malformed array literal {src:?}: dimensions given for an empty array"
            ))
            .into());
        }

        return Ok(ArrayText::default());
    }

    let mut dimensions = Vec::with_capacity(lengths.len());
    for len in lengths {
        dimensions.push(ArrayDimension::new(i32::try_from(len.unwrap_or(0))?));
    }

    if let Some(explicit) = explicit {
        let matches = explicit.len() == dimensions.len()
            && explicit
                .iter()
                .zip(&dimensions)
                .all(|(given, parsed)| given.length == parsed.length);

        if !matches {
            return Err(Error::protocol(format!(
                "malformed array literal {src:?}: dimensions do not match array contents"
            ))
            .into());
        }

        dimensions = explicit;
    }

    Ok(ArrayText {
        dimensions,
        elements,
    })
}

struct ArrayParser<'a> {
    src: &'a str,
    chars: Peekable<Chars<'a>>,
    delimiter: char,

    /// Length of every sub-array seen so far, per level.
    lengths: Vec<Option<usize>>,

    /// The level scalars live at; sub-arrays and scalars never share a level.
    leaf_depth: Option<usize>,
    elements: Vec<Option<String>>,
}

impl ArrayParser<'_> {
    fn error(&self, msg: &str) -> BoxDynError {
        Error::protocol(format!("malformed array literal {:?}: {msg}", self.src)).into()
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}
    }

    fn expect(&mut self, expected: char) -> Result<(), BoxDynError> {
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected {expected:?}"))),
        }
    }

    /// `[lower:upper]...=`, returning the dimensions it declares.
    fn parse_decoration(&mut self) -> Result<Option<Vec<ArrayDimension>>, BoxDynError> {
        if self.chars.peek() != Some(&'[') {
            return Ok(None);
        }

        let mut dimensions = Vec::new();

        while self.chars.next_if_eq(&'[').is_some() {
            let lower = self.parse_bound()?;
            self.expect(':')?;
            let upper = self.parse_bound()?;
            self.expect(']')?;

            let length = upper
                .checked_sub(lower)
                .and_then(|n| n.checked_add(1))
                .filter(|n| *n >= 0)
                .ok_or_else(|| self.error("upper bound cannot be less than lower bound"))?;

            dimensions.push(ArrayDimension {
                length,
                lower_bound: lower,
            });
        }

        self.skip_whitespace();
        self.expect('=')?;

        Ok(Some(dimensions))
    }

    fn parse_bound(&mut self) -> Result<i32, BoxDynError> {
        let mut digits = String::new();

        if let Some(sign) = self.chars.next_if(|c| *c == '-' || *c == '+') {
            digits.push(sign);
        }

        while let Some(c) = self.chars.next_if(char::is_ascii_digit) {
            digits.push(c);
        }

        digits
            .parse()
            .map_err(|_| self.error("invalid array dimension bound"))
    }

    /// Parse the contents of a sub-array whose `{` was consumed.
    fn parse_level(&mut self, depth: usize) -> Result<(), BoxDynError> {
        if self.lengths.len() <= depth {
            self.lengths.push(None);
        }

        let mut count = 0_usize;

        self.skip_whitespace();
        if self.chars.next_if_eq(&'}').is_none() {
            loop {
                self.skip_whitespace();

                if self.chars.next_if_eq(&'{').is_some() {
                    if self.leaf_depth.is_some_and(|leaf| leaf <= depth) {
                        return Err(self.error("unexpected '{' character"));
                    }

                    self.parse_level(depth + 1)?;
                } else {
                    if *self.leaf_depth.get_or_insert(depth) != depth {
                        return Err(self.error("multidimensional arrays must have sub-arrays with matching dimensions"));
                    }

                    let element = self.parse_element()?;
                    self.elements.push(element);
                }

                count += 1;
                self.skip_whitespace();

                match self.chars.next() {
                    Some(c) if c == self.delimiter => continue,
                    Some('}') => break,
                    _ => return Err(self.error("unexpected end of input")),
                }
            }
        }

        match self.lengths[depth] {
            None => self.lengths[depth] = Some(count),
            Some(len) if len == count => {}
            Some(_) => {
                return Err(self.error(
                    "multidimensional arrays must have sub-arrays with matching dimensions",
                ))
            }
        }

        Ok(())
    }

    fn parse_element(&mut self) -> Result<Option<String>, BoxDynError> {
        if self.chars.next_if_eq(&'"').is_some() {
            return self.parse_quoted().map(Some);
        }

        let mut value = String::new();
        let mut escaped = false;
        // whitespace is kept only between other characters
        let mut pending_space = String::new();

        loop {
            match self.chars.peek().copied() {
                None => return Err(self.error("unexpected end of input")),
                Some(c) if c == self.delimiter || c == '}' => break,
                Some('{' | '"') => return Err(self.error("unexpected character in element")),
                Some('\\') => {
                    self.chars.next();
                    let c = self
                        .chars
                        .next()
                        .ok_or_else(|| self.error("unexpected end of input"))?;

                    value.push_str(&pending_space);
                    pending_space.clear();
                    value.push(c);
                    escaped = true;
                }
                Some(c) if c.is_ascii_whitespace() => {
                    self.chars.next();
                    pending_space.push(c);
                }
                Some(c) => {
                    self.chars.next();
                    value.push_str(&pending_space);
                    pending_space.clear();
                    value.push(c);
                }
            }
        }

        if value.is_empty() && !escaped {
            return Err(self.error("unexpected delimiter"));
        }

        if !escaped && value.eq_ignore_ascii_case("NULL") {
            return Ok(None);
        }

        Ok(Some(value))
    }

    fn parse_quoted(&mut self) -> Result<String, BoxDynError> {
        let mut value = String::new();

        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated quoted string")),
                Some('"') => return Ok(value),
                Some('\\') => {
                    let c = self
                        .chars
                        .next()
                        .ok_or_else(|| self.error("unterminated quoted string"))?;
                    value.push(c);
                }
                Some(c) => value.push(c),
            }
        }
    }
}

/// Append `element` to `buf`, quoting it when the array grammar requires.
pub(crate) fn write_element(element: &str, delimiter: char, buf: &mut String) {
    let needs_quotes = element.is_empty()
        || element.eq_ignore_ascii_case("NULL")
        || element.chars().any(|c| {
            matches!(c, '{' | '}' | '"' | '\\') || c == delimiter || c.is_ascii_whitespace()
        });

    if !needs_quotes {
        buf.push_str(element);
        return;
    }

    buf.push('"');
    for c in element.chars() {
        if c == '"' || c == '\\' {
            buf.push('\\');
        }
        buf.push(c);
    }
    buf.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[Option<&str>]) -> Vec<Option<String>> {
        items.iter().map(|s| s.map(str::to_owned)).collect()
    }

    #[test]
    fn it_parses_one_dimension() {
        let parsed = parse_array(r#"{1, "a b",NULL,"NULL", null , c\,d}"#, ',').unwrap();

        assert_eq!(parsed.dimensions, vec![ArrayDimension::new(6)]);
        assert_eq!(
            parsed.elements,
            strings(&[Some("1"), Some("a b"), None, Some("NULL"), None, Some("c,d")])
        );
    }

    #[test]
    fn it_parses_empty_arrays() {
        assert_eq!(parse_array("{}", ',').unwrap(), ArrayText::default());
        assert_eq!(parse_array(" { } ", ',').unwrap(), ArrayText::default());
    }

    #[test]
    fn it_parses_nested_arrays() {
        let parsed = parse_array("{{1,2,3},{4,5,6}}", ',').unwrap();

        assert_eq!(
            parsed.dimensions,
            vec![ArrayDimension::new(2), ArrayDimension::new(3)]
        );
        assert_eq!(parsed.elements.len(), 6);
        assert_eq!(parsed.elements[3].as_deref(), Some("4"));
    }

    #[test]
    fn it_parses_dimension_decoration() {
        let parsed = parse_array("[0:1][-1:0]={{a,b},{c,d}}", ',').unwrap();

        assert_eq!(
            parsed.dimensions,
            vec![
                ArrayDimension {
                    length: 2,
                    lower_bound: 0
                },
                ArrayDimension {
                    length: 2,
                    lower_bound: -1
                },
            ]
        );

        assert!(parse_array("[1:3]={a,b}", ',').is_err());
    }

    #[test]
    fn it_rejects_malformed_literals() {
        for src in [
            "{1,2",
            "{{1,2},{3}}",
            "{{1},2}",
            "{1,{2}}",
            r#"{"abc}"#,
            "{1,,2}",
            "{1} x",
            "1,2",
        ] {
            assert!(parse_array(src, ',').is_err(), "{src}");
        }
    }

    #[test]
    fn it_honors_the_delimiter() {
        let parsed = parse_array("{(1,2),(3,4);(5,6),(7,8)}", ';').unwrap();

        assert_eq!(
            parsed.elements,
            strings(&[Some("(1,2),(3,4)"), Some("(5,6),(7,8)")])
        );
    }

    #[test]
    fn it_quotes_elements() {
        let mut buf = String::new();

        for element in ["plain", "", "NULL", "a b", r#"say "hi""#, r"back\slash", "x,y"] {
            write_element(element, ',', &mut buf);
            buf.push('|');
        }

        assert_eq!(
            buf,
            r#"plain|""|"NULL"|"a b"|"say \"hi\""|"back\\slash"|"x,y"|"#
        );
    }
}
