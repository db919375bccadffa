use std::collections::btree_map::{self, BTreeMap};
use std::iter::Peekable;
use std::ops::{Deref, DerefMut};
use std::str::Chars;

use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;

use crate::arguments::{put_len, PgArgumentBuffer};
use crate::plan::text;
use crate::types::WireValue;

/// Key/value string pairs stored in an `hstore`.
///
/// `hstore` is an extension type whose OID is assigned per database; register
/// [`HstoreCodec`] under it before use.
///
/// ```rust,ignore
/// let mut map = PgTypeMap::new();
/// map.register_type(PgType::new("hstore", hstore_oid, HstoreCodec));
///
/// let mut hstore = PgHstore::default();
/// hstore.insert("key".into(), Some("value".into()));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PgHstore(pub BTreeMap<String, Option<String>>);

crate::impl_host_scalar!(PgHstore);

impl Deref for PgHstore {
    type Target = BTreeMap<String, Option<String>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PgHstore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, Option<String>)> for PgHstore {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (String, Option<String>)>,
    {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PgHstore {
    type Item = (String, Option<String>);
    type IntoIter = btree_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn put_hstore_str(buf: &mut PgArgumentBuffer, s: &str) {
    buf.push(b'"');

    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            buf.push(b'\\');
        }
        let mut utf8 = [0; 4];
        buf.put_str(c.encode_utf8(&mut utf8));
    }

    buf.push(b'"');
}

impl WireValue for PgHstore {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        put_len(buf, self.0.len())?;

        for (key, value) in &self.0 {
            put_len(buf, key.len())?;
            buf.put_str(key);

            match value {
                Some(value) => {
                    put_len(buf, value.len())?;
                    buf.put_str(value);
                }
                None => buf.extend(&(-1_i32).to_be_bytes()),
            }
        }

        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                buf.put_str(", ");
            }

            put_hstore_str(buf, key);
            buf.put_str("=>");

            match value {
                Some(value) => put_hstore_str(buf, value),
                None => buf.put_str("NULL"),
            }
        }

        Ok(())
    }

    fn decode_binary(mut src: &[u8]) -> Result<Self, BoxDynError> {
        let count = src.try_get_i32()?;
        let count = usize::try_from(count)
            .map_err(|_| Error::protocol(format!("invalid hstore pair count {count}")))?;

        let mut hstore = PgHstore::default();

        for _ in 0..count {
            let key = src
                .try_get_len_prefixed()?
                .ok_or_else(|| Error::protocol("hstore key must not be NULL"))?;
            let value = src.try_get_len_prefixed()?;

            hstore.insert(
                text(key)?.to_owned(),
                value.map(text).transpose()?.map(str::to_owned),
            );
        }

        if !src.is_empty() {
            return Err(Error::protocol(format!(
                "{} trailing bytes after hstore pairs",
                src.len()
            ))
            .into());
        }

        Ok(hstore)
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        HstoreParser::new(src)
            .parse()
            .map_err(|msg| Error::protocol(format!("invalid hstore {src:?}: {msg}")).into())
    }
}

struct HstoreParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> HstoreParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn parse(mut self) -> Result<PgHstore, &'static str> {
        let mut hstore = PgHstore::default();

        loop {
            self.skip_whitespace();

            if self.chars.peek().is_none() {
                return Ok(hstore);
            }

            let (key, _) = self.token()?;

            self.skip_whitespace();
            if self.chars.next() != Some('=') || self.chars.next() != Some('>') {
                return Err("expected `=>`");
            }
            self.skip_whitespace();

            let value = match self.token()? {
                (value, false) if value.eq_ignore_ascii_case("NULL") => None,
                (value, _) => Some(value),
            };

            hstore.insert(key, value);

            self.skip_whitespace();
            match self.chars.next() {
                Some(',') => {}
                None => return Ok(hstore),
                Some(_) => return Err("expected `,` between pairs"),
            }
        }
    }

    /// A quoted or bare string, and whether it was quoted.
    fn token(&mut self) -> Result<(String, bool), &'static str> {
        let mut out = String::new();

        if self.chars.next_if_eq(&'"').is_some() {
            loop {
                match self.chars.next() {
                    Some('"') => return Ok((out, true)),
                    Some('\\') => out.push(self.chars.next().ok_or("unterminated escape")?),
                    Some(c) => out.push(c),
                    None => return Err("unterminated quoted string"),
                }
            }
        }

        while let Some(c) = self
            .chars
            .next_if(|&c| !c.is_whitespace() && !matches!(c, ',' | '=' | '"'))
        {
            if c == '\\' {
                out.push(self.chars.next().ok_or("unterminated escape")?);
            } else {
                out.push(c);
            }
        }

        if out.is_empty() {
            return Err("expected a key or value");
        }

        Ok((out, false))
    }
}

scalar_codec!(
    /// `hstore`.
    HstoreCodec, PgHstore, Hstore
);

#[cfg(test)]
mod tests {
    use super::*;

    const HSTORE_BYTES: &[u8] = &[
        0, 0, 0, 2, // pairs
        0, 0, 0, 1, b'a', 0, 0, 0, 1, b'1', // "a" => "1"
        0, 0, 0, 1, b'b', 255, 255, 255, 255, // "b" => NULL
    ];

    fn sample() -> PgHstore {
        [("a".into(), Some("1".into())), ("b".into(), None)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_hstore_binary() {
        assert_eq!(PgHstore::decode_binary(HSTORE_BYTES).unwrap(), sample());

        let mut buf = PgArgumentBuffer::new();
        sample().encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], HSTORE_BYTES);

        assert!(PgHstore::decode_binary(&HSTORE_BYTES[..20]).is_err());
    }

    #[test]
    fn test_hstore_text() {
        let mut buf = PgArgumentBuffer::new();
        sample().encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], br#""a"=>"1", "b"=>NULL"#);

        assert_eq!(PgHstore::decode_text(r#"a=>1, "b" => NULL"#).unwrap(), sample());

        let quoted = PgHstore::decode_text(r#""k\"ey"=>"NULL""#).unwrap();
        assert_eq!(quoted.get("k\"ey"), Some(&Some("NULL".to_owned())));

        assert_eq!(PgHstore::decode_text("").unwrap(), PgHstore::default());
        assert!(PgHstore::decode_text(r#""a"=>"#).is_err());
        assert!(PgHstore::decode_text(r#""a" "b""#).is_err());
    }
}
