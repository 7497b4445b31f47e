//! OOXML text helpers shared by the Word writer and reader.
//!
//! Writing is left to the encoder crates; this module only cleans text on
//! the way in and decodes part XML on the way out.

use crate::error::ExtractError;
use std::borrow::Cow;
use std::io::{Cursor, Read};

/// Drop characters XML 1.0 cannot carry at all (C0 controls other than
/// tab, line feed and carriage return).
pub(crate) fn clean_text(text: &str) -> Cow<'_, str> {
    let invalid = |c: char| (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r');
    if text.contains(invalid) {
        Cow::Owned(text.chars().filter(|c| !invalid(*c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Decode the five predefined entities and numeric character references.
///
/// Anything that does not decode is kept literally.
pub(crate) fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Read one part of a package as UTF-8 text.
pub(crate) fn read_part(bytes: &[u8], name: &str) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut part = archive.by_name(name)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ExtractError::Export(format!("{name}: {e}")))?;
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(clean_text("tab\there\u{0001}"), "tab\there");
        assert!(matches!(clean_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn entities_decode() {
        assert_eq!(unescape("a&lt;b &amp; &quot;c&quot;&apos;"), r#"a<b & "c"'"#);
        assert_eq!(unescape("&#233;t&#xE9;"), "été");
        assert_eq!(unescape("AT&T; & more"), "AT&T; & more");
    }

    #[test]
    fn non_zip_bytes_fail() {
        assert!(read_part(b"not a zip", "word/document.xml").is_err());
    }
}
