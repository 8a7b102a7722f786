//! Unquoting of string payloads.
//!
//! Endpoints that return a bare string (new ids, the root id, secrets) are
//! sometimes answered with a quoted literal (`"\"abc\""`) and sometimes with
//! the raw text. Callers try to unquote and keep the raw value when that
//! fails; a failed unquote is never an error.

use std::str::Chars;

/// Decode a quoted string literal.
///
/// Three forms are accepted, and `raw` must be exactly one of them with no
/// surrounding whitespace:
/// - double-quoted, with the escapes `\a \b \f \n \r \t \v \\ \"`, `\xHH`,
///   three-digit octal `\ooo` up to `\377`, `\uHHHH` and `\UHHHHHHHH`
/// - single-quoted, holding exactly one character or escape (`\'` instead
///   of `\"`)
/// - backquoted, taken verbatim except that carriage returns are dropped
///
/// Returns `None` for anything else, including a raw newline inside quotes,
/// an escaped surrogate, and byte escapes that do not form valid UTF-8.
pub fn unquote(raw: &str) -> Option<String> {
    let quote = raw.chars().next()?;
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;

    match quote {
        '`' => {
            if inner.contains('`') {
                return None;
            }
            Some(inner.replace('\r', ""))
        }
        '"' => unescape(inner, quote).map(|(text, _)| text),
        '\'' => match unescape(inner, quote)? {
            (text, 1) => Some(text),
            _ => None,
        },
        _ => None,
    }
}

/// Unquote `raw`, or return it unchanged if it is not a quoted literal.
pub fn unquote_or_raw(raw: &str) -> String {
    unquote(raw).unwrap_or_else(|| raw.to_string())
}

/// Decode the body of a quoted literal. Also returns the number of
/// characters and escapes it held.
fn unescape(inner: &str, quote: char) -> Option<(String, usize)> {
    if inner.contains('\n') {
        return None;
    }

    let mut out = Vec::with_capacity(inner.len());
    let mut units = 0;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        units += 1;
        if c == quote {
            return None;
        }
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }

        match chars.next()? {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            '\\' => out.push(b'\\'),
            escaped @ ('\'' | '"') => {
                if escaped != quote {
                    return None;
                }
                push_char(&mut out, escaped);
            }
            'x' => out.push(u8::try_from(digits(&mut chars, 2, 16)?).ok()?),
            'u' => push_char(&mut out, char::from_u32(digits(&mut chars, 4, 16)?)?),
            'U' => push_char(&mut out, char::from_u32(digits(&mut chars, 8, 16)?)?),
            first @ '0'..='7' => {
                let rest = digits(&mut chars, 2, 8)?;
                let value = first.to_digit(8)? * 64 + rest;
                out.push(u8::try_from(value).ok()?);
            }
            _ => return None,
        }
    }

    String::from_utf8(out).ok().map(|text| (text, units))
}

fn digits(chars: &mut Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    (0..count).try_fold(0u32, |value, _| Some(value * radix + chars.next()?.to_digit(radix)?))
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
