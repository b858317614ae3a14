//! Lenient, prefix-based parsing of non-negative numbers.
//!
//! Tokens on the wire are text, and senders are not always tidy about
//! them. Both parsers skip leading whitespace, accept an optional sign,
//! take the longest numeric prefix and ignore whatever follows it:
//!
//! | Input        | [`parse_uint`] | [`parse_ufloat`] |
//! |--------------|----------------|------------------|
//! | `"42"`       | `Some(42)`     | `Some(42.0)`     |
//! | `"  7 apples"` | `Some(7)`    | `Some(7.0)`      |
//! | `"3.14"`     | `Some(3)`      | `Some(3.14)`     |
//! | `"1e3"`      | `Some(1)`      | `Some(1000.0)`   |
//! | `"-0"`       | `Some(0)`      | `Some(0.0)`      |
//! | `"-3"`       | `None`         | `None`           |
//! | `"abc"`      | `None`         | `None`           |
//!
//! "Whitespace" is the set JavaScript's number parsing skips: Unicode
//! whitespace plus the byte-order mark U+FEFF, without NEL (U+0085).
//!
//! Negative values are rejected outright. The channel only ever carries
//! sizes and counts, so a negative number means the peer is broken.

const INFINITY: &str = "Infinity";

/// Parse the base-10 integer prefix of `text` as a `u64`.
///
/// Returns `None` if there is no digit after the optional sign, if the
/// value is negative, or if it does not fit in a `u64`.
#[must_use]
pub fn parse_uint(text: &str) -> Option<u64> {
    let (negative, rest) = split_sign(trim_leading(text));
    let digits = &rest[..digit_run(rest.as_bytes())];
    if digits.is_empty() {
        return None;
    }

    let value: u64 = digits.parse().ok()?;
    if negative && value != 0 {
        return None;
    }
    Some(value)
}

/// Parse the decimal floating-point prefix of `text` as a non-negative
/// `f64`.
///
/// Accepts an integer part, a fraction, an exponent and the literal
/// `Infinity`. Negative zero comes back as `0.0`.
#[must_use]
pub fn parse_ufloat(text: &str) -> Option<f64> {
    let (negative, rest) = split_sign(trim_leading(text));

    let magnitude = if rest.starts_with(INFINITY) {
        f64::INFINITY
    } else {
        let len = float_prefix_len(rest.as_bytes());
        if len == 0 {
            return None;
        }
        rest[..len].parse::<f64>().ok()?
    };

    if negative && magnitude > 0.0 {
        return None;
    }
    Some(magnitude)
}

fn trim_leading(text: &str) -> &str {
    text.trim_start_matches(|c: char| (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}')
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Length of the longest `digits [. digits] [e [sign] digits]` prefix.
/// Zero when the prefix has no mantissa digit at all.
fn float_prefix_len(bytes: &[u8]) -> usize {
    let int_digits = digit_run(bytes);
    let mut end = int_digits;
    let mut frac_digits = 0;

    if bytes.get(end) == Some(&b'.') {
        frac_digits = digit_run(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digit_run(&bytes[exp..]);
        // A dangling "e" is not part of the number.
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    end
}
