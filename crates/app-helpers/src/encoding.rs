/// Alphabet used by post shortcodes, in digit order
pub const SHORTCODE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

const SHORTCODE_RADIX: u128 = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcodeError {
    #[error("shortcode is empty")]
    Empty,
    #[error("invalid shortcode character {char:?} at position {position}")]
    InvalidChar { position: usize, char: char },
    #[error("shortcode of {len} characters does not fit a numeric id")]
    TooLong { len: usize },
}

fn shortcode_digit(c: char) -> Option<u128> {
    let c = u8::try_from(c).ok()?;

    SHORTCODE_ALPHABET
        .iter()
        .position(|x| *x == c)
        .and_then(|x| u128::try_from(x).ok())
}

/// Positional radix-64 decode of a shortcode into the numeric media id.
///
/// The first character is the most significant digit.
pub fn shortcode_to_media_id(shortcode: &str) -> Result<u128, ShortcodeError> {
    if shortcode.is_empty() {
        return Err(ShortcodeError::Empty);
    }

    let mut id: u128 = 0;

    for (position, c) in shortcode.chars().enumerate() {
        let digit = shortcode_digit(c).ok_or(ShortcodeError::InvalidChar { position, char: c })?;

        id = id
            .checked_mul(SHORTCODE_RADIX)
            .and_then(|x| x.checked_add(digit))
            .ok_or(ShortcodeError::TooLong {
                len: shortcode.chars().count(),
            })?;
    }

    Ok(id)
}

/// Inverse of [`shortcode_to_media_id`], without leading `A` padding
#[must_use]
pub fn media_id_to_shortcode(mut id: u128) -> String {
    if id == 0 {
        return (SHORTCODE_ALPHABET[0] as char).to_string();
    }

    let mut result = Vec::new();

    while id > 0 {
        #[allow(clippy::cast_possible_truncation)]
        result.push(SHORTCODE_ALPHABET[(id % SHORTCODE_RADIX) as usize]);
        id /= SHORTCODE_RADIX;
    }

    result.iter().rev().map(|x| *x as char).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn known_shortcode_decodes_to_known_id() {
        assert_eq!(shortcode_to_media_id("B"), Ok(1));
        assert_eq!(shortcode_to_media_id("BA"), Ok(64));
        assert_eq!(shortcode_to_media_id("__"), Ok(64 * 64 - 1));
        assert_eq!(
            shortcode_to_media_id("CJ3jX6MH1Kx"),
            Ok(2_483_609_294_174_376_625)
        );
    }

    #[test]
    fn conversion_is_deterministic() {
        let a = shortcode_to_media_id("DAbc-_09xyz");
        let b = shortcode_to_media_id("DAbc-_09xyz");

        assert_eq!(a, b);
    }

    #[test]
    fn equal_length_shortcodes_never_collide() {
        let mut seen = HashSet::new();
        let chars = SHORTCODE_ALPHABET.iter().map(|x| *x as char);

        for a in chars.clone() {
            for b in chars.clone() {
                let code: String = ['C', a, 'x', b].iter().collect();
                let id = shortcode_to_media_id(&code).expect("valid shortcode");

                assert!(seen.insert(id), "collision for {code}");
            }
        }

        assert_eq!(seen.len(), 64 * 64);
    }

    #[test]
    fn id_round_trips_back_to_shortcode() {
        for code in ["CJ3jX6MH1Kx", "DAbc-_09xyz", "B_"] {
            let id = shortcode_to_media_id(code).expect("valid shortcode");

            assert_eq!(media_id_to_shortcode(id), code);
        }
    }

    #[test]
    fn rejects_invalid_input() {
        assert_eq!(shortcode_to_media_id(""), Err(ShortcodeError::Empty));
        assert_eq!(
            shortcode_to_media_id("ab?c"),
            Err(ShortcodeError::InvalidChar {
                position: 2,
                char: '?'
            })
        );
        assert_eq!(
            shortcode_to_media_id(&"_".repeat(30)),
            Err(ShortcodeError::TooLong { len: 30 })
        );
    }
}
