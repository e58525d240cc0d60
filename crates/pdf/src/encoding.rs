//! WinAnsi text encoding and Helvetica metrics for the base-14 fonts.

/// Byte used for characters WinAnsi cannot represent.
pub const REPLACEMENT: u8 = b'?';

/// Encode `text` for a WinAnsi-encoded base-14 font.
///
/// Returns the bytes and whether any character had to be replaced.
pub fn encode_win_ansi(text: &str) -> (Vec<u8>, bool) {
    let mut lossy = false;
    let bytes = text
        .chars()
        .map(|c| {
            win_ansi_byte(c).unwrap_or_else(|| {
                lossy = true;
                REPLACEMENT
            })
        })
        .collect();
    (bytes, lossy)
}

/// Whether every character of `text` has a WinAnsi code.
pub fn is_win_ansi(text: &str) -> bool {
    text.chars().all(|c| win_ansi_byte(c).is_some())
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '‚' => Some(0x82),
        '„' => Some(0x84),
        '…' => Some(0x85),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        '™' => Some(0x99),
        _ => None,
    }
}

/// Approximate Helvetica advance width of `text` at `size`, in points.
///
/// Coarse per-class widths in 1/1000 em; good enough to centre labels.
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' ' | '\'' | '.' | ',' | ':' | ';' | '!' | '|' => 278,
            'i' | 'j' | 'l' | 'I' => 222,
            'f' | 't' | 'r' => 333,
            'm' | 'M' => 833,
            'w' | 'W' => 778,
            '(' | ')' | '[' | ']' | '-' => 333,
            '0'..='9' => 556,
            'A'..='Z' => 667,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ascii_and_latin1() {
        assert_eq!(encode_win_ansi("Kim 95.0"), (b"Kim 95.0".to_vec(), false));
        assert_eq!(encode_win_ansi("José"), (vec![b'J', b'o', b's', 0xe9], false));
        assert_eq!(encode_win_ansi("• x"), (vec![0x95, b' ', b'x'], false));
    }

    #[test]
    fn test_encode_replaces_hangul() {
        let (bytes, lossy) = encode_win_ansi("권민지");
        assert!(lossy);
        assert_eq!(bytes, b"???");
        assert!(!is_win_ansi("이 준"));
        assert!(is_win_ansi("Lee Jun"));
    }

    #[test]
    fn test_text_width_grows_with_size() {
        let small = text_width("30501", 10.0);
        assert!((small - 27.8).abs() < 0.01);
        assert!((text_width("30501", 20.0) - 2.0 * small).abs() < 0.01);
    }
}
