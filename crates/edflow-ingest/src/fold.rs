//! Diacritic folding for header and token matching.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Strips diacritics: canonical decomposition, combining marks dropped, then
/// recomposition of whatever remains.
///
/// Case is preserved. Letters that carry a stroke or are ligatures have no
/// decomposition and are spelled out in ASCII instead.
pub fn fold_diacritics(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for ch in text.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        match spell_out(ch) {
            Some(ascii) => out.push_str(ascii),
            None => out.push(ch),
        }
    }
    out.nfc().collect()
}

/// Lowercases and folds diacritics.
pub fn fold_lower(text: &str) -> String {
    fold_diacritics(&text.to_lowercase())
}

fn spell_out(ch: char) -> Option<&'static str> {
    let ascii = match ch {
        'Æ' => "AE",
        'æ' => "ae",
        'Đ' | 'Ð' => "D",
        'đ' | 'ð' => "d",
        'Ħ' => "H",
        'ħ' => "h",
        'ı' => "i",
        'Ĳ' => "IJ",
        'ĳ' => "ij",
        'ĸ' => "k",
        'Ŀ' | 'Ł' => "L",
        'ŀ' | 'ł' => "l",
        'Ŋ' => "N",
        'ŉ' | 'ŋ' => "n",
        'Ø' => "O",
        'ø' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'ſ' => "s",
        'ß' => "ss",
        'Ŧ' => "T",
        'ŧ' => "t",
        'Þ' => "TH",
        'þ' => "th",
        _ => return None,
    };
    Some(ascii)
}
