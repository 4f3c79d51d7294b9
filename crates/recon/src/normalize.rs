//! Comparison-name derivation.
//!
//! Occurrence sources spell names with whatever diacritics the publisher
//! used; checklist names are plain ASCII. The comparison name folds the
//! former into the latter so the loose stages can join on it.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Transliterate to a diacritic-free form.
///
/// Compatibility decomposition strips accents (`ë` -> `e`); letters with no
/// decomposition (ligatures, stroked letters, the hybrid sign) go through a
/// small fixed table.
pub fn fold_diacritics(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ß' => out.push_str("ss"),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("TH"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'đ' | 'ð' => out.push('d'),
            'Đ' | 'Ð' => out.push('D'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'ı' => out.push('i'),
            '×' => out.push('x'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2010}'..='\u{2015}' => out.push('-'),
            _ => out.push(c),
        }
    }
    out
}

/// `normalize(genericName, specificEpithet)`: fold both parts and join them
/// with a single space. Two empty parts give an empty string, which never
/// joins to anything.
pub fn comparison_name(generic_name: &str, specific_epithet: &str) -> String {
    if generic_name.is_empty() && specific_epithet.is_empty() {
        return String::new();
    }
    fold_diacritics(&format!("{generic_name} {specific_epithet}"))
}
