//! File names derived from package metadata.

use super::package::PackageSummary;

/// Separator placed between creator names.
pub const CREATOR_SEPARATOR: char = '×';

/// Build `[Creator1×Creator2] Title<extension>` for a book.
///
/// `extension` includes the leading dot.
pub fn epub_file_name(summary: &PackageSummary, extension: &str) -> String {
    let creators = summary
        .creators
        .iter()
        .map(|creator| creator.name.as_str())
        .collect::<Vec<_>>()
        .join(&CREATOR_SEPARATOR.to_string());
    let stem = format!("[{creators}] {}", summary.title.name);

    let mut stem = sanitize_file_stem(&to_narrow(&stem));
    if stem.is_empty() {
        stem.push_str("untitled");
    }
    format!("{stem}{extension}")
}

/// Fold full-width ASCII variants (digits, Latin letters, ideographic space
/// and common punctuation) to their narrow forms.
pub fn to_narrow(text: &str) -> String {
    text.chars().map(narrow_char).collect()
}

fn narrow_char(c: char) -> char {
    let shift = |from: char, to: char| char::from_u32(c as u32 - from as u32 + to as u32).unwrap_or(c);
    match c {
        '０'..='９' => shift('０', '0'),
        'Ａ'..='Ｚ' => shift('Ａ', 'A'),
        'ａ'..='ｚ' => shift('ａ', 'a'),
        '\u{3000}' => ' ',
        '！' => '!',
        '＃' => '#',
        '＄' => '$',
        '％' => '%',
        '＆' => '&',
        '’' => '\'',
        '（' => '(',
        '）' => ')',
        '＝' => '=',
        '‐' => '-',
        '＾' => '^',
        '＠' => '@',
        '‘' => '`',
        '［' => '[',
        '］' => ']',
        '｛' => '{',
        '｝' => '}',
        '＋' => '+',
        '＊' => '*',
        '；' => ';',
        '，' => ',',
        '．' => '.',
        '＿' => '_',
        _ => c,
    }
}

/// Make `stem` usable as a file name on Windows as well as Unix.
///
/// Reserved characters become their full-width look-alikes, control
/// characters are dropped, and trailing dots and spaces are trimmed.
pub fn sanitize_file_stem(stem: &str) -> String {
    let replaced: String = stem
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '\\' => '＼',
            '/' => '／',
            ':' => '：',
            '*' => '＊',
            '?' => '？',
            '"' => '＂',
            '<' => '＜',
            '>' => '＞',
            '|' => '｜',
            _ => c,
        })
        .collect();

    replaced
        .trim_start_matches(' ')
        .trim_end_matches(['.', ' '])
        .to_string()
}
