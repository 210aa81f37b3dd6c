//! Morse code lookup table for A-Z and 0-9

use std::collections::HashMap;
use std::sync::OnceLock;

/// Character appended when a completed pattern has no table entry
pub const UNKNOWN_LETTER: char = '?';

const PATTERNS: [(&str, char); 36] = [
    (".-", 'A'),
    ("-...", 'B'),
    ("-.-.", 'C'),
    ("-..", 'D'),
    (".", 'E'),
    ("..-.", 'F'),
    ("--.", 'G'),
    ("....", 'H'),
    ("..", 'I'),
    (".---", 'J'),
    ("-.-", 'K'),
    (".-..", 'L'),
    ("--", 'M'),
    ("-.", 'N'),
    ("---", 'O'),
    (".--.", 'P'),
    ("--.-", 'Q'),
    (".-.", 'R'),
    ("...", 'S'),
    ("-", 'T'),
    ("..-", 'U'),
    ("...-", 'V'),
    (".--", 'W'),
    ("-..-", 'X'),
    ("-.--", 'Y'),
    ("--..", 'Z'),
    ("-----", '0'),
    (".----", '1'),
    ("..---", '2'),
    ("...--", '3'),
    ("....-", '4'),
    (".....", '5'),
    ("-....", '6'),
    ("--...", '7'),
    ("---..", '8'),
    ("----.", '9'),
];

fn table() -> &'static HashMap<&'static str, char> {
    static TABLE: OnceLock<HashMap<&'static str, char>> = OnceLock::new();
    TABLE.get_or_init(|| PATTERNS.iter().copied().collect())
}

/// Look up a pattern written with '.' and '-'
pub fn lookup(pattern: &str) -> Option<char> {
    table().get(pattern).copied()
}

/// Decode a completed letter, substituting [`UNKNOWN_LETTER`] for unknown patterns
pub fn decode_letter(pattern: &str) -> char {
    lookup(pattern).unwrap_or(UNKNOWN_LETTER)
}
