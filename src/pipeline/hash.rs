// src/pipeline/hash.rs

//! Document identity and change fingerprint for course records.

use sha2::{Digest, Sha256};

use crate::models::CourseRecord;

/// Turkish letters and their ASCII stand-ins.
const TRANSLITERATION: &[(char, char)] = &[
    ('ç', 'c'),
    ('Ç', 'C'),
    ('ğ', 'g'),
    ('Ğ', 'G'),
    ('ı', 'i'),
    ('İ', 'I'),
    ('ö', 'o'),
    ('Ö', 'O'),
    ('ş', 's'),
    ('Ş', 'S'),
    ('ü', 'u'),
    ('Ü', 'U'),
];

/// Replace diacritical letters with their closest ASCII equivalent.
pub fn transliterate(text: &str) -> String {
    text.chars()
        .map(|c| {
            TRANSLITERATION
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

/// Document key: `{crn}_{code}_{day}` with the day made ASCII-safe.
pub fn identity(record: &CourseRecord) -> String {
    format!(
        "{}_{}_{}",
        record.crn,
        record.code,
        transliterate(&record.day)
    )
}

/// Hex SHA-256 over `crn + code + day + time.start`.
///
/// Other fields (end time, classroom, instructor, counts) do not take part,
/// so changes to them alone are not seen as updates.
pub fn fingerprint(record: &CourseRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.crn.as_bytes());
    hasher.update(record.code.as_bytes());
    hasher.update(record.day.as_bytes());
    hasher.update(record.time.start.as_bytes());
    hex::encode(hasher.finalize())
}
