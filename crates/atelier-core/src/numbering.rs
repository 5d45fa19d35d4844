//! Sequential identifiers shown to users: entry codes (`"1"`, `"2"`, ...)
//! and document numbers (`FA-0001`, `PR-0002`).

use crate::types::DocumentType;

/// Next entry code: highest numeric code plus one, `"1"` when none exist.
///
/// Non-numeric codes are ignored.
pub fn next_entry_code<'a, I>(existing_codes: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing_codes
        .into_iter()
        .filter_map(|code| code.trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

/// Sequence part of a document number (`"FA-0012"` -> 12).
pub fn document_sequence(number: &str) -> Option<u64> {
    let (_, seq) = number.rsplit_once('-')?;
    seq.parse().ok()
}

/// Next document number, one past the highest sequence of any existing
/// document, zero-padded to four digits.
pub fn next_document_number<'a, I>(document_type: DocumentType, existing_numbers: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing_numbers
        .into_iter()
        .filter_map(document_sequence)
        .max()
        .unwrap_or(0);
    format!("{}-{:04}", document_type.number_prefix(), max + 1)
}
