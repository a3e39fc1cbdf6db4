//! Boring-change classifier
//!
//! Decides whether two text snapshots represent a non-meaningful change:
//! whitespace reflow, a date-line-only edit, or a page served in a different
//! character encoding with identical content. Boring changes are never
//! persisted as new versions.

use encoding_rs::Encoding;

use crate::normalize::canonicalize;

/// Legacy charsets checked for re-encoding-only changes, in order.
///
/// Labels are resolved through the WHATWG encoding registry; labels it does
/// not know (IBM855 has no registered encoder) are skipped like any other
/// encoding failure.
const CHARSET_LABELS: &[&str] = &[
    "EUC-JP",
    "GB2312",
    "EUC-KR",
    "Big5",
    "Shift_JIS",
    "windows-1252",
    "IBM855",
    "IBM866",
    "ISO-8859-2",
    "ISO-8859-5",
    "ISO-8859-7",
    "KOI8-R",
    "x-mac-cyrillic",
    "TIS-620",
    "windows-1250",
    "windows-1251",
    "windows-1253",
    "windows-1255",
];

/// Classify the change between two stored snapshots.
///
/// Returns true when the difference is not semantically meaningful:
///
/// 1. Both inputs decode as UTF-8 (lossily, so foreign bytes cannot abort a
///    pass) and are canonicalized.
/// 2. The first line of each text is dropped (date/header line by adapter
///    convention) and the remainders compared as whitespace-delimited
///    tokens. Texts without a newline compare in full; this is the
///    defensive default for single-line or empty text.
/// 3. Otherwise the canonicalized old text is re-encoded into each legacy
///    charset and byte-compared against `new`, catching pages whose
///    encoding changed but whose content did not.
pub fn is_boring(old: &[u8], new: &[u8]) -> bool {
    let oldu = canonicalize(&String::from_utf8_lossy(old));
    let newu = canonicalize(&String::from_utf8_lossy(new));

    if body_tokens(&oldu) == body_tokens(&newu) {
        return true;
    }

    for label in CHARSET_LABELS {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            continue;
        };
        let (bytes, _, had_errors) = encoding.encode(&oldu);
        if !had_errors && bytes.as_ref() == new {
            tracing::debug!(charset = label, "boring: re-encoding-only change");
            return true;
        }
    }

    false
}

/// Whitespace-delimited tokens of everything after the first line.
fn body_tokens(s: &str) -> Vec<&str> {
    let body = s.split_once('\n').map_or(s, |(_, rest)| rest);
    body.split_whitespace().collect()
}
