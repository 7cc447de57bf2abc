//! QR code → artwork id resolution
//!
//! The printed QR codes carry short opaque code strings, not artwork ids, so
//! reprinting a damaged sign never requires touching the catalog. This table
//! is the single place the two namespaces meet. Unrecognized codes resolve to
//! None; callers log and drop them.

/// Fixed code → artwork-id table
const CODE_TABLE: [(&str, &str); 8] = [
    ("AW01", "harbor-lights"),
    ("AW02", "murmuration"),
    ("AW03", "xmas-tree"),
    ("AW04", "brass-whale"),
    ("AW05", "paper-garden"),
    ("AW06", "echo-chimes"),
    ("AW07", "clockwork-fox"),
    ("AW08", "bonus-aurora"),
];

/// Resolve a scanned code string to an artwork id
///
/// Codes are matched after trimming whitespace; signs in the field get
/// scanned with trailing newlines surprisingly often.
pub fn resolve(code: &str) -> Option<&'static str> {
    let trimmed = code.trim();
    CODE_TABLE
        .iter()
        .find(|(c, _)| *c == trimmed)
        .map(|(_, id)| *id)
}
