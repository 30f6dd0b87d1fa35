//! Output comparison.
//!
//! Comparison is purely textual: carriage returns are dropped and trailing
//! whitespace trimmed, nothing else. Leading whitespace is significant and
//! `"1.0"` and `"1"` differ.

/// Canonical form used for comparison
pub fn normalize(output: &str) -> String {
    output.replace('\r', "").trim_end().to_string()
}

/// Verdict for `actual` against `expected`, or `None` when there is nothing
/// to compare against.
pub fn evaluate(actual: &str, expected: Option<&str>) -> Option<bool> {
    expected.map(|expected| normalize(actual) == normalize(expected))
}
