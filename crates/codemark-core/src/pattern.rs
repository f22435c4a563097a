//! The fixed marker pattern table and line matching.
//!
//! A marker line is a `//` comment containing a known tag, optionally
//! prefixed with the resolution token `@DONE-<TAG>:`:
//!
//! ```text
//! // TODO: wire up retry logic
//! // @DONE-TODO: wire up retry logic
//! ```
//!
//! Tags match case-insensitively; the colon after the tag is optional.
//! The table is data-driven so new tags are additive.

use once_cell::sync::Lazy;
use regex::Regex;

/// One entry of the marker table: a tag, its compiled matching rules,
/// and a display icon hint.
pub struct MarkerPattern {
    /// Canonical upper-case tag name, e.g. `"TODO"`.
    pub tag: &'static str,
    /// Icon hint for UI surfaces.
    pub icon: &'static str,
    /// Case-insensitive match against a trimmed line; capture 1 is the message.
    match_re: Regex,
    /// Removes the resolution prefix, restoring the bare tag (`$1`).
    strip_re: Regex,
    /// Locates the comment-opener-plus-tag substring for marking resolved.
    /// Exact tag case, mirroring the match performed before a rewrite.
    mark_re: Regex,
}

impl MarkerPattern {
    fn new(tag: &'static str, icon: &'static str) -> Self {
        // Tags are plain ASCII identifiers, never regex metacharacters.
        let match_re = Regex::new(&format!(r"(?i)//\s*(?:@DONE-)?{tag}:?\s*(.+)"))
            .expect("marker match regex is valid");
        let strip_re =
            Regex::new(&format!(r"@DONE-({tag}:?\s*)")).expect("marker strip regex is valid");
        let mark_re =
            Regex::new(&format!(r"(//\s*)({tag}:?\s*)(.+)")).expect("marker mark regex is valid");
        Self {
            tag,
            icon,
            match_re,
            strip_re,
            mark_re,
        }
    }

    /// Attempt a match against a trimmed line. Returns the captured
    /// free-text message, trimmed, or `None` if the line is not a marker
    /// line for this tag.
    pub fn try_match(&self, trimmed_line: &str) -> Option<String> {
        self.match_re
            .captures(trimmed_line)
            .map(|caps| caps[1].trim().to_string())
    }

    /// The literal resolution token for this tag, e.g. `"@DONE-TODO:"`.
    pub fn done_token(&self) -> String {
        format!("@DONE-{}:", self.tag)
    }

    /// Whether the (untrimmed) source line carries the resolution token.
    /// The check is a literal, case-sensitive substring test.
    pub fn is_resolved_in(&self, line: &str) -> bool {
        line.contains(&self.done_token())
    }

    /// Remove the resolution prefix from a line, restoring the bare tag.
    /// Only the first occurrence is rewritten; every other byte is kept.
    pub fn unresolve_line(&self, line: &str) -> String {
        self.strip_re.replace(line, "$1").into_owned()
    }

    /// Insert the resolution prefix into a pending marker line.
    ///
    /// Finds the comment-opener-plus-tag substring and replaces its first
    /// occurrence with `@DONE-<TAG>: `, preserving the message and any text
    /// before the comment opener. If the line no longer matches the
    /// expected shape the line is returned unchanged.
    pub fn resolve_line(&self, line: &str) -> String {
        match self.mark_re.captures(line) {
            Some(caps) => {
                let tag_part = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                line.replacen(tag_part, &format!("@DONE-{}: ", self.tag), 1)
            }
            None => line.to_string(),
        }
    }
}

/// The fixed marker table. Order matters only for display; extraction
/// attempts every pattern against every line.
pub static MARKER_PATTERNS: Lazy<Vec<MarkerPattern>> = Lazy::new(|| {
    vec![
        MarkerPattern::new("FIXME", "bug"),
        MarkerPattern::new("TODO", "checklist"),
        MarkerPattern::new("HACK", "warning"),
        MarkerPattern::new("NOTE", "info"),
        MarkerPattern::new("BUG", "bug"),
        MarkerPattern::new("REVIEW", "eye"),
        MarkerPattern::new("OPTIMIZE", "rocket"),
        MarkerPattern::new("WARNING", "alert"),
    ]
});

/// Look up a pattern by tag name, case-insensitively.
pub fn pattern_for(tag: &str) -> Option<&'static MarkerPattern> {
    MARKER_PATTERNS
        .iter()
        .find(|p| p.tag.eq_ignore_ascii_case(tag))
}
