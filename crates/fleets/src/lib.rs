pub mod roundtrip;
pub mod street;
pub mod zone;

/// Some partner APIs wrap their JSON in a JSONP callback. Strip the
/// wrapping parentheses (and trailing semicolon) if present.
pub(crate) fn strip_jsonp(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('(').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    trimmed.strip_suffix(')').unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::strip_jsonp;

    #[test]
    fn strips_jsonp_wrapping() {
        assert_eq!(strip_jsonp("({\"a\":1});"), "{\"a\":1}");
        assert_eq!(strip_jsonp("({\"a\":1})"), "{\"a\":1}");
        assert_eq!(strip_jsonp("{\"a\":1}"), "{\"a\":1}");
    }
}
