use std::borrow::Cow;

/// Strips control characters from a caller-supplied string before it is logged
///
/// Validation never sees the sanitized form; this exists only so a crafted URL
/// cannot forge log lines (CR/LF injection) or smuggle terminal escapes.
///
/// # Examples
///
/// ```
/// use scrape_guard::url::sanitize_for_log;
///
/// assert_eq!(sanitize_for_log("http://example.com/\nattack\r"), "http://example.com/attack");
/// ```
pub fn sanitize_for_log(raw: &str) -> Cow<'_, str> {
    if raw.chars().any(char::is_control) {
        Cow::Owned(raw.chars().filter(|c| !c.is_control()).collect())
    } else {
        Cow::Borrowed(raw)
    }
}
