//! Diagnostic names for compilation units.

/// Maximum length of a chunk id, including the `...` marker.
pub const CHUNK_ID_SIZE: usize = 60;

const RETS: &str = "...";
const PRE: &str = "[string \"";
const POS: &str = "\"]";

/// Turn a source name into the name used in error messages.
///
/// - `=name` is used literally (truncated at the end),
/// - `@path` is a file name (truncated from the start, keeping the tail),
/// - anything else is source text, shown as `[string "first line..."]`.
///
/// ```
/// use skyc_util::chunk_id;
///
/// assert_eq!(chunk_id("=stdin"), "stdin");
/// assert_eq!(chunk_id("@main.sky"), "main.sky");
/// assert_eq!(chunk_id("x = 1\ny = 2"), "[string \"x = 1...\"]");
/// ```
pub fn chunk_id(source: &str) -> String {
    if let Some(name) = source.strip_prefix('=') {
        return truncate_end(name, CHUNK_ID_SIZE);
    }
    if let Some(path) = source.strip_prefix('@') {
        if path.len() <= CHUNK_ID_SIZE {
            return path.to_string();
        }
        let keep = CHUNK_ID_SIZE - RETS.len();
        return format!("{RETS}{}", tail(path, keep));
    }

    let budget = CHUNK_ID_SIZE - PRE.len() - RETS.len() - POS.len();
    let first_line = source.split('\n').next().unwrap_or_default();
    if first_line.len() == source.len() && source.len() <= budget {
        format!("{PRE}{source}{POS}")
    } else {
        format!("{PRE}{}{RETS}{POS}", head(first_line, budget))
    }
}

fn truncate_end(s: &str, max: usize) -> String {
    head(s, max).to_string()
}

fn head(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_name() {
        assert_eq!(chunk_id("=repl"), "repl");
        assert_eq!(chunk_id(&format!("={}", "n".repeat(100))).len(), CHUNK_ID_SIZE);
    }

    #[test]
    fn test_long_file_name_keeps_tail() {
        let path = format!("@{}/script.sky", "dir".repeat(30));
        let id = chunk_id(&path);
        assert!(id.starts_with("..."));
        assert!(id.ends_with("/script.sky"));
        assert_eq!(id.len(), CHUNK_ID_SIZE);
    }

    #[test]
    fn test_source_text() {
        assert_eq!(chunk_id("return 1"), "[string \"return 1\"]");
        assert_eq!(chunk_id("a = 1\nb = 2"), "[string \"a = 1...\"]");
    }

    #[test]
    fn test_long_source_line_is_cut() {
        let id = chunk_id(&"x".repeat(200));
        assert!(id.starts_with("[string \"xxx"));
        assert!(id.ends_with("...\"]"));
        assert!(id.len() <= CHUNK_ID_SIZE);
    }
}
