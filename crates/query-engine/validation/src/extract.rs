//! Isolating a candidate SQL statement from raw model output.
//!
//! Models wrap their SQL in prose, code fences and `SQL:` markers. Extraction
//! is deterministic and fail-closed: anything that does not yield a region
//! starting with a SQL keyword is an extraction failure, and meta-prose that
//! survives the filters produces an unparsable candidate rather than an
//! executable one.

use crate::error::ValidationError;

/// Words that start narration lines rather than SQL.
const NARRATION_WORDS: &[&str] = &[
    "here", "here's", "the", "this", "that", "note", "explanation", "answer", "sure", "output",
    "below", "response",
];

/// Keywords a SQL statement can start with. Write verbs are included on
/// purpose: the leading-verb check needs to see them to name the offence.
const LEADING_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
    "GRANT", "REVOKE", "MERGE", "CALL", "EXEC", "EXECUTE", "COPY", "VACUUM", "ANALYZE", "SET",
    "SHOW", "BEGIN", "START", "COMMIT", "ROLLBACK", "EXPLAIN",
];

/// Isolate the SQL region of raw model output.
///
/// Returns the text from the first SQL-leading keyword onwards, with fences,
/// narration lines and `SQL:` markers removed. The region may still contain
/// statement separators; those are the next step's concern.
pub fn extract_sql(raw_text: &str) -> Result<String, ValidationError> {
    let region = fenced_block(raw_text).unwrap_or(raw_text);

    let mut kept: Vec<&str> = Vec::new();
    for line in region.lines() {
        let mut line = line.trim();
        if let Some(marker) = line.get(..4) {
            if marker.eq_ignore_ascii_case("sql:") {
                line = line[4..].trim_start();
            }
        }
        if line.is_empty() {
            continue;
        }
        if is_narration(line) {
            // keep a trailing statement on the same line, drop pure prose
            if let Some(index) = keyword_start(line) {
                kept.push(&line[index..]);
            }
        } else {
            kept.push(line);
        }
    }
    let joined = kept.join(" ");

    let start = keyword_start(&joined).ok_or_else(|| {
        ValidationError::Extraction("no SQL statement found in the generated text".to_string())
    })?;

    Ok(joined[start..].trim().to_string())
}

/// The content of the first ``` fence, if the text contains one.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    // skip a language tag such as ```sql
    let content_start = match after.find('\n') {
        Some(newline) if after[..newline].trim().chars().all(char::is_alphanumeric) => newline + 1,
        _ => 0,
    };
    let content = &after[content_start..];
    let close = content.find("```").unwrap_or(content.len());
    let block = content[..close].trim();
    if block.is_empty() {
        None
    } else {
        Some(block)
    }
}

fn is_narration(line: &str) -> bool {
    let Some(first) = line.split_whitespace().next() else {
        return false;
    };
    let first = first.trim_end_matches(':').to_lowercase();
    NARRATION_WORDS.contains(&first.as_str())
}

fn is_leading_keyword(word: &str) -> bool {
    let word = word.trim_start_matches('(');
    LEADING_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(word))
}

/// Byte offset of the first word that is a SQL-leading keyword.
fn keyword_start(text: &str) -> Option<usize> {
    let mut rest = text;
    let mut base = 0;
    loop {
        let trimmed = rest.trim_start();
        base += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            return None;
        }
        let end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        if is_leading_keyword(&trimmed[..end]) {
            return Some(base);
        }
        base += end;
        rest = &trimmed[end..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_statement_passes_through() {
        let extracted = extract_sql("SELECT user_id FROM users").unwrap();
        assert_eq!(extracted, "SELECT user_id FROM users");
    }

    #[test]
    fn test_code_fence_with_language_tag() {
        let raw = "Here is your query:\n```sql\nSELECT user_id\nFROM users\n```\nHope this helps!";
        let extracted = extract_sql(raw).unwrap();
        assert_eq!(extracted, "SELECT user_id FROM users");
    }

    #[test]
    fn test_code_fence_without_language_tag() {
        let raw = "```\nSELECT 1\n```";
        assert_eq!(extract_sql(raw).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_narration_lines_are_dropped() {
        let raw = "Here is the query you asked for.\nThis uses a join.\nSELECT u.user_id FROM users u";
        assert_eq!(extract_sql(raw).unwrap(), "SELECT u.user_id FROM users u");
    }

    #[test]
    fn test_sql_marker_is_stripped() {
        let raw = "SQL: SELECT user_id FROM users";
        assert_eq!(extract_sql(raw).unwrap(), "SELECT user_id FROM users");
    }

    #[test]
    fn test_inline_prose_before_statement() {
        let raw = "Here is the query: SELECT user_id FROM users";
        assert_eq!(extract_sql(raw).unwrap(), "SELECT user_id FROM users");
    }

    #[test]
    fn test_then_lines_are_not_narration() {
        let raw = "SELECT CASE WHEN is_active = TRUE\nTHEN 1 ELSE 0 END AS flag\nFROM users";
        assert_eq!(
            extract_sql(raw).unwrap(),
            "SELECT CASE WHEN is_active = TRUE THEN 1 ELSE 0 END AS flag FROM users"
        );
    }

    #[test]
    fn test_pure_prose_is_an_extraction_error() {
        let result = extract_sql("I cannot answer that question.");
        assert!(matches!(result, Err(ValidationError::Extraction(_))));
    }

    #[test]
    fn test_empty_input_is_an_extraction_error() {
        assert!(matches!(
            extract_sql(""),
            Err(ValidationError::Extraction(_))
        ));
    }

    #[test]
    fn test_write_verbs_are_still_extracted() {
        assert_eq!(
            extract_sql("DROP TABLE users; SELECT 1").unwrap(),
            "DROP TABLE users; SELECT 1"
        );
    }
}
