//! Shared CLI utilities for the lockstep-decode binary.

use std::io::Read;
use std::path::Path;

/// Initialize tracing/logging to stderr.
///
/// If `disable` is true, no output is produced.
/// Otherwise respects `RUST_LOG` env var, defaulting to WARN.
pub fn init_logging(disable: bool) {
    use tracing_subscriber::EnvFilter;

    if disable {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read prompt token text from one of: inline string, file path, or stdin.
///
/// Returns an error message string if no input source is provided.
pub fn read_input(
    tokens: Option<&str>,
    file: Option<&Path>,
    use_stdin: bool,
) -> Result<String, String> {
    if let Some(text) = tokens {
        return Ok(text.to_string());
    }

    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read file '{}': {}", path.display(), e));
    }

    if use_stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(buf);
    }

    Err("No input provided. Use --tokens, --file, or --stdin".to_string())
}

/// Parse prompt rows from text: comma-separated token ids, rows split by
/// `;` or newlines. Example: `"5,7;5,8"` is a batch of two rows.
pub fn parse_token_rows(text: &str) -> Result<Vec<Vec<u32>>, String> {
    let mut rows = Vec::new();
    for row_text in text.split(|c| c == ';' || c == '\n') {
        let row_text = row_text.trim();
        if row_text.is_empty() {
            continue;
        }
        let mut row = Vec::new();
        for part in row_text.split(',') {
            let part = part.trim();
            let id = part
                .parse::<u32>()
                .map_err(|_| format!("Invalid token id: '{}'", part))?;
            row.push(id);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err("No token rows in input".to_string());
    }
    let len = rows[0].len();
    if rows.iter().any(|r| r.len() != len) {
        return Err("All prompt rows must have the same length".to_string());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_input_from_tokens() {
        let result = read_input(Some("5,7"), None, false);
        assert_eq!(result.unwrap(), "5,7");
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("prompt.txt");
        std::fs::write(&file_path, "1,2,3").unwrap();

        let result = read_input(None, Some(&file_path), false);
        assert_eq!(result.unwrap(), "1,2,3");
    }

    #[test]
    fn test_read_input_from_file_not_found() {
        let result = read_input(None, Some(Path::new("/nonexistent/file.txt")), false);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to read file"));
    }

    #[test]
    fn test_read_input_no_source() {
        let result = read_input(None, None, false);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("No input provided"));
    }

    #[test]
    fn test_read_input_tokens_take_priority_over_file() {
        let result = read_input(Some("9"), Some(Path::new("/nonexistent")), false);
        assert_eq!(result.unwrap(), "9");
    }

    #[test]
    fn test_parse_single_row() {
        assert_eq!(parse_token_rows("5,7").unwrap(), vec![vec![5, 7]]);
    }

    #[test]
    fn test_parse_batch_rows() {
        assert_eq!(
            parse_token_rows("5,7;1,2").unwrap(),
            vec![vec![5, 7], vec![1, 2]]
        );
    }

    #[test]
    fn test_parse_newline_separated_rows() {
        assert_eq!(
            parse_token_rows("5, 7\n1, 2\n").unwrap(),
            vec![vec![5, 7], vec![1, 2]]
        );
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let err = parse_token_rows("1,2;3").unwrap_err();
        assert!(err.contains("same length"));
    }

    #[test]
    fn test_parse_rejects_bad_token() {
        let err = parse_token_rows("1,x,3").unwrap_err();
        assert!(err.contains("Invalid token id"));
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(parse_token_rows("  \n ").is_err());
    }

    #[test]
    fn test_init_logging_disabled_does_not_panic() {
        // Just smoke-test: calling with disable=true should not panic
        init_logging(true);
    }
}
