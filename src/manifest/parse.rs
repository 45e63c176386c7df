//! Manifest file parsing.
//!
//! Reads the main section of a `MANIFEST.MF` style file: `Name: value`
//! lines, where a line starting with a single space continues the previous
//! value. The main section ends at the first blank line.

use crate::module::Headers;

/// Parse manifest text into headers. The error is a human-readable message.
pub fn parse_manifest(text: &str) -> std::result::Result<Headers, String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut headers = Headers::new();
    let mut current: Option<(String, String)> = None;

    for (number, line) in text.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(continuation) = line.strip_prefix(' ') {
            match current.as_mut() {
                Some((_, value)) => value.push_str(continuation),
                None => {
                    return Err(format!(
                        "line {}: continuation without a header",
                        number + 1
                    ))
                }
            }
            continue;
        }

        if let Some((key, value)) = current.take() {
            headers.insert(key, value.trim().to_string());
        }

        if line.trim().is_empty() {
            break;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| format!("line {}: missing ':' in \"{}\"", number + 1, line))?;
        let key = key.trim();
        if key.is_empty() || key.contains(' ') {
            return Err(format!("line {}: invalid header name \"{}\"", number + 1, key));
        }
        current = Some((key.to_string(), value.strip_prefix(' ').unwrap_or(value).to_string()));
    }

    if let Some((key, value)) = current {
        headers.insert(key, value.trim().to_string());
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_headers() {
        let headers = parse_manifest(
            "Manifest-Version: 1.0\nBundle-SymbolicName: org.example\nBundle-Version: 1.0.0\n",
        )
        .unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Bundle-SymbolicName"), Some("org.example"));
    }

    #[test]
    fn joins_continuation_lines() {
        let headers = parse_manifest(
            "Import-Package: org.a,\r\n org.b;version=\"[1,\r\n 2)\"\r\nBundle-SymbolicName: x\r\n",
        )
        .unwrap();
        assert_eq!(
            headers.get("Import-Package"),
            Some("org.a,org.b;version=\"[1,2)\"")
        );
        assert_eq!(headers.get("Bundle-SymbolicName"), Some("x"));
    }

    #[test]
    fn stops_at_first_blank_line() {
        let headers =
            parse_manifest("Bundle-SymbolicName: x\n\nName: some/entry\nSHA-256-Digest: abc\n")
                .unwrap();
        assert_eq!(headers.len(), 1);
        assert!(!headers.contains_key("Name"));
    }

    #[test]
    fn strips_byte_order_mark() {
        let headers = parse_manifest("\u{feff}Bundle-SymbolicName: x").unwrap();
        assert_eq!(headers.get("Bundle-SymbolicName"), Some("x"));
    }

    #[test]
    fn rejects_line_without_colon() {
        let err = parse_manifest("Bundle-SymbolicName: x\nnot a header\n").unwrap_err();
        assert!(err.contains("line 2"));
    }

    #[test]
    fn rejects_leading_continuation() {
        assert!(parse_manifest(" dangling\n").is_err());
    }

    #[test]
    fn empty_text_yields_no_headers() {
        assert!(parse_manifest("").unwrap().is_empty());
    }
}
