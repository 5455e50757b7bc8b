use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};

// The XML declaration must fit in the first bytes of the document.
const DECLARATION_SCAN_LIMIT: usize = 1024;

/// Decodes a response body, picking the charset from the XML declaration,
/// then the `Content-Type` header, then UTF-8.
pub fn decode(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = discover_encoding(body, content_type);
    let (text, actual, had_errors) = encoding.decode(body);

    if had_errors {
        warn!(
            "Response contained bytes that are invalid in {}",
            actual.name()
        );
    }

    text.into_owned()
}

pub fn discover_encoding(body: &[u8], content_type: Option<&str>) -> &'static Encoding {
    let label = declared_encoding(body).or_else(|| content_type.and_then(charset_param));

    let Some(label) = label else {
        return UTF_8;
    };

    Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
        warn!("Unknown response encoding '{label}', falling back to UTF-8");
        UTF_8
    })
}

fn declared_encoding(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(DECLARATION_SCAN_LIMIT)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();

    let declaration = head.strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];

    let (_, rest) = declaration.split_once("encoding")?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    let value = &rest[..rest.find(quote)?];

    debug!("XML declaration requests encoding {value}");
    Some(value.trim().to_string()).filter(|v| !v.is_empty())
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16LE, WINDOWS_1252};

    #[test]
    fn test_declaration_wins_over_content_type() {
        let body = br#"<?xml version="1.0" encoding="ISO-8859-1"?><build/>"#;

        let encoding = discover_encoding(body, Some("application/xml; charset=UTF-16LE"));

        // WHATWG maps ISO-8859-1 onto windows-1252.
        assert_eq!(encoding, WINDOWS_1252);
    }

    #[test]
    fn test_declaration_with_single_quotes() {
        let body = b"<?xml version='1.0' encoding='windows-1252' standalone='yes'?><build/>";

        assert_eq!(discover_encoding(body, None), WINDOWS_1252);
    }

    #[test]
    fn test_content_type_charset_used_without_declaration() {
        let body = br#"<?xml version="1.0"?><build/>"#;

        let encoding = discover_encoding(body, Some("text/xml;charset=\"utf-16le\""));

        assert_eq!(encoding, UTF_16LE);
    }

    #[test]
    fn test_defaults_to_utf8() {
        assert_eq!(discover_encoding(b"<build/>", None), UTF_8);
        assert_eq!(discover_encoding(b"<build/>", Some("application/xml")), UTF_8);
    }

    #[test]
    fn test_unknown_label_falls_back_to_utf8() {
        let body = br#"<?xml version="1.0" encoding="klingon"?><build/>"#;

        assert_eq!(discover_encoding(body, None), UTF_8);
    }

    #[test]
    fn test_encoding_outside_declaration_is_ignored() {
        let body = br#"<build><note>encoding="windows-1252"</note></build>"#;

        assert_eq!(discover_encoding(body, None), UTF_8);
    }

    #[test]
    fn test_decode_latin1_body() {
        let mut body = br#"<?xml version="1.0" encoding="ISO-8859-1"?><build name=""#.to_vec();
        body.push(0xE9);
        body.extend_from_slice(br#""/>"#);

        let text = decode(&body, None);

        assert!(text.ends_with("<build name=\"\u{e9}\"/>"));
    }
}
