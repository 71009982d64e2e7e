//! Message envelope: the raw RFC 822 payload in transit
//!
//! The relay never parses message bodies. The only header it looks at
//! is `Message-ID`, extracted with a best-effort scan and used purely
//! for log correlation -- never for deduplication at the destination.

/// A message pulled from the source, on its way to the destination.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The complete RFC 822 message, byte-exact as fetched.
    pub raw: Vec<u8>,
    /// `Message-ID` header value, if one was found.
    pub message_id: Option<String>,
}

impl Envelope {
    /// Wrap a raw payload, extracting the Message-ID for logging.
    #[must_use]
    pub fn new(raw: Vec<u8>) -> Self {
        let message_id = extract_message_id(&raw);
        Self { raw, message_id }
    }

    /// Identifier used in log lines. Falls back to a placeholder when
    /// the message carries no Message-ID header.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        self.message_id.as_deref().unwrap_or("<no-message-id>")
    }
}

/// Scan the header section for a `Message-ID:` header.
///
/// Case-insensitive on the header name; honors folded continuation
/// lines; stops at the blank line separating headers from the body.
fn extract_message_id(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            // End of the header section.
            return None;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.eq_ignore_ascii_case("message-id") {
            continue;
        }
        let mut id = value.trim().to_string();
        // RFC 5322 folding: continuation lines start with whitespace.
        for cont in lines.by_ref() {
            if cont.starts_with(' ') || cont.starts_with('\t') {
                id.push_str(cont.trim());
            } else {
                break;
            }
        }
        if id.is_empty() {
            return None;
        }
        return Some(id);
    }
    None
}
