//! Transcript representations and content negotiation.

/// Media type of the plain text transcript.
pub const TEXT_MEDIA_TYPE: &str = "text/plain";
/// Media type of the hOCR transcript.
pub const HTML_MEDIA_TYPE: &str = "text/html";

/// One of the two transcript representations derived from a page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptVariant {
    /// Plain text, the engine's default output
    Text,
    /// hOCR markup
    Html,
}

impl TranscriptVariant {
    pub const ALL: [TranscriptVariant; 2] = [TranscriptVariant::Text, TranscriptVariant::Html];

    /// File extension the engine appends to the output stem.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Html => "html",
        }
    }

    /// Engine format selector, if any. Text uses the engine default.
    pub fn format_selector(self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Html => Some("hocr"),
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Text => TEXT_MEDIA_TYPE,
            Self::Html => HTML_MEDIA_TYPE,
        }
    }

    /// `Content-Type` header value for responses.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain;charset=utf-8",
            Self::Html => "text/html;charset=utf-8",
        }
    }
}

impl std::fmt::Display for TranscriptVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Html => write!(f, "html"),
        }
    }
}

impl std::str::FromStr for TranscriptVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" | "plain" => Ok(Self::Text),
            "html" | "hocr" => Ok(Self::Html),
            other => Err(format!("unknown transcript format '{other}' (expected text or html)")),
        }
    }
}

/// Select a representation from an `Accept` header value.
///
/// HTML is preferred when both are listed. Wildcard ranges select nothing;
/// the client has to name a representation.
pub fn negotiate(accept: Option<&str>) -> Option<TranscriptVariant> {
    let accept = accept?;

    let mut wants_text = false;
    for range in accept.split(',') {
        let media = range.split(';').next().unwrap_or("").trim();
        if media.eq_ignore_ascii_case(HTML_MEDIA_TYPE) {
            return Some(TranscriptVariant::Html);
        }
        if media.eq_ignore_ascii_case(TEXT_MEDIA_TYPE) {
            wants_text = true;
        }
    }

    wants_text.then_some(TranscriptVariant::Text)
}
