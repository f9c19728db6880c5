use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};

/// Decodes a streamed response body to text as chunks arrive.
///
/// A character split across chunk boundaries is held back inside the
/// decoder until the rest of it arrives; malformed bytes become U+FFFD.
pub struct StreamDecoder {
    decoder: Decoder,
    text: String,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(UTF_8)
    }
}

impl StreamDecoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            text: String::new(),
        }
    }

    /// Uses the `charset` of a `Content-Type` header, falling back to UTF-8.
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        let encoding = content_type
            .and_then(extract_charset)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        Self::new(encoding)
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.decoder.encoding()
    }

    /// Returns true when new text became visible.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        self.decode(chunk, false)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Flushes a truncated trailing sequence as U+FFFD.
    pub fn finish(mut self) -> String {
        self.decode(&[], true);
        self.text
    }

    fn decode(&mut self, mut src: &[u8], last: bool) -> bool {
        let before = self.text.len();
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len().saturating_mul(3).saturating_add(4));
            self.text.reserve(needed);
            let (result, read, _had_errors) = self.decoder.decode_to_string(src, &mut self.text, last);
            src = &src[read..];
            if result == CoderResult::InputEmpty {
                break;
            }
        }
        self.text.len() != before
    }
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches([' ', '"', '\'']).to_string())
        })
        .next()
}
