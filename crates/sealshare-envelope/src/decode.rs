//! Split a shared-file response into permissions, metadata, and ciphertext

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sealshare_core::config::EnvelopeConfig;
use sealshare_core::{FileMetadata, FilePermissions, ShareError, ShareResult};
use serde::de::DeserializeOwned;

use crate::Envelope;

const SECTION_COUNT: usize = 3;

/// Envelope decoder with size and content-type policy.
#[derive(Debug, Clone)]
pub struct Decoder {
    max_bytes: u64,
    binary_content_type: String,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::from_config(&EnvelopeConfig::default())
    }
}

impl Decoder {
    pub fn from_config(config: &EnvelopeConfig) -> Self {
        Self {
            max_bytes: config.max_envelope_bytes,
            binary_content_type: config.binary_content_type.clone(),
        }
    }

    /// Decode a response whose boundary is carried in its `Content-Type` header.
    pub fn decode_response(&self, raw: &[u8], content_type: &str) -> ShareResult<Envelope> {
        let boundary = boundary_from_content_type(content_type)?;
        self.decode(raw, &boundary)
    }

    /// Decode `raw` using `boundary` as the section delimiter token.
    pub fn decode(&self, raw: &[u8], boundary: &str) -> ShareResult<Envelope> {
        if raw.len() as u64 > self.max_bytes {
            return Err(malformed(format!(
                "response body is {} bytes (limit {})",
                raw.len(),
                self.max_bytes
            )));
        }
        if boundary.is_empty() {
            return Err(malformed("empty boundary"));
        }

        let text = std::str::from_utf8(raw)
            .map_err(|e| malformed(format!("response body is not UTF-8 text: {e}")))?;

        let delimiter = format!("--{boundary}");
        if !text.contains(&delimiter) {
            return Err(malformed("boundary not found in response body"));
        }

        let sections = split_sections(text, &delimiter)?;
        if sections.len() != SECTION_COUNT {
            return Err(malformed(format!(
                "expected {SECTION_COUNT} sections, found {}",
                sections.len()
            )));
        }

        let permissions: FilePermissions = parse_json(&sections[0], "permissions")?;
        let metadata: FileMetadata = parse_json(&sections[1], "metadata")?;
        let encrypted_file = self.decode_file_section(&sections[2])?;

        tracing::debug!(
            file = %metadata.name,
            ciphertext_len = encrypted_file.len(),
            "envelope decoded"
        );

        Ok(Envelope {
            permissions,
            metadata,
            encrypted_file,
        })
    }

    fn decode_file_section(&self, section: &Section<'_>) -> ShareResult<Vec<u8>> {
        let declared = section
            .header("content-type")
            .map(media_type_essence)
            .unwrap_or_default();
        if !declared.eq_ignore_ascii_case(&self.binary_content_type) {
            return Err(malformed(format!(
                "file section must declare {}, got {:?}",
                self.binary_content_type, declared
            )));
        }

        if let Some(encoding) = section.header("content-transfer-encoding") {
            if !encoding.eq_ignore_ascii_case("base64") {
                return Err(malformed(format!(
                    "file section must be base64 transfer-encoded, got {encoding:?}"
                )));
            }
        }

        let compact: String = section
            .body
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD
            .decode(compact)
            .map_err(|e| malformed(format!("file section is not valid base64: {e}")))
    }
}

/// Decode with default limits.
pub fn decode(raw: &[u8], boundary: &str) -> ShareResult<Envelope> {
    Decoder::default().decode(raw, boundary)
}

/// Decode with default limits, taking the boundary from `content_type`.
pub fn decode_response(raw: &[u8], content_type: &str) -> ShareResult<Envelope> {
    Decoder::default().decode_response(raw, content_type)
}

/// Extract the `boundary` parameter from a multipart `Content-Type` header.
pub fn boundary_from_content_type(content_type: &str) -> ShareResult<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| malformed("boundary not found in Content-Type header"))
}

struct Section<'a> {
    headers: Vec<(String, &'a str)>,
    body: &'a str,
}

impl<'a> Section<'a> {
    fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }
}

fn split_sections<'a>(text: &'a str, delimiter: &str) -> ShareResult<Vec<Section<'a>>> {
    let mut sections = Vec::new();

    // The first piece is the preamble before the opening delimiter
    for part in text.split(delimiter).skip(1) {
        // A close delimiter (`--boundary--`) ends the body; anything after is epilogue
        if part.starts_with("--") {
            break;
        }
        if part.trim().is_empty() {
            continue;
        }

        let part = part
            .strip_prefix("\r\n")
            .or_else(|| part.strip_prefix('\n'))
            .unwrap_or(part);
        let (head, body) = split_head_body(part).ok_or_else(|| {
            malformed(format!(
                "section {} has no blank line between headers and body",
                sections.len() + 1
            ))
        })?;

        let headers = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim()))
            .collect();

        sections.push(Section {
            headers,
            body: body.trim(),
        });
    }

    Ok(sections)
}

/// Split at the first blank line. A part that opens with a blank line has no headers.
fn split_head_body(part: &str) -> Option<(&str, &str)> {
    if let Some(body) = part.strip_prefix("\r\n") {
        return Some(("", body));
    }
    if let Some(body) = part.strip_prefix('\n') {
        return Some(("", body));
    }

    let crlf = part.find("\r\n\r\n").map(|at| (at, 4));
    let lf = part.find("\n\n").map(|at| (at, 2));
    let (at, len) = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    Some((&part[..at], &part[at + len..]))
}

fn parse_json<T: DeserializeOwned>(section: &Section<'_>, what: &str) -> ShareResult<T> {
    serde_json::from_str(section.body)
        .map_err(|e| malformed(format!("{what} section is not valid JSON: {e}")))
}

fn media_type_essence(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}

fn malformed(msg: impl Into<String>) -> ShareError {
    ShareError::MalformedEnvelope(msg.into())
}
