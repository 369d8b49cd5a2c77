//! Build a shared-file response body

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sealshare_core::{ShareError, ShareResult};
use uuid::Uuid;

use crate::{Envelope, OCTET_STREAM};

const MAX_BOUNDARY_LEN: usize = 70;
const BASE64_LINE_LEN: usize = 76;

/// A fresh boundary token that cannot collide with JSON or base64 text.
pub fn generate_boundary() -> String {
    format!("sealshare-{}", Uuid::new_v4().simple())
}

/// `Content-Type` header value announcing `boundary`.
pub fn content_type_for(boundary: &str) -> String {
    format!("multipart/mixed; boundary={boundary}")
}

/// Serialize `envelope` as a three-section multipart body delimited by `boundary`.
pub fn encode(envelope: &Envelope, boundary: &str) -> ShareResult<Vec<u8>> {
    validate_boundary(boundary)?;
    let delimiter = format!("--{boundary}");

    let permissions = to_json(&envelope.permissions, "permissions")?;
    let metadata = to_json(&envelope.metadata, "metadata")?;
    for (what, json) in [("permissions", &permissions), ("metadata", &metadata)] {
        if json.contains(&delimiter) {
            return Err(ShareError::MalformedEnvelope(format!(
                "{what} JSON contains the boundary {boundary:?}"
            )));
        }
    }

    let encoded = STANDARD.encode(&envelope.encrypted_file);
    let mut out = String::with_capacity(encoded.len() + permissions.len() + metadata.len() + 512);

    for json in [&permissions, &metadata] {
        out.push_str(&delimiter);
        out.push_str("\r\nContent-Type: application/json\r\n\r\n");
        out.push_str(json);
        out.push_str("\r\n");
    }

    out.push_str(&delimiter);
    out.push_str("\r\nContent-Type: ");
    out.push_str(OCTET_STREAM);
    out.push_str("\r\nContent-Transfer-Encoding: base64\r\n\r\n");
    // base64 output is pure ASCII, so byte-chunking never splits a char
    for line in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
        out.push_str("\r\n");
    }
    out.push_str(&delimiter);
    out.push_str("--\r\n");

    Ok(out.into_bytes())
}

/// RFC 2046 boundary: 1..=70 chars from the `bchars` set, not ending in a space.
fn validate_boundary(boundary: &str) -> ShareResult<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c);
    if boundary.is_empty()
        || boundary.len() > MAX_BOUNDARY_LEN
        || boundary.ends_with(' ')
        || !boundary.chars().all(allowed)
    {
        return Err(ShareError::MalformedEnvelope(format!(
            "invalid boundary {boundary:?}"
        )));
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> ShareResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ShareError::MalformedEnvelope(format!("serializing {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, decode_response};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use sealshare_core::{FileMetadata, FileOwner, FilePermissions};

    fn envelope(encrypted_file: Vec<u8>) -> Envelope {
        Envelope {
            permissions: FilePermissions {
                can_view: true,
                can_download: true,
                encrypted_file_key: "d3JhcHBlZA==".into(),
                expires_at: Utc.with_ymd_and_hms(2031, 6, 1, 12, 0, 0).unwrap(),
            },
            metadata: FileMetadata {
                name: "report.pdf".into(),
                mimetype: "application/pdf".into(),
                size: encrypted_file.len() as u64,
                hash: "ab".repeat(32),
                owner: FileOwner {
                    name: "Rui Costa".into(),
                    username: "rcosta".into(),
                },
            },
            encrypted_file,
        }
    }

    #[test]
    fn test_generated_boundaries_are_distinct_and_valid() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        validate_boundary(&a).unwrap();
    }

    #[test]
    fn test_content_type_round_trips_through_parser() {
        let boundary = generate_boundary();
        let header = content_type_for(&boundary);
        assert_eq!(crate::boundary_from_content_type(&header).unwrap(), boundary);
    }

    #[test]
    fn test_encoded_body_decodes() {
        let original = envelope(vec![9; 300]);
        let boundary = generate_boundary();
        let raw = encode(&original, &boundary).unwrap();

        let decoded = decode_response(&raw, &content_type_for(&boundary)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_long_ciphertext_is_line_wrapped() {
        let raw = encode(&envelope(vec![1; 1000]), "B").unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.lines().filter(|line| line.len() == BASE64_LINE_LEN).count() >= 10);
    }

    #[test]
    fn test_boundary_inside_json_is_refused() {
        let mut env = envelope(vec![1, 2, 3]);
        env.metadata.name = "--X.txt".into();
        assert!(matches!(
            encode(&env, "X"),
            Err(ShareError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_invalid_boundaries_are_refused() {
        let env = envelope(vec![1]);
        let long = "x".repeat(71);
        for bad in ["", "has\r\nnewline", "trailing ", long.as_str()] {
            assert!(encode(&env, bad).is_err(), "accepted {bad:?}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn ciphertext_containing_the_boundary_survives(
            mut bytes in proptest::collection::vec(any::<u8>(), 0..2048),
            at in any::<prop::sample::Index>(),
        ) {
            let splice = b"\r\n--X\r\nContent-Type: application/json\r\n\r\n--X--";
            let pos = at.index(bytes.len() + 1);
            let tail = bytes.split_off(pos);
            bytes.extend_from_slice(splice);
            bytes.extend(tail);

            let raw = encode(&envelope(bytes.clone()), "X").unwrap();
            let decoded = decode(&raw, "X").unwrap();
            prop_assert_eq!(decoded.encrypted_file, bytes);
        }
    }
}
