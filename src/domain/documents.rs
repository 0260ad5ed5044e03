//! Encoded documents and the four upload slots of the wizard.
//!
//! Documents travel through the wizard as data URIs
//! (`data:<mime>;base64,<payload>`), which keeps the persisted state plain
//! JSON. They are decoded back into raw bytes only when the application is
//! submitted.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::errors::DocumentError;

const MEGABYTE: u64 = 1024 * 1024;

const PDF_OR_IMAGE: &[&str] = &["application/pdf", "image/jpeg", "image/png"];
const IMAGE_ONLY: &[&str] = &["image/jpeg", "image/png"];

/// One of the fixed document uploads the registration requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentSlot {
    SupportingDoc,
    Signature,
    MeansOfId,
    Passport,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 4] = [
        DocumentSlot::SupportingDoc,
        DocumentSlot::Signature,
        DocumentSlot::MeansOfId,
        DocumentSlot::Passport,
    ];

    /// Multipart field name expected by the registration backend.
    pub fn field_name(self) -> &'static str {
        match self {
            DocumentSlot::SupportingDoc => "supportingDoc",
            DocumentSlot::Signature => "signature",
            DocumentSlot::MeansOfId => "meansOfId",
            DocumentSlot::Passport => "passport",
        }
    }

    /// Filename attached to the multipart part, independent of the upload.
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentSlot::SupportingDoc => "supportingDoc.pdf",
            DocumentSlot::Signature => "signature.png",
            DocumentSlot::MeansOfId => "meansOfId.pdf",
            DocumentSlot::Passport => "passport.png",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentSlot::SupportingDoc => "Supporting Document",
            DocumentSlot::Signature => "Signature (scanned)",
            DocumentSlot::MeansOfId => "Means of ID (front)",
            DocumentSlot::Passport => "Passport Photo",
        }
    }

    pub fn accepted_types(self) -> &'static [&'static str] {
        match self {
            DocumentSlot::SupportingDoc | DocumentSlot::MeansOfId => PDF_OR_IMAGE,
            DocumentSlot::Signature | DocumentSlot::Passport => IMAGE_ONLY,
        }
    }

    pub fn max_size(self) -> u64 {
        match self {
            DocumentSlot::SupportingDoc | DocumentSlot::MeansOfId => 5 * MEGABYTE,
            DocumentSlot::Signature | DocumentSlot::Passport => 2 * MEGABYTE,
        }
    }

    pub fn index(self) -> usize {
        match self {
            DocumentSlot::SupportingDoc => 0,
            DocumentSlot::Signature => 1,
            DocumentSlot::MeansOfId => 2,
            DocumentSlot::Passport => 3,
        }
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A document held as a well-formed base64 data URI.
///
/// The only ways to obtain one are [`EncodedDocument::parse`] and
/// [`EncodedDocument::from_bytes`], so a value of this type always decodes.
///
/// # Examples
///
/// ```
/// use bnreg::domain::EncodedDocument;
///
/// let doc = EncodedDocument::from_bytes("image/png", &[1, 2, 3]);
/// assert_eq!(doc.as_str(), "data:image/png;base64,AQID");
/// assert_eq!(doc.decode().unwrap(), vec![1, 2, 3]);
/// assert!(EncodedDocument::parse("data:image/png;base64,%%%").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodedDocument {
    uri: String,
    mime: String,
    payload_offset: usize,
}

impl EncodedDocument {
    pub fn parse(uri: &str) -> Result<Self, DocumentError> {
        let rest = uri.strip_prefix("data:").ok_or(DocumentError::NotDataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(DocumentError::NotBase64)?;
        let header = header.strip_suffix(";base64").ok_or(DocumentError::NotBase64)?;
        let mime = header.split(';').next().unwrap_or_default().trim();
        if mime.is_empty() {
            return Err(DocumentError::MissingMediaType);
        }
        if payload.is_empty() {
            return Err(DocumentError::Empty);
        }
        STANDARD
            .decode(payload)
            .map_err(|e| DocumentError::Corrupt(e.to_string()))?;

        Ok(Self {
            uri: uri.to_string(),
            mime: mime.to_ascii_lowercase(),
            payload_offset: uri.len() - payload.len(),
        })
    }

    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let mime = mime.to_ascii_lowercase();
        let prefix = format!("data:{mime};base64,");
        let payload_offset = prefix.len();
        Self {
            uri: prefix + &STANDARD.encode(bytes),
            mime,
            payload_offset,
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn decode(&self) -> Result<Vec<u8>, DocumentError> {
        STANDARD
            .decode(&self.uri[self.payload_offset..])
            .map_err(|e| DocumentError::Corrupt(e.to_string()))
    }
}

impl TryFrom<String> for EncodedDocument {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EncodedDocument> for String {
    fn from(value: EncodedDocument) -> Self {
        value.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_media_type() {
        let doc = EncodedDocument::parse("data:application/pdf;base64,JVBERi0=").unwrap();
        assert_eq!(doc.mime(), "application/pdf");
        assert_eq!(doc.decode().unwrap(), b"%PDF-".to_vec());
    }

    #[test]
    fn test_parse_ignores_media_type_parameters() {
        let doc = EncodedDocument::parse("data:image/png;name=sig.png;base64,AQID").unwrap();
        assert_eq!(doc.mime(), "image/png");
        assert_eq!(doc.decode().unwrap().len(), 3);
    }

    #[test]
    fn test_parse_rejects_malformed_uris() {
        assert_eq!(EncodedDocument::parse("AQID"), Err(DocumentError::NotDataUri));
        assert_eq!(
            EncodedDocument::parse("data:image/png,AQID"),
            Err(DocumentError::NotBase64)
        );
        assert_eq!(
            EncodedDocument::parse("data:;base64,AQID"),
            Err(DocumentError::MissingMediaType)
        );
        assert_eq!(
            EncodedDocument::parse("data:image/png;base64,"),
            Err(DocumentError::Empty)
        );
        assert!(matches!(
            EncodedDocument::parse("data:image/png;base64,AQI"),
            Err(DocumentError::Corrupt(_))
        ));
    }

    #[test]
    fn test_serde_round_trip_rejects_corruption() {
        let doc = EncodedDocument::from_bytes("image/jpeg", b"jpeg bytes");
        let json = serde_json::to_string(&doc).unwrap();
        let back: EncodedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);

        let broken: Result<EncodedDocument, _> = serde_json::from_str("\"data:image/png;base64,@@\"");
        assert!(broken.is_err());
    }

    #[test]
    fn test_slot_contract() {
        assert_eq!(DocumentSlot::Passport.field_name(), "passport");
        assert_eq!(DocumentSlot::Passport.file_name(), "passport.png");
        assert!(DocumentSlot::Signature.accepted_types().contains(&"image/png"));
        assert!(!DocumentSlot::Signature.accepted_types().contains(&"application/pdf"));
        assert_eq!(DocumentSlot::MeansOfId.max_size(), 5 * 1024 * 1024);
        for (i, slot) in DocumentSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }
}
