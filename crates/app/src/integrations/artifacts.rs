//! Certificate artifact rendering.

use std::collections::BTreeMap;

use mockall::automock;
use serde_json::json;
use thiserror::Error;

use crate::integrations::content_store::Artifact;

/// Everything printed on an issued certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDocument {
    pub certificate_id: String,
    pub student_name: String,
    pub student_email: String,
    pub event_name: String,
    pub event_date: String,
    pub content_hash: String,
    pub token_id: String,
    pub verification_url: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode certificate metadata")]
    Encode(#[from] serde_json::Error),
}

/// Turns certificate fields into uploadable bytes.
#[automock]
pub trait ArtifactRenderer: Send + Sync {
    /// Render `document` into an artifact ready for the content store.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be encoded.
    fn render(&self, document: &CertificateDocument) -> Result<Artifact, RenderError>;
}

/// Renders an NFT-style JSON metadata document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataRenderer;

impl ArtifactRenderer for MetadataRenderer {
    fn render(&self, document: &CertificateDocument) -> Result<Artifact, RenderError> {
        let body = json!({
            "name": format!("{} Certificate", document.event_name),
            "description": format!(
                "Awarded to {} for {} on {}",
                document.student_name, document.event_name, document.event_date
            ),
            "external_url": document.verification_url,
            "attributes": [
                { "trait_type": "Certificate ID", "value": document.certificate_id },
                { "trait_type": "Recipient", "value": document.student_name },
                { "trait_type": "Event", "value": document.event_name },
                { "trait_type": "Date", "value": document.event_date },
                { "trait_type": "Content Hash", "value": document.content_hash },
                { "trait_type": "Token ID", "value": document.token_id },
            ],
        });

        let metadata = BTreeMap::from([
            ("certificateId".to_string(), document.certificate_id.clone()),
            ("studentEmail".to_string(), document.student_email.clone()),
            ("eventName".to_string(), document.event_name.clone()),
        ]);

        Ok(Artifact {
            file_name: format!("{}.json", document.certificate_id),
            content_type: "application/json".to_string(),
            bytes: serde_json::to_vec_pretty(&body)?,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn metadata_document_links_back_to_verification() -> TestResult {
        let document = CertificateDocument {
            certificate_id: "CERT-0011223344556677".to_string(),
            student_name: "Ada Lovelace".to_string(),
            student_email: "ada@campus.edu".to_string(),
            event_name: "Hack Night".to_string(),
            event_date: "2024-03-15".to_string(),
            content_hash: "0xabc".to_string(),
            token_id: "7".to_string(),
            verification_url: "https://campus.example/verify/CERT-0011223344556677".to_string(),
        };

        let artifact = MetadataRenderer.render(&document)?;
        let body: Value = serde_json::from_slice(&artifact.bytes)?;

        assert_eq!(artifact.file_name, "CERT-0011223344556677.json");
        assert_eq!(body["name"], "Hack Night Certificate");
        assert_eq!(body["external_url"], document.verification_url);
        assert_eq!(
            artifact.metadata.get("studentEmail").map(String::as_str),
            Some("ada@campus.edu")
        );

        Ok(())
    }
}
