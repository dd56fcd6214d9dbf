use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound email as forwarded by the mail provider's webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEmailPayload {
    pub from: String,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, alias = "body")]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundAttachment {
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Base64 encoded file content.
    pub content: String,
}

impl InboundAttachment {
    pub fn looks_like_resume(&self) -> bool {
        let name = self.filename.to_ascii_lowercase();
        let by_name = [".pdf", ".docx", ".doc", ".txt"].iter().any(|ext| name.ends_with(ext));
        let by_type = self
            .content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct == "application/pdf" || ct.contains("wordprocessingml") || ct == "application/msword"
            })
            .unwrap_or(false);
        by_name || by_type
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEmailResponse {
    pub inbound_email_id: Uuid,
    pub candidate_id: Option<Uuid>,
    pub candidate_created: bool,
    pub resume_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_error: Option<String>,
}

/// Splits `Jane Doe <jane@example.com>` into display name and address.
pub fn parse_address(raw: &str) -> (Option<String>, String) {
    let raw = raw.trim();
    if let (Some(start), Some(end)) = (raw.rfind('<'), raw.rfind('>')) {
        if start < end {
            let address = raw[start + 1..end].trim().to_string();
            let name = raw[..start].trim().trim_matches('"').trim();
            let name = (!name.is_empty()).then(|| name.to_string());
            return (name, address);
        }
    }
    (None, raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_name_and_address() {
        assert_eq!(
            parse_address("\"Jane Doe\" <Jane@Example.com>"),
            (Some("Jane Doe".to_string()), "Jane@Example.com".to_string())
        );
        assert_eq!(parse_address(" jane@example.com "), (None, "jane@example.com".to_string()));
        assert_eq!(parse_address("<jane@example.com>"), (None, "jane@example.com".to_string()));
    }

    #[test]
    fn detects_resume_attachments() {
        let pdf = InboundAttachment {
            filename: "CV.PDF".into(),
            content_type: None,
            content: String::new(),
        };
        let by_type = InboundAttachment {
            filename: "attachment".into(),
            content_type: Some(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document".into(),
            ),
            content: String::new(),
        };
        let image = InboundAttachment {
            filename: "photo.png".into(),
            content_type: Some("image/png".into()),
            content: String::new(),
        };
        assert!(pdf.looks_like_resume());
        assert!(by_type.looks_like_resume());
        assert!(!image.looks_like_resume());
    }
}
