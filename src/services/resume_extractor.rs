//! Resume text extraction.
//!
//! The file type is decided from the leading bytes, never from the
//! uploaded file name: PDF and DOCX are read, legacy Word (OLE) files are
//! refused, anything else is accepted only if it is valid UTF-8.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Could not read DOCX: {0}")]
    Docx(String),

    #[error("Legacy .doc files are not supported; please upload PDF or DOCX")]
    LegacyDoc,

    #[error("Unsupported file type")]
    Unsupported,

    #[error("No text could be extracted from the file")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeFormat {
    Pdf,
    Docx,
    LegacyDoc,
    PlainText,
    Unknown,
}

impl ResumeFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "pdf",
            ResumeFormat::Docx => "docx",
            ResumeFormat::LegacyDoc => "doc",
            ResumeFormat::PlainText => "txt",
            ResumeFormat::Unknown => "bin",
        }
    }
}

pub fn sniff_format(data: &[u8]) -> ResumeFormat {
    if data.starts_with(PDF_MAGIC) {
        ResumeFormat::Pdf
    } else if data.starts_with(ZIP_MAGIC) {
        ResumeFormat::Docx
    } else if data.starts_with(OLE_MAGIC) {
        ResumeFormat::LegacyDoc
    } else if !data.is_empty() && std::str::from_utf8(data).is_ok() {
        ResumeFormat::PlainText
    } else {
        ResumeFormat::Unknown
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedResume {
    pub format: ResumeFormat,
    pub text: String,
}

/// Extracts text on a blocking thread; PDF parsing is CPU bound.
pub async fn extract_text(data: bytes::Bytes) -> Result<ExtractedResume, ExtractError> {
    tokio::task::spawn_blocking(move || extract_text_sync(&data))
        .await
        .map_err(|e| ExtractError::Pdf(format!("extraction task failed: {}", e)))?
}

pub fn extract_text_sync(data: &[u8]) -> Result<ExtractedResume, ExtractError> {
    let format = sniff_format(data);
    let raw = match format {
        ResumeFormat::Pdf => pdf_extract::extract_text_from_mem(data)
            .map_err(|e| ExtractError::Pdf(e.to_string()))?,
        ResumeFormat::Docx => extract_docx(data)?,
        ResumeFormat::LegacyDoc => return Err(ExtractError::LegacyDoc),
        ResumeFormat::PlainText => String::from_utf8_lossy(data).into_owned(),
        ResumeFormat::Unknown => return Err(ExtractError::Unsupported),
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(ExtractedResume { format, text })
}

fn extract_docx(data: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("archive has no word/document.xml".into()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    Ok(docx_xml_to_text(&xml))
}

/// One output line per `<w:p>` paragraph, built from its `<w:t>` runs.
fn docx_xml_to_text(xml: &str) -> String {
    static RUN: OnceLock<Regex> = OnceLock::new();
    let run = RUN.get_or_init(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").unwrap());

    xml.split("</w:p>")
        .map(|paragraph| {
            run.captures_iter(paragraph)
                .map(|c| decode_xml_entities(&c[1]))
                .collect::<String>()
        })
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Lines that head a resume section rather than name its owner.
const HEADINGS: &[&str] = &[
    "curriculum vitae",
    "resume",
    "personal details",
    "personal information",
    "contact details",
    "contact information",
    "professional summary",
    "career summary",
    "work experience",
    "professional experience",
];

/// `01.2015 - 12.2018`, `2015-03-01`, `2016 – 2019` and similar.
fn looks_like_date(candidate: &str) -> bool {
    static DATE: OnceLock<Regex> = OnceLock::new();
    let re = DATE.get_or_init(|| {
        let part = r"(?:\d{1,2}[./]\d{1,2}[./]\d{2,4}|\d{1,2}[./]\d{4}|\d{4}[./-]\d{1,2}(?:[./-]\d{1,2})?|(?:19|20)\d{2})";
        Regex::new(&format!(r"^{part}(?:\s*[-–]\s*{part})?$")).unwrap()
    });
    re.is_match(candidate.trim())
}

pub fn extract_contacts(text: &str) -> ContactDetails {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    static PHONE: OnceLock<Regex> = OnceLock::new();
    let email_re = EMAIL.get_or_init(|| {
        Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").unwrap()
    });
    let phone_re = PHONE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").unwrap());

    let email = email_re.find(text).map(|m| m.as_str().to_lowercase());
    let phone = phone_re
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .find(|p| p.chars().filter(|c| c.is_ascii_digit()).count() >= 9 && !looks_like_date(p));

    // The name is usually the first short line made of words only.
    let name = text
        .lines()
        .take(5)
        .map(str::trim)
        .find(|line| {
            let words = line.split_whitespace().count();
            (2..=4).contains(&words)
                && line.len() <= 60
                && !HEADINGS.contains(&line.to_lowercase().as_str())
                && line.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '.' || c == '\'')
        })
        .map(str::to_string);

    ContactDetails { name, email, phone }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::FileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn sniffs_by_magic_bytes() {
        assert_eq!(sniff_format(b"%PDF-1.7 ..."), ResumeFormat::Pdf);
        assert_eq!(sniff_format(b"PK\x03\x04rest"), ResumeFormat::Docx);
        assert_eq!(sniff_format(OLE_MAGIC), ResumeFormat::LegacyDoc);
        assert_eq!(sniff_format(b"Jane Doe\nRust engineer"), ResumeFormat::PlainText);
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0x00]), ResumeFormat::Unknown);
        assert_eq!(sniff_format(b""), ResumeFormat::Unknown);
    }

    #[test]
    fn legacy_doc_is_refused() {
        let mut data = OLE_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 64]);
        assert!(matches!(extract_text_sync(&data), Err(ExtractError::LegacyDoc)));
    }

    #[test]
    fn plain_text_is_normalized() {
        let out = extract_text_sync(b"  Jane   Doe \n\n\n Rust  engineer ").unwrap();
        assert_eq!(out.format, ResumeFormat::PlainText);
        assert_eq!(out.text, "Jane Doe\nRust engineer");
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        assert!(matches!(extract_text_sync(b"   \n  "), Err(ExtractError::Empty)));
    }

    #[test]
    fn reads_docx_paragraphs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Jane</w:t></w:r><w:r><w:t xml:space="preserve"> Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t>R&amp;D &lt;lead&gt;</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let out = extract_text_sync(&docx_bytes(xml)).unwrap();
        assert_eq!(out.format, ResumeFormat::Docx);
        assert_eq!(out.text, "Jane Doe\nR&D <lead>");
    }

    #[test]
    fn zip_without_document_is_a_docx_error() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("other.txt", zip::write::FileOptions::default()).unwrap();
            zip.write_all(b"hello").unwrap();
            zip.finish().unwrap();
        }
        assert!(matches!(extract_text_sync(&buf.into_inner()), Err(ExtractError::Docx(_))));
    }

    #[test]
    fn pulls_contact_details() {
        let text = "Jane Doe\nSenior Engineer\njane.DOE@example.com | +1 (415) 555-0134\n";
        let contacts = extract_contacts(text);
        assert_eq!(contacts.name.as_deref(), Some("Jane Doe"));
        assert_eq!(contacts.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(contacts.phone.as_deref(), Some("+1 (415) 555-0134"));
    }

    #[test]
    fn date_ranges_are_not_phone_numbers() {
        let text = "Curriculum Vitae\nMaria Silva\nBackend developer 01.2015 - 12.2018\n";
        let contacts = extract_contacts(text);
        assert_eq!(contacts.phone, None);
        assert_eq!(contacts.name.as_deref(), Some("Maria Silva"));

        let text = "Maria Silva\n2012-09-01 - 2016-06-30 University of Porto\nPhone: +351 912 345 678\n";
        assert_eq!(extract_contacts(text).phone.as_deref(), Some("+351 912 345 678"));
    }

    #[test]
    fn date_shapes() {
        assert!(looks_like_date("01.2015 - 12.2018"));
        assert!(looks_like_date("2015-03-01"));
        assert!(looks_like_date("2016 – 2019"));
        assert!(looks_like_date("12.05.2018-30.06.2020"));
        assert!(!looks_like_date("+1 (415) 555-0134"));
        assert!(!looks_like_date("415.555.0134"));
    }

    #[test]
    fn missing_contacts_stay_none() {
        let contacts = extract_contacts("Summary: 10 years building compilers and databases");
        assert_eq!(contacts, ContactDetails::default());
    }
}
