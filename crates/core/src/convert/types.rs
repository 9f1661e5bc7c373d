//! Request, option and outcome types for a single conversion.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::engine::EngineError;

/// Source MIME type accepted by the service.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Page-layout recognition strategy requested from the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    /// Reflowable output; paragraphs follow the text flow.
    #[default]
    Flow,
    /// Positioned text boxes mirroring the page layout.
    Textbox,
}

impl RecognitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Textbox => "textbox",
        }
    }
}

/// Validated recognition options handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub mode: RecognitionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognize_bullets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_horizontal_proximity: Option<f64>,
}

impl ConversionOptions {
    /// Reduced option set used by the fallback attempt: flow mode, no refinements.
    pub fn fallback() -> Self {
        Self {
            mode: RecognitionMode::Flow,
            recognize_bullets: None,
            relative_horizontal_proximity: None,
        }
    }
}

/// Target side of a supported `pdf-to-*` conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    Docx,
    Doc,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 2] = [TargetFormat::Docx, TargetFormat::Doc];

    /// Parses a route segment such as `pdf-to-docx`.
    pub fn from_pair(pair: &str) -> Option<Self> {
        let target = pair.strip_prefix("pdf-to-")?;
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(target))
    }

    /// The route segment for this conversion.
    pub fn pair(&self) -> &'static str {
        match self {
            Self::Docx => "pdf-to-docx",
            Self::Doc => "pdf-to-doc",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Doc => "doc",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
        }
    }

    /// Upper-case display name used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Docx => "DOCX",
            Self::Doc => "DOC",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pair())
    }
}

/// One uploaded document together with what the client declared about it.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub document: Bytes,
    pub content_type: String,
    pub declared_len: u64,
    pub file_name: Option<String>,
    pub raw_options: String,
}

impl ConversionRequest {
    /// Name of the converted file: a trailing `.pdf` is swapped for the target
    /// extension, anything else gets the extension appended.
    pub fn output_file_name(&self, target: TargetFormat) -> String {
        output_file_name(self.file_name.as_deref(), target)
    }
}

pub fn output_file_name(input: Option<&str>, target: TargetFormat) -> String {
    let ext = target.extension();
    let name = match input.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return format!("converted.{}", ext),
    };

    let stem_len = name.len().saturating_sub(4);
    if name.is_char_boundary(stem_len) && name[stem_len..].eq_ignore_ascii_case(".pdf") {
        format!("{}.{}", &name[..stem_len], ext)
    } else {
        format!("{}.{}", name, ext)
    }
}

/// Result of one guarded conversion.
#[derive(Debug)]
pub enum ConversionOutcome {
    /// Converted document bytes, from the primary or the fallback attempt.
    Success(Vec<u8>),
    /// The primary attempt exceeded its time bound.
    TimedOut { after: Duration },
    /// The engine failed and no fallback could rescue the request.
    EngineFailure(EngineError),
    /// The breaker rejected the attempt before the engine was contacted.
    CircuitOpen { retry_in: Duration },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::TimedOut { .. } => "timed_out",
            Self::EngineFailure(_) => "engine_failure",
            Self::CircuitOpen { .. } => "circuit_open",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_pair() {
        assert_eq!(TargetFormat::from_pair("pdf-to-docx"), Some(TargetFormat::Docx));
        assert_eq!(TargetFormat::from_pair("pdf-to-DOC"), Some(TargetFormat::Doc));
        assert_eq!(TargetFormat::from_pair("pdf-to-xlsx"), None);
        assert_eq!(TargetFormat::from_pair("docx-to-pdf"), None);
        assert_eq!(TargetFormat::from_pair(""), None);
    }

    #[test]
    fn test_pair_round_trips_through_route_segment() {
        for format in TargetFormat::ALL {
            assert_eq!(TargetFormat::from_pair(format.pair()), Some(format));
        }
    }

    #[test]
    fn test_output_file_name_replaces_pdf_extension() {
        assert_eq!(
            output_file_name(Some("report.pdf"), TargetFormat::Docx),
            "report.docx"
        );
        assert_eq!(
            output_file_name(Some("SCAN.PDF"), TargetFormat::Doc),
            "SCAN.doc"
        );
    }

    #[test]
    fn test_output_file_name_appends_when_not_pdf() {
        assert_eq!(
            output_file_name(Some("notes"), TargetFormat::Docx),
            "notes.docx"
        );
        assert_eq!(
            output_file_name(Some("archive.pdf.bak"), TargetFormat::Docx),
            "archive.pdf.bak.docx"
        );
    }

    #[test]
    fn test_output_file_name_defaults_when_missing() {
        assert_eq!(output_file_name(None, TargetFormat::Docx), "converted.docx");
        assert_eq!(output_file_name(Some("  "), TargetFormat::Doc), "converted.doc");
    }

    #[test]
    fn test_output_file_name_multibyte() {
        assert_eq!(
            output_file_name(Some("résumé.pdf"), TargetFormat::Docx),
            "résumé.docx"
        );
        assert_eq!(output_file_name(Some("日本"), TargetFormat::Docx), "日本.docx");
    }

    #[test]
    fn test_fallback_options_drop_refinements() {
        let fallback = ConversionOptions::fallback();
        assert_eq!(fallback.mode, RecognitionMode::Flow);
        assert!(fallback.recognize_bullets.is_none());
        assert!(fallback.relative_horizontal_proximity.is_none());
    }
}
