//! Text extraction for uploaded documents.
//!
//! Plain text and markdown are decoded as lossy UTF-8. PDFs are handed to
//! `pdftotext` (poppler-utils) through a temporary file.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use crate::error::{Error, Result};
use crate::logging::{component, subsystem};

/// Upload categories the document store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

impl DocumentKind {
    /// Classify an upload from its name, declared type and leading bytes.
    ///
    /// Returns `None` for anything that is not a PDF, text or markdown file.
    pub fn detect(file_name: &str, content_type: Option<&str>, data: &[u8]) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());

        let sniffed_pdf = infer::get(data).is_some_and(|t| t.mime_type() == "application/pdf");
        if ext.as_deref() == Some("pdf") || declared.as_deref() == Some("application/pdf") || sniffed_pdf
        {
            return Some(DocumentKind::Pdf);
        }

        match (ext.as_deref(), declared.as_deref()) {
            (Some("md") | Some("markdown"), _) | (_, Some("text/markdown")) => {
                Some(DocumentKind::Markdown)
            }
            (Some("txt") | Some("text"), _) | (_, Some("text/plain")) => Some(DocumentKind::Text),
            _ => None,
        }
    }

    /// Extension used for the stored file.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "txt",
            DocumentKind::Markdown => "md",
        }
    }

    /// Canonical MIME type recorded with the document.
    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Text => "text/plain",
            DocumentKind::Markdown => "text/markdown",
        }
    }
}

/// Extract the text content of an upload.
pub async fn extract_text(kind: DocumentKind, data: &[u8]) -> Result<String> {
    match kind {
        DocumentKind::Text | DocumentKind::Markdown => Ok(String::from_utf8_lossy(data).into_owned()),
        DocumentKind::Pdf => extract_pdf(data).await,
    }
}

async fn extract_pdf(data: &[u8]) -> Result<String> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::Extraction(
            "File is not a valid PDF (missing %PDF header)".to_string(),
        ));
    }

    let mut tmpfile = NamedTempFile::new()?;
    tmpfile.write_all(data)?;
    let tmp_path = tmpfile.path().to_string_lossy().to_string();

    let text = run_cmd_with_timeout(
        Command::new("pdftotext").arg(&tmp_path).arg("-"),
        EXTRACTION_CMD_TIMEOUT_SECS,
    )
    .await?;

    debug!(
        subsystem = subsystem::EXTRACTION,
        component = component::PDF_TEXT,
        bytes = data.len(),
        chars = text.len(),
        "PDF text extracted"
    );
    Ok(text)
}

/// Run a command with a timeout, returning stdout.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| Error::Extraction(format!("External command timed out after {}s", timeout_secs)))?
        .map_err(|e| Error::Extraction(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
