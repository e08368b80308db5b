use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::export::pipeline::{ExportOutcome, ExportedPdf};
use crate::state::AppState;
use crate::tenant::handlers::load_or_not_found;

/// Identifies the browser session an export belongs to.
pub const SESSION_HEADER: &str = "x-session-id";

/// POST /api/v1/tenants/:key/resume/export
pub async fn handle_export_resume(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Missing {SESSION_HEADER} header")))?;

    let bundle = load_or_not_found(&state, &key).await?;
    match state.exporter.export(session, &bundle).await? {
        ExportOutcome::Ready(pdf) => pdf_response(pdf),
        ExportOutcome::Ignored => Err(AppError::ExportInProgress),
    }
}

fn pdf_response(pdf: ExportedPdf) -> Result<Response, AppError> {
    let disposition = HeaderValue::from_str(&content_disposition(&pdf.filename))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid Content-Disposition: {e}")))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.bytes,
    )
        .into_response())
}

/// `attachment` with an ASCII `filename` and, for names outside ASCII, an
/// RFC 5987 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    if ascii == filename {
        return format!("attachment; filename=\"{ascii}\"");
    }

    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect();
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_disposition() {
        assert_eq!(
            content_disposition("Ada_Lovelace_Resume.pdf"),
            "attachment; filename=\"Ada_Lovelace_Resume.pdf\""
        );
    }

    #[test]
    fn test_non_ascii_disposition_is_encoded() {
        let value = content_disposition("José_Resume.pdf");
        assert_eq!(
            value,
            "attachment; filename=\"Jos__Resume.pdf\"; filename*=UTF-8''Jos%C3%A9_Resume.pdf"
        );
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[test]
    fn test_quotes_are_replaced() {
        assert_eq!(
            content_disposition("A\"B.pdf"),
            "attachment; filename=\"A_B.pdf\"; filename*=UTF-8''A%22B.pdf"
        );
    }
}
