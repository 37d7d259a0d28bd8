use std::path::Path;

use tokio::task::JoinError;
use tracing::error;

use super::AnalysisError;

/// Plain text from an uploaded resume. PDFs go through `pdf-extract`; `.txt`
/// files are decoded as UTF-8 with invalid sequences replaced.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, AnalysisError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| AnalysisError::Extraction {
            filename: filename.to_string(),
            message: e.to_string(),
        }),
        "txt" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(AnalysisError::UnsupportedFormat(filename.to_string())),
    }
}

/// Runs `extract_text` on the blocking pool. A parser panic on a malformed file
/// is reported as an extraction failure of that file.
pub async fn extract_text_blocking(bytes: Vec<u8>, filename: String) -> Result<String, AnalysisError> {
    run_extraction(filename, move |name| extract_text(&bytes, name)).await
}

async fn run_extraction<F>(filename: String, extract: F) -> Result<String, AnalysisError>
where
    F: FnOnce(&str) -> Result<String, AnalysisError> + Send + 'static,
{
    let name = filename.clone();
    tokio::task::spawn_blocking(move || extract(&name))
        .await
        .unwrap_or_else(|e| Err(join_failure(filename, e)))
}

fn join_failure(filename: String, e: JoinError) -> AnalysisError {
    let message = if e.is_panic() {
        error!("Text extraction panicked on {filename}");
        "the file could not be parsed".to_string()
    } else {
        e.to_string()
    };
    AnalysisError::Extraction { filename, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txt_is_decoded_lossily() {
        let text = extract_text(b"Jane Doe\nRust \xff engineer", "Resume.TXT").unwrap();
        assert!(text.starts_with("Jane Doe\nRust "));
        assert!(text.contains('\u{fffd}'));
    }

    #[tokio::test]
    async fn test_extractor_panic_becomes_extraction_error() {
        let result = run_extraction("broken.pdf".to_string(), |_| -> Result<String, AnalysisError> {
            panic!("unexpected token in xref table")
        })
        .await;

        match result {
            Err(AnalysisError::Extraction { filename, message }) => {
                assert_eq!(filename, "broken.pdf");
                assert!(!message.contains("xref"));
            }
            other => panic!("expected Extraction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blocking_extraction_reads_txt() {
        let text = extract_text_blocking(b"Jane Doe".to_vec(), "cv.txt".to_string())
            .await
            .unwrap();
        assert_eq!(text, "Jane Doe");
    }

    #[test]
    fn test_other_extensions_are_unsupported() {
        for name in ["resume.docx", "resume", "resume.pdf.exe"] {
            assert!(matches!(
                extract_text(b"data", name),
                Err(AnalysisError::UnsupportedFormat(_))
            ));
        }
    }
}
