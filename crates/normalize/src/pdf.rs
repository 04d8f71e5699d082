/// Result of extracting text from a PDF's raw bytes.
#[derive(Clone, Debug, Default)]
pub struct ExtractedPdf {
    pub text: String,
    pub pages_extracted: usize,
    /// Best-effort numeric table rows found via the line-grouping
    /// heuristic, present when the page text looks tabular.
    pub table_rows: Vec<String>,
}

/// Extract text from PDF bytes, stopping at `max_pages` (spec §4.5: "page-
/// by-page text extraction up to a page cap"). `pdf-extract` emits a form-
/// feed (`\x0c`) between pages, which this uses as the page boundary —
/// the same convention `pdftotext` output follows, so splitting on it is
/// a reliable page-cap mechanism without needing per-page API access.
pub fn extract_pdf_text(bytes: &[u8], max_pages: usize) -> ExtractedPdf {
    let raw = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "pdf text extraction failed");
            return ExtractedPdf::default();
        }
    };

    let pages: Vec<&str> = raw.split('\u{0c}').collect();
    let capped: Vec<&str> = pages.into_iter().take(max_pages.max(1)).collect();
    let pages_extracted = capped.len();
    let text = capped.join("\n\n");
    let table_rows = extract_numeric_rows(&text);

    ExtractedPdf { text, pages_extracted, table_rows }
}

/// Best-effort table extraction: group consecutive lines that each carry
/// two or more numeric tokens, on the theory that a data table's rows
/// look like this even without real column/structure detection (spec
/// §4.5, matching the original's pragmatic line-grouping approach rather
/// than a full table-structure parser).
fn extract_numeric_rows(text: &str) -> Vec<String> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let numeric_tokens = line.split_whitespace().filter(|tok| looks_numeric(tok)).count();
        if numeric_tokens >= 2 {
            rows.push(line.trim().to_string());
        }
    }
    rows
}

fn looks_numeric(token: &str) -> bool {
    let cleaned = token.trim_matches(|c: char| c == ',' || c == '%' || c == '$' || c == '(' || c == ')');
    if cleaned.is_empty() {
        return false;
    }
    cleaned.chars().filter(|c| c.is_ascii_digit()).count() >= 1
        && cleaned.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == ',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_row_detection_picks_up_table_like_lines() {
        let text = "Year  Arrivals  Growth\n2022  1,200,000  4.5%\nSome narrative sentence with one number 7.\n2023  1,300,000  8.3%";
        let rows = extract_numeric_rows(text);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("1,200,000"));
    }

    #[test]
    fn numeric_token_detector_rejects_prose_words() {
        assert!(!looks_numeric("Arrivals"));
        assert!(looks_numeric("4.5%"));
        assert!(looks_numeric("1,200,000"));
    }
}
