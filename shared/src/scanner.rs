//! Candidate extraction from scanned QR/barcode payloads
//!
//! Labels in the warehouse carry anything from a bare SKU to a URL or a
//! delimited record such as `PO123|A001|50`. The scanner tries every
//! plausible SKU in a fixed order and keeps the first one the catalog knows.

/// Query keys whose values are tried before plain tokens
const SKU_KEYS: [&str; 2] = ["sku", "code"];

/// Shortest token considered a SKU candidate
const MIN_TOKEN_LEN: usize = 2;

/// Candidates in priority order: the whole trimmed payload, values of
/// `sku=`/`code=` parameters, then delimiter-separated tokens.
/// All upper-cased, duplicates removed.
pub fn extract_candidates(payload: &str) -> Vec<String> {
    let trimmed = payload.trim();
    let mut out: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let c = candidate.trim().to_ascii_uppercase();
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    };

    if trimmed.is_empty() {
        return Vec::new();
    }
    push(trimmed);

    for part in trimmed.split(|c| matches!(c, '?' | '&' | '#' | ';')) {
        if let Some((key, value)) = part.split_once('=') {
            let key = key.rsplit('/').next().unwrap_or(key).trim();
            if SKU_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                push(value);
            }
        }
    }

    for token in trimmed.split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        if token.len() >= MIN_TOKEN_LEN {
            push(token);
        }
    }

    out
}
