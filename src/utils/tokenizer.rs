/// Estimate the token count of a finished context document.
///
/// Uses the cl100k BPE when available, falling back to the usual
/// chars/4 heuristic. The estimate is observational only and never feeds
/// back into budget arithmetic, which is character based.
pub fn estimate_tokens(text: &str) -> usize {
    match tiktoken_rs::cl100k_base() {
        Ok(bpe) => bpe.encode_with_special_tokens(text).len(),
        Err(_) => text.len() / 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_nonzero_for_text() {
        assert!(estimate_tokens("fn main() { println!(\"hello\"); }") > 0);
    }

    #[test]
    fn estimate_is_zero_for_empty() {
        assert_eq!(estimate_tokens(""), 0);
    }
}
