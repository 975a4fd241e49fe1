/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Pull the JSON document out of a chatty response.
///
/// Grounded answers sometimes wrap the JSON in prose ("Here are the
/// results: ```json ... ```"). Prefers the first fenced block, then falls
/// back to the span from the first `[`/`{` to the last `]`/`}`.
pub fn extract_json_text(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    let open = trimmed.find(|c: char| c == '[' || c == '{');
    let close = trimmed.rfind(|c: char| c == ']' || c == '}');
    match (open, close) {
        (Some(open), Some(close)) if close > open => &trimmed[open..=close],
        _ => strip_code_blocks(trimmed),
    }
}
