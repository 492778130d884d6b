//! Lenient JSON extraction from completion output.
//!
//! Completion output mixes prose with the JSON the engine actually wants,
//! wrapped in markdown fences or buried mid-sentence. Extraction here is
//! deliberately forgiving: find the first structure that parses, ignore
//! everything around it. Structural demands live at this seam, never in
//! the driver.

use impresario_error::{PolicyError, PolicyErrorKind};

/// Extract the first JSON value from output that may contain markdown or
/// surrounding prose.
///
/// Strategies, in order:
/// 1. Markdown code fences: ```json ... ```
/// 2. Balanced braces: { ... }
/// 3. Balanced brackets: [ ... ]
///
/// Whichever structure opens first wins, so an array of task drafts is
/// not mistaken for its first element.
///
/// # Errors
///
/// Returns [`PolicyErrorKind::MalformedOutput`] if no JSON is found.
/// Callers treat that as a decision, not an accident.
///
/// # Examples
///
/// ```
/// use impresario_showrunner::extract_json;
///
/// let response = "Here is the plan:\n```json\n[{\"worker\": \"lore\"}]\n```\nGood luck!";
/// let json = extract_json(response).unwrap();
/// assert!(json.starts_with('['));
/// ```
pub fn extract_json(response: &str) -> Result<String, PolicyError> {
    if let Some(json) = extract_from_code_block(response, "json") {
        return Ok(json);
    }

    let bracket_pos = response.find('[');
    let brace_pos = response.find('{');

    match (bracket_pos, brace_pos) {
        (Some(b_pos), Some(c_pos)) if b_pos < c_pos => {
            if let Some(json) = extract_balanced(response, '[', ']') {
                return Ok(json);
            }
            if let Some(json) = extract_balanced(response, '{', '}') {
                return Ok(json);
            }
        }
        (Some(_), None) => {
            if let Some(json) = extract_balanced(response, '[', ']') {
                return Ok(json);
            }
        }
        _ => {
            if let Some(json) = extract_balanced(response, '{', '}') {
                return Ok(json);
            }
            if let Some(json) = extract_balanced(response, '[', ']') {
                return Ok(json);
            }
        }
    }

    tracing::warn!(
        response_length = response.len(),
        "No JSON found in completion output"
    );

    Err(PolicyError::new(PolicyErrorKind::MalformedOutput(format!(
        "No JSON found in response of {} bytes",
        response.len()
    ))))
}

/// Extract and parse the first JSON value in one step.
///
/// # Errors
///
/// Returns [`PolicyErrorKind::MalformedOutput`] if nothing JSON-shaped is
/// found or the candidate does not parse.
pub fn extract_json_value(response: &str) -> Result<serde_json::Value, PolicyError> {
    let candidate = extract_json(response)?;
    serde_json::from_str(&candidate).map_err(|e| {
        let preview: String = candidate.chars().take(100).collect();
        tracing::warn!(error = %e, json_preview = %preview, "Extracted JSON failed to parse");
        PolicyError::new(PolicyErrorKind::MalformedOutput(format!(
            "Extracted candidate is not valid JSON: {}",
            e
        )))
    })
}

/// Parse a JSON string into a typed value.
///
/// # Errors
///
/// Returns [`PolicyErrorKind::MalformedOutput`] if the string does not
/// deserialize into `T`.
pub fn parse_json<T>(json_str: &str) -> Result<T, PolicyError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(json_str).map_err(|e| {
        let preview: String = json_str.chars().take(100).collect();
        tracing::warn!(error = %e, json_preview = %preview, "JSON parsing failed");
        PolicyError::new(PolicyErrorKind::MalformedOutput(format!(
            "Failed to parse JSON: {}",
            e
        )))
    })
}

/// Pull content out of a markdown code fence, tolerating a missing
/// closing fence on truncated responses.
fn extract_from_code_block(response: &str, language: &str) -> Option<String> {
    let pattern = format!("```{}", language);

    if let Some(start) = response.find(&pattern) {
        let content_start = start + pattern.len();
        if let Some(end) = response[content_start..].find("```") {
            let content = &response[content_start..content_start + end];
            return Some(content.trim().to_string());
        }
        return Some(response[content_start..].trim().to_string());
    }

    if let Some(start) = response.find("```") {
        let content_start = start + 3;
        let skip_to = response[content_start..]
            .find('\n')
            .map(|n| content_start + n + 1)
            .unwrap_or(content_start);

        if let Some(end) = response[skip_to..].find("```") {
            let content = &response[skip_to..skip_to + end];
            return Some(content.trim().to_string());
        }
        return Some(response[skip_to..].trim().to_string());
    }

    None
}

/// Extract content between balanced delimiters, skipping delimiters that
/// appear inside string literals.
fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(response[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_code_block() {
        let response = "The troupe should do this:\n\n```json\n[{\"worker\": \"design\", \"task_type\": \"design_blueprint\"}]\n```\n\nThat covers the gap.";
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("design_blueprint"));
    }

    #[test]
    fn test_extract_json_balanced_braces() {
        let response = r#"Sure! {"fact": "The stage rotates", "nested": {"depth": 2}} is what I found."#;
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        assert!(json.contains("depth"));
    }

    #[test]
    fn test_array_before_object_wins() {
        let response = r#"Tasks: [{"worker": "lore"}] and also {"stray": true}"#;
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('['));
        assert!(!json.contains("stray"));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let response = r#"{"content": "She whispered \"{it begins}\" and left"}"#;
        let value = extract_json_value(response).unwrap();
        assert!(value["content"].as_str().unwrap().contains("it begins"));
    }

    #[test]
    fn test_plain_prose_is_malformed_output() {
        let err = extract_json("I could not decide on any tasks today.").unwrap_err();
        assert!(matches!(err.kind, PolicyErrorKind::MalformedOutput(_)));
    }

    #[test]
    fn test_unclosed_fence_still_extracts() {
        let response = "```json\n{\"worker\": \"drama\"}";
        let value = extract_json_value(response).unwrap();
        assert_eq!(value["worker"], "drama");
    }

    #[test]
    fn test_parse_json_into_draft() {
        use impresario_core::TaskDraft;

        let json = r#"{"worker": "script", "task_type": "write_script", "description": "Premiere night"}"#;
        let draft: TaskDraft = parse_json(json).unwrap();
        assert_eq!(draft.worker, "script");
        assert_eq!(draft.priority, 5);
    }

    #[test]
    fn test_invalid_candidate_is_malformed_output() {
        let err = extract_json_value("{not valid json at all}").unwrap_err();
        assert!(matches!(err.kind, PolicyErrorKind::MalformedOutput(_)));
    }
}
