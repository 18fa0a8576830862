use serde_json::Value;

/// Outcome of reading model text as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonPayload {
    /// The whole text was valid JSON.
    Direct(Value),
    /// JSON recovered from the first `{` to the last `}` (fences, chatter).
    Extracted(Value),
    Unparseable,
}

impl JsonPayload {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Direct(value) | Self::Extracted(value) => Some(value),
            Self::Unparseable => None,
        }
    }
}

pub fn parse_json_payload(text: &str) -> JsonPayload {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return JsonPayload::Unparseable;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return JsonPayload::Direct(value);
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<Value>(&trimmed[start..=end])
                .map_or(JsonPayload::Unparseable, JsonPayload::Extracted)
        }
        _ => JsonPayload::Unparseable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_is_direct() {
        assert_eq!(
            parse_json_payload(r#" {"count": 5} "#),
            JsonPayload::Direct(json!({"count": 5}))
        );
    }

    #[test]
    fn fenced_json_is_extracted() {
        let text = "Sure! Here you go:\n```json\n{\"candidates\": []}\n```\nHope that helps.";
        assert_eq!(
            parse_json_payload(text),
            JsonPayload::Extracted(json!({"candidates": []}))
        );
    }

    #[test]
    fn prose_is_unparseable() {
        assert_eq!(parse_json_payload("I cannot do that."), JsonPayload::Unparseable);
        assert_eq!(parse_json_payload(""), JsonPayload::Unparseable);
        assert_eq!(parse_json_payload("} backwards {"), JsonPayload::Unparseable);
        assert!(parse_json_payload("{ not json }").into_value().is_none());
    }
}
