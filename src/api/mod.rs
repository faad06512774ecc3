//! Wire schema of the answering endpoint.

use serde::{Deserialize, Serialize};

/// Shown when the endpoint replies without a usable answer.
pub const FALLBACK_ANSWER: &str = "No answer found.";

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
}

impl AskRequest {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: Option<String>,
}

impl AskResponse {
    /// Parses a response body. Any shape other than an object with a string
    /// `answer` field yields the default (no answer).
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// The answer text, with [`FALLBACK_ANSWER`] substituted for a missing
    /// or empty answer.
    pub fn into_answer(self) -> String {
        match self.answer {
            Some(answer) if !answer.is_empty() => answer,
            _ => FALLBACK_ANSWER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_only_the_trimmed_question() {
        let json = serde_json::to_string(&AskRequest::new("  Hello \n")).expect("serialize");
        assert_eq!(json, r#"{"question":"Hello"}"#);
    }

    #[test]
    fn answer_field_is_extracted() {
        let response = AskResponse::from_body(r#"{"answer":"Hi there","sources":[1,2]}"#);
        assert_eq!(response.into_answer(), "Hi there");
    }

    #[test]
    fn unusable_shapes_fall_back() {
        for body in [
            "{}",
            r#"{"answer":null}"#,
            r#"{"answer":""}"#,
            r#"{"answer":42}"#,
            r#"{"error":"Missing question"}"#,
            "[]",
            "<html>bad gateway</html>",
            "",
        ] {
            assert_eq!(
                AskResponse::from_body(body).into_answer(),
                FALLBACK_ANSWER,
                "body: {body}"
            );
        }
    }
}
