//! Model selection offered to the user and its mapping to service model ids.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The chat model picked in the front end.
///
/// The labels are the familiar names users choose between; the ids actually
/// sent to the service are the current equivalents of those tiers.
///
/// ```
/// use voice_assistant::llm::ModelChoice;
///
/// assert_eq!(ModelChoice::Gpt4.service_model_id(), "gpt-4o");
/// assert_eq!(ModelChoice::Gpt35Turbo.to_string(), "gpt-3.5-turbo");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelChoice {
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl ModelChoice {
    /// Label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            ModelChoice::Gpt4 => "gpt-4",
            ModelChoice::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }

    /// Model id sent in the chat-completions request.
    pub fn service_model_id(&self) -> &'static str {
        match self {
            ModelChoice::Gpt4 => "gpt-4o",
            ModelChoice::Gpt35Turbo => "gpt-4o-mini",
        }
    }
}

impl Default for ModelChoice {
    fn default() -> Self {
        Self::Gpt4
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_labels_to_service_ids() {
        assert_eq!(ModelChoice::Gpt4.service_model_id(), "gpt-4o");
        assert_eq!(ModelChoice::Gpt35Turbo.service_model_id(), "gpt-4o-mini");
    }

    #[test]
    fn display_matches_serde_label() {
        for choice in [ModelChoice::Gpt4, ModelChoice::Gpt35Turbo] {
            let json = serde_json::to_string(&choice).unwrap();
            assert_eq!(json, format!("\"{choice}\""));
        }
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&ModelChoice::Gpt35Turbo).unwrap();
        assert_eq!(json, "\"gpt-3.5-turbo\"");
    }

    #[test]
    fn default_is_gpt4() {
        assert_eq!(ModelChoice::default(), ModelChoice::Gpt4);
    }
}
