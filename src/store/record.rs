use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A stored snippet. Field order here is the order written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub description: String,
    pub prompt: String,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            prompt: prompt.into(),
        }
    }

    /// Name of the first empty field, if any.
    pub fn first_empty_field(&self) -> Option<&'static str> {
        [
            ("id", &self.id),
            ("title", &self.title),
            ("description", &self.description),
            ("prompt", &self.prompt),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
    }
}

/// Partial update. `id` is immutable and deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub prompt: Option<String>,
}

impl PromptPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.prompt.is_none()
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        for (name, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("prompt", &self.prompt),
        ] {
            if value.as_deref() == Some("") {
                return Err(StoreError::InvalidRecord(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    pub(crate) fn apply(self, target: &mut Prompt) {
        if let Some(title) = self.title {
            target.title = title;
        }
        if let Some(description) = self.description {
            target.description = description;
        }
        if let Some(prompt) = self.prompt {
            target.prompt = prompt;
        }
    }
}
