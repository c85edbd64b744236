//! Best-effort cleanup of a parsed storage file.
//!
//! Bad entries are dropped rather than failing the whole load. The caller
//! decides how to report them; [`sanitize`] itself has no side effects.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use super::record::Prompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    NotAnObject,
    MissingField(&'static str),
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    /// Position of the entry in the raw array.
    pub index: usize,
    pub reason: DropReason,
}

impl fmt::Display for Dropped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            DropReason::NotAnObject => write!(f, "entry {}: not an object", self.index),
            DropReason::MissingField(field) => {
                write!(f, "entry {}: missing required field '{field}'", self.index)
            }
            DropReason::DuplicateId(id) => {
                write!(f, "entry {}: duplicate id '{id}'", self.index)
            }
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Sanitized {
    pub prompts: Vec<Prompt>,
    pub dropped: Vec<Dropped>,
}

/// Keep well-formed entries, first occurrence of each id wins.
pub fn sanitize(raw: Vec<Value>) -> Sanitized {
    let mut seen = HashSet::new();
    let mut out = Sanitized::default();

    for (index, entry) in raw.into_iter().enumerate() {
        let prompt = match to_prompt(entry) {
            Ok(p) => p,
            Err(reason) => {
                out.dropped.push(Dropped { index, reason });
                continue;
            }
        };
        if !seen.insert(prompt.id.clone()) {
            out.dropped.push(Dropped {
                index,
                reason: DropReason::DuplicateId(prompt.id),
            });
            continue;
        }
        out.prompts.push(prompt);
    }

    out
}

fn to_prompt(entry: Value) -> Result<Prompt, DropReason> {
    let Value::Object(map) = entry else {
        return Err(DropReason::NotAnObject);
    };
    let field = |name: &'static str| {
        map.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(DropReason::MissingField(name))
    };
    Ok(Prompt {
        id: field("id")?,
        title: field("title")?,
        description: field("description")?,
        prompt: field("prompt")?,
    })
}
