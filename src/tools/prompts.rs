use anyhow::Result;
use serde_json::{Value, json};

use super::{Tool, ToolContext, ToolResult, optional_string, required_str};
use crate::store::{Prompt, PromptPatch};

pub struct ListPromptsTool;

#[async_trait::async_trait]
impl Tool for ListPromptsTool {
    fn name(&self) -> &str {
        "list_prompts"
    }
    fn description(&self) -> &str {
        "List every saved prompt with its id, title, and description"
    }
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let prompts = ctx.store.lock().await.list();
        if prompts.is_empty() {
            return Ok(ToolResult::text("No prompts saved."));
        }
        let lines: Vec<String> = prompts
            .iter()
            .map(|p| format!("{}: {} ({})", p.id, p.title, p.description))
            .collect();
        Ok(ToolResult::text(lines.join("\n")))
    }
}

pub struct GetPromptTool;

#[async_trait::async_trait]
impl Tool for GetPromptTool {
    fn name(&self) -> &str {
        "get_prompt"
    }
    fn description(&self) -> &str {
        "Get the text of a saved prompt by id"
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Prompt id" }
            },
            "required": ["id"]
        })
    }
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let id = required_str(&args, "id")?;
        let store = ctx.store.lock().await;
        let prompt = store
            .get_by_id(id)
            .ok_or_else(|| anyhow::anyhow!("No prompt with id '{id}'"))?;
        Ok(ToolResult::text(prompt.prompt.clone()))
    }
}

pub struct AddPromptTool;

#[async_trait::async_trait]
impl Tool for AddPromptTool {
    fn name(&self) -> &str {
        "add_prompt"
    }
    fn description(&self) -> &str {
        "Save a new prompt. The id must not already exist."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Unique prompt id" },
                "title": { "type": "string", "description": "Short label" },
                "description": { "type": "string", "description": "What the prompt is for" },
                "prompt": { "type": "string", "description": "Prompt text" }
            },
            "required": ["id", "title", "description", "prompt"]
        })
    }
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let prompt = Prompt::new(
            required_str(&args, "id")?,
            required_str(&args, "title")?,
            required_str(&args, "description")?,
            required_str(&args, "prompt")?,
        );
        let id = prompt.id.clone();
        ctx.store.lock().await.add(prompt).await?;
        Ok(ToolResult::text(format!("Added prompt '{id}'")))
    }
}

pub struct UpdatePromptTool;

#[async_trait::async_trait]
impl Tool for UpdatePromptTool {
    fn name(&self) -> &str {
        "update_prompt"
    }
    fn description(&self) -> &str {
        "Change the title, description, or text of a saved prompt. Omitted fields are kept."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Prompt id" },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "prompt": { "type": "string" }
            },
            "required": ["id"]
        })
    }
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let id = required_str(&args, "id")?;
        let patch = PromptPatch {
            title: optional_string(&args, "title")?,
            description: optional_string(&args, "description")?,
            prompt: optional_string(&args, "prompt")?,
        };
        if patch.is_empty() {
            anyhow::bail!("Nothing to update: pass title, description, or prompt");
        }
        ctx.store.lock().await.update(id, patch).await?;
        Ok(ToolResult::text(format!("Updated prompt '{id}'")))
    }
}

pub struct DeletePromptTool;

#[async_trait::async_trait]
impl Tool for DeletePromptTool {
    fn name(&self) -> &str {
        "delete_prompt"
    }
    fn description(&self) -> &str {
        "Delete a saved prompt by id"
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Prompt id" }
            },
            "required": ["id"]
        })
    }
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let id = required_str(&args, "id")?;
        let removed = ctx.store.lock().await.delete(id).await?;
        Ok(ToolResult::text(format!("Deleted prompt '{}' ({})", removed.id, removed.title)))
    }
}
