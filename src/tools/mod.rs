pub mod prompts;

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::store::SharedStore;

pub struct ToolResult {
    pub text: String,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub struct ToolContext {
    pub store: SharedStore,
}

/// Tool description as advertised by MCP `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult>;
}

pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    ctx: ToolContext,
}

impl ToolRegistry {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            tools: HashMap::new(),
            ctx,
        }
    }

    /// Registry with every prompt tool registered.
    pub fn with_prompt_tools(store: SharedStore) -> Self {
        let mut reg = Self::new(ToolContext { store });
        reg.register(Box::new(prompts::ListPromptsTool));
        reg.register(Box::new(prompts::GetPromptTool));
        reg.register(Box::new(prompts::AddPromptTool));
        reg.register(Box::new(prompts::UpdatePromptTool));
        reg.register(Box::new(prompts::DeletePromptTool));
        reg
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn store(&self) -> &SharedStore {
        &self.ctx.store
    }

    pub fn tool_defs(&self) -> Vec<ToolDef> {
        let mut defs: Vec<_> = self
            .tools
            .values()
            .map(|t| ToolDef {
                name: t.name().into(),
                description: t.description().into(),
                input_schema: t.parameters(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {name}"))?;
        tracing::debug!("Tool call: {name}({args})");
        tool.execute(args, &self.ctx).await
    }
}

/// Fetch a required, non-empty string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required argument: {key}"))
}

/// Fetch an optional string argument; absent or null is `None`.
pub(crate) fn optional_string(args: &Value, key: &str) -> Result<Option<String>> {
    match &args[key] {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => anyhow::bail!("Argument {key} must be a string"),
    }
}
