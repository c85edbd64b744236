use super::record::Prompt;

/// Records written to a fresh storage file.
pub fn default_prompts() -> Vec<Prompt> {
    vec![
        Prompt::new(
            "default-1",
            "Code Reviewer",
            "Ask Claude to review code for bugs and improvements",
            "Please review the following code for bugs, performance issues, and suggest improvements:\n\n",
        ),
        Prompt::new(
            "default-2",
            "Documentation Generator",
            "Generate clear documentation for code",
            "Generate comprehensive documentation for the following code. Include parameters, return types, and usage examples:\n\n",
        ),
        Prompt::new(
            "default-3",
            "Test Case Writer",
            "Create unit test cases",
            "Write comprehensive unit tests for the following code:\n\n",
        ),
    ]
}
