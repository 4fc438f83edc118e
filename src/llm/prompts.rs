use crate::models::{AgentSpec, TaskResult, TaskSpec};

/// Rules appended to every agent's system prompt
pub const OUTPUT_RULES: &str = r#"OUTPUT RULES:
1. Respond with a single JSON value inside a ```json fenced block.
2. Use exactly the keys the task asks for.
3. Do not add commentary outside the fenced block.
4. If information is unknown, use an empty list or an empty string rather than inventing it."#;

/// Reminder sent when a response did not contain usable JSON
pub const JSON_REMINDER: &str = "Your previous answer did not contain valid JSON. \
Answer again with only a ```json fenced block holding the requested object.";

/// Build the system prompt for an agent
pub fn build_system_prompt(agent: &AgentSpec) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("You are {}.\n\n", agent.role));
    prompt.push_str(&format!("GOAL: {}\n\n", agent.goal));
    prompt.push_str(&format!("BACKGROUND: {}\n\n", agent.backstory));
    prompt.push_str(OUTPUT_RULES);
    prompt
}

/// Build the user prompt for a task, including the raw output of its context tasks
pub fn build_task_prompt(task: &TaskSpec, context: &[&TaskResult]) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# Task: {}\n\n", task.name));
    prompt.push_str(task.description.trim());
    prompt.push_str("\n\n");

    prompt.push_str("## Expected Output\n");
    prompt.push_str(task.expected_output.trim());
    prompt.push_str("\n\n");

    if !context.is_empty() {
        prompt.push_str("## Context From Previous Tasks\n");
        for result in context {
            prompt.push_str(&format!("### {}\n", result.name));
            prompt.push_str(result.raw.trim());
            prompt.push_str("\n\n");
        }
    }

    prompt.push_str("Return your answer now.");
    prompt
}
