use serde::{Deserialize, Serialize};

/// The persona a task is executed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl AgentSpec {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }
}

/// One unit of work handed to the execution engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Name the result is stored under in the stage output
    pub name: String,
    /// Instructions for the agent
    pub description: String,
    /// Description of the expected result
    pub expected_output: String,
    /// Agent that performs the task
    pub agent: AgentSpec,
    /// Names of earlier tasks in the same stage whose raw output is given as context
    #[serde(default)]
    pub context: Vec<String>,
}

impl TaskSpec {
    pub fn new(
        name: impl Into<String>,
        agent: &AgentSpec,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.clone(),
            context: Vec::new(),
        }
    }

    /// Attach upstream tasks as context
    pub fn with_context(mut self, tasks: &[&str]) -> Self {
        self.context = tasks.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Raw text the engine produced for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub name: String,
    pub raw: String,
}

impl TaskResult {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
        }
    }
}
