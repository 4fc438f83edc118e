use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The built-in pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Similar projects, documentation, code samples, tech stack
    Knowledge,
    /// Requirement extraction, intent analysis, task breakdown
    Requirements,
    /// Flowchart, components, blueprint, validation
    Architecture,
    /// Project structure and boilerplate
    Skeletons,
    /// Production code and its review
    Generator,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::Knowledge,
        StageKind::Requirements,
        StageKind::Architecture,
        StageKind::Skeletons,
        StageKind::Generator,
    ];

    /// File stem used when persisting this stage's output
    pub fn persist_key(&self) -> &'static str {
        match self {
            StageKind::Knowledge => "Knowledge",
            StageKind::Requirements => "Requirements",
            StageKind::Architecture => "Architecture",
            StageKind::Skeletons => "Skeletons",
            StageKind::Generator => "Generator",
        }
    }

    /// Short name used on the command line and in logs
    pub fn slug(&self) -> &'static str {
        match self {
            StageKind::Knowledge => "knowledge",
            StageKind::Requirements => "requirements",
            StageKind::Architecture => "architecture",
            StageKind::Skeletons => "skeletons",
            StageKind::Generator => "generator",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.persist_key())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "knowledge" => Ok(StageKind::Knowledge),
            "2" | "requirements" => Ok(StageKind::Requirements),
            "3" | "architecture" => Ok(StageKind::Architecture),
            "4" | "skeletons" | "skeleton" => Ok(StageKind::Skeletons),
            "5" | "generator" | "codegen" => Ok(StageKind::Generator),
            other => Err(format!("unknown stage: {}", other)),
        }
    }
}

/// Normalized outputs of one stage, keyed by task name in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageOutput(pub Map<String, Value>);

impl StageOutput {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, task: impl Into<String>, value: Value) {
        self.0.insert(task.into(), value);
    }

    pub fn get(&self, task: &str) -> Option<&Value> {
        self.0.get(task)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// The whole output as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for StageOutput {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Outputs of completed stages, filled in order by the runner
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    stages: Vec<(StageKind, StageOutput)>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage output, replacing any earlier output for the same stage
    pub fn insert(&mut self, stage: StageKind, output: StageOutput) {
        if let Some(slot) = self.stages.iter_mut().find(|(k, _)| *k == stage) {
            slot.1 = output;
        } else {
            self.stages.push((stage, output));
        }
    }

    pub fn get(&self, stage: StageKind) -> Option<&StageOutput> {
        self.stages
            .iter()
            .find(|(k, _)| *k == stage)
            .map(|(_, output)| output)
    }

    pub fn contains(&self, stage: StageKind) -> bool {
        self.get(stage).is_some()
    }

    pub fn stages(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.stages.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Static parameters shared by every stage of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageInputs {
    /// Free-text description of what should be built
    pub user_requirements: String,
    /// Domain / context string, e.g. "Domain: fintech | Preferred Tech Stack: Rust"
    pub project_context: String,
    /// Tech stack chosen by the caller; overrides the knowledge stage's proposal
    #[serde(default)]
    pub tech_stack: Option<String>,
}

impl StageInputs {
    pub fn new(user_requirements: impl Into<String>, project_context: impl Into<String>) -> Self {
        Self {
            user_requirements: user_requirements.into(),
            project_context: project_context.into(),
            tech_stack: None,
        }
    }

    pub fn with_tech_stack(mut self, tech_stack: impl Into<String>) -> Self {
        self.tech_stack = Some(tech_stack.into());
        self
    }
}
