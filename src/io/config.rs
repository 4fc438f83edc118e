use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{StageInputs, StageKind};

/// Project description loaded from a YAML file
///
/// ```yaml
/// domain: personal productivity
/// objective: Build a todo app with user authentication
/// tech_stack: Rust, axum, Postgres
/// stages: knowledge, requirements, architecture
/// title: todo
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub domain: String,
    /// What should be built; required
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub tech_stack: String,
    /// Comma-separated stage names or numbers; all stages when absent
    #[serde(default, alias = "agents")]
    pub stages: Option<String>,
    /// Directory name for this project's outputs
    #[serde(default)]
    pub title: Option<String>,
}

impl ProjectConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ProjectConfig =
            serde_yaml::from_str(yaml).context("Failed to parse project config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.objective.trim().is_empty() {
            return Err(PipelineError::Config(
                "Missing required field in config: objective".to_string(),
            ));
        }
        Ok(())
    }

    /// "Domain: <d> | Preferred Tech Stack: <t>", or "General" when both are empty
    pub fn project_context(&self) -> String {
        build_project_context(&self.domain, &self.tech_stack)
    }

    pub fn stage_inputs(&self) -> StageInputs {
        let inputs = StageInputs::new(self.objective.trim(), self.project_context());
        if self.tech_stack.trim().is_empty() {
            inputs
        } else {
            inputs.with_tech_stack(self.tech_stack.trim())
        }
    }

    pub fn selected_stages(&self) -> PipelineResult<Option<Vec<StageKind>>> {
        self.stages.as_deref().map(parse_stage_list).transpose()
    }
}

pub fn build_project_context(domain: &str, tech_stack: &str) -> String {
    let mut parts = Vec::new();
    if !domain.trim().is_empty() {
        parts.push(format!("Domain: {}", domain.trim()));
    }
    if !tech_stack.trim().is_empty() {
        parts.push(format!("Preferred Tech Stack: {}", tech_stack.trim()));
    }

    if parts.is_empty() {
        "General".to_string()
    } else {
        parts.join(" | ")
    }
}

/// Parse "1,2,architecture" style stage lists, keeping pipeline order
pub fn parse_stage_list(list: &str) -> PipelineResult<Vec<StageKind>> {
    let mut stages = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<StageKind>().map_err(PipelineError::Config))
        .collect::<PipelineResult<Vec<_>>>()?;

    if stages.is_empty() {
        return Err(PipelineError::Config("No stages selected".to_string()));
    }

    stages.sort();
    stages.dedup();
    Ok(stages)
}
