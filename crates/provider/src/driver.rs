//! Plan file driver
//!
//! Runs a sequence of desired configurations through the provider the
//! way a configuration engine would: plan each step against the state
//! recorded so far, then apply it. Used by the `apply` subcommand.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Diagnostic;
use crate::provider::CirrusProvider;
use crate::state::DynamicValue;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanFile {
    /// Provider block passed to `configure`
    #[serde(default)]
    pub provider: DynamicValue,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Identifies the resource across steps
    pub address: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Desired configuration; null destroys the resource
    #[serde(default)]
    pub config: DynamicValue,
    /// Adopt an existing remote object with this id instead
    #[serde(default)]
    pub import: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Configure,
    Import,
    Create,
    Update,
    Replace,
    Delete,
    NoOp,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub address: String,
    pub action: Action,
    pub state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

impl StepOutcome {
    pub fn failed(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

impl PlanFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading plan file {}", path.display()))?;
        let plan = serde_json::from_str(&content)
            .with_context(|| format!("parsing plan file {}", path.display()))?;
        Ok(plan)
    }
}

/// Run every step in order, stopping after the first one that fails
pub async fn run(provider: &CirrusProvider, plan: &PlanFile) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();

    let provider_config = match &plan.provider {
        DynamicValue::Null => DynamicValue::Map(Default::default()),
        other => other.clone(),
    };
    let diagnostics = provider.configure(&provider_config).await;
    if diagnostics.iter().any(Diagnostic::is_error) {
        outcomes.push(StepOutcome {
            address: "provider".to_string(),
            action: Action::Configure,
            state: DynamicValue::Null,
            diagnostics,
        });
        return outcomes;
    }

    let mut states: HashMap<String, DynamicValue> = HashMap::new();
    for step in &plan.steps {
        let prior = states.get(&step.address).cloned().unwrap_or_default();
        let outcome = run_step(provider, step, &prior).await;
        info!("{} {:?}", step.address, outcome.action);

        if outcome.state.is_null() {
            states.remove(&step.address);
        } else {
            states.insert(step.address.clone(), outcome.state.clone());
        }

        let failed = outcome.failed();
        outcomes.push(outcome);
        if failed {
            warn!("Stopping after failed step {}", step.address);
            break;
        }
    }
    outcomes
}

async fn run_step(provider: &CirrusProvider, step: &Step, prior: &DynamicValue) -> StepOutcome {
    let outcome = |action, state, diagnostics| StepOutcome {
        address: step.address.clone(),
        action,
        state,
        diagnostics,
    };

    if let Some(id) = &step.import {
        let resp = provider.import_resource_state(&step.type_name, id).await;
        let state = resp
            .imported_resources
            .into_iter()
            .next()
            .map(|r| r.state)
            .unwrap_or_else(|| prior.clone());
        return outcome(Action::Import, state, resp.diagnostics);
    }

    let plan = provider.plan_resource_change(&step.type_name, prior, &step.config);
    if plan.diagnostics.iter().any(Diagnostic::is_error) {
        return outcome(Action::NoOp, prior.clone(), plan.diagnostics);
    }
    let planned = plan.planned_state;

    let action = match (prior.is_null(), planned.is_null()) {
        (true, true) => return outcome(Action::NoOp, DynamicValue::Null, plan.diagnostics),
        (true, false) => Action::Create,
        (false, true) => Action::Delete,
        (false, false) if !plan.requires_replace.is_empty() => Action::Replace,
        (false, false) => Action::Update,
    };

    if action == Action::Replace {
        let destroyed = provider
            .apply_resource_change(&step.type_name, prior, &DynamicValue::Null)
            .await;
        if destroyed.diagnostics.iter().any(Diagnostic::is_error) {
            return outcome(action, destroyed.new_state, destroyed.diagnostics);
        }
        let created = provider
            .apply_resource_change(&step.type_name, &DynamicValue::Null, &planned)
            .await;
        return outcome(action, created.new_state, created.diagnostics);
    }

    let resp = provider
        .apply_resource_change(&step.type_name, prior, &planned)
        .await;
    outcome(action, resp.new_state, resp.diagnostics)
}
