// XApp endorsement operator tool
//
// Validates engine configuration files and replays endorsement scenarios
// against the in-memory node ledger, round clock and security notifier.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dao_xapps::{
    Address, AppId, EndorsementEvent, EngineConfig, InMemoryNodeLedger, InMemorySecurityNotifier,
    ManualRoundClock, NodeId, NodeLedger, NodeLevel, RoundClock, XAppsEngine, AppSummary,
};
use env_logger::Env;
use log::{info, warn};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "xapps_admin")]
#[command(about = "XApp endorsement engine operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an engine configuration file
    ValidateConfig { path: PathBuf },

    /// Print the default configuration as YAML
    PrintDefaultConfig,

    /// Replay a scenario file and print the resulting state as JSON
    Simulate {
        scenario: PathBuf,

        /// Engine configuration; defaults are used when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize)]
struct Scenario {
    /// Holder of the Admin and Governance roles
    #[serde(default = "default_admin")]
    admin: Address,

    #[serde(default)]
    nodes: Vec<NodeEntry>,

    #[serde(default)]
    apps: Vec<AppEntry>,

    #[serde(default)]
    steps: Vec<Step>,
}

fn default_admin() -> Address {
    Address::repeat_byte(0xAA)
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    owner: Address,
    level: NodeLevel,
    #[serde(default)]
    delegatee: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct AppEntry {
    name: String,
    /// Defaults to the scenario admin
    #[serde(default)]
    admin: Option<Address>,
    #[serde(default)]
    metadata_uri: String,
}

/// Scenario step; `caller` defaults to the node's manager or the scenario admin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Step {
    Endorse { app: String, node: NodeId, caller: Option<Address> },
    Unendorse { app: String, node: NodeId, caller: Option<Address> },
    RemoveEndorsement { app: String, node: NodeId, caller: Option<Address> },
    Check { app: String },
    ReconcileAll,
    SetEligibility { app: String, eligible: bool },
    SetLevel { node: NodeId, level: NodeLevel },
    Delegate { node: NodeId, to: Address },
    RevokeDelegation { node: NodeId },
    Transfer { node: NodeId, to: Address },
    Burn { node: NodeId },
    Advance { blocks: u64 },
    /// Start the next round after `blocks` and take its snapshot
    StartRound { #[serde(default)] blocks: u64 },
    UpdateThreshold { threshold: u64 },
    UpdateCooldown { rounds: u64 },
    UpdateGracePeriod { length: u64 },
    RemoveSubmission { app: String },
}

#[derive(Debug, Serialize)]
struct StepOutcome {
    index: usize,
    step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    round: u64,
    height: u64,
    steps: Vec<StepOutcome>,
    apps: Vec<AppSummary>,
    unendorsed: Vec<AppId>,
    eligible: Vec<AppId>,
    events: Vec<EndorsementEvent>,
}

struct Simulation {
    engine: XAppsEngine,
    nodes: Arc<InMemoryNodeLedger>,
    clock: Arc<ManualRoundClock>,
    admin: Address,
    app_ids: BTreeMap<String, AppId>,
}

impl Simulation {
    fn new(config: EngineConfig, scenario: &Scenario) -> Result<Self> {
        let nodes = Arc::new(InMemoryNodeLedger::new());
        let clock = Arc::new(ManualRoundClock::new());
        let notifier = Arc::new(InMemorySecurityNotifier::new());
        clock.start_round();

        for entry in &scenario.nodes {
            let node_id = nodes.mint(entry.owner, entry.level);
            if let Some(delegatee) = entry.delegatee {
                nodes.delegate(node_id, delegatee);
            }
        }

        let engine = XAppsEngine::new(config, scenario.admin, nodes.clone(), clock.clone(), notifier);
        let mut app_ids = BTreeMap::new();
        for entry in &scenario.apps {
            let admin = entry.admin.unwrap_or(scenario.admin);
            let app_id = engine
                .submit_app(&admin, admin, admin, &entry.name, &entry.metadata_uri)
                .with_context(|| format!("submitting app {}", entry.name))?;
            app_ids.insert(entry.name.clone(), app_id);
        }

        Ok(Simulation { engine, nodes, clock, admin: scenario.admin, app_ids })
    }

    fn app(&self, name: &str) -> Result<AppId> {
        match self.app_ids.get(name) {
            Some(id) => Ok(*id),
            None => bail!("unknown app {:?} in scenario", name),
        }
    }

    fn manager(&self, node: NodeId, caller: Option<Address>) -> Address {
        caller
            .or_else(|| self.nodes.current_manager(node))
            .unwrap_or(Address::ZERO)
    }

    fn run(&self, step: &Step) -> Result<serde_json::Value> {
        let value = match step {
            Step::Endorse { app, node, caller } => {
                let score = self.engine.endorse(&self.app(app)?, *node, &self.manager(*node, *caller))?;
                serde_json::json!({ "score": score })
            }
            Step::Unendorse { app, node, caller } => {
                let score = self.engine.unendorse(&self.app(app)?, *node, &self.manager(*node, *caller))?;
                serde_json::json!({ "score": score })
            }
            Step::RemoveEndorsement { app, node, caller } => {
                let caller = caller.unwrap_or(self.admin);
                let score = self.engine.remove_node_endorsement(&self.app(app)?, *node, &caller)?;
                serde_json::json!({ "score": score })
            }
            Step::Check { app } => {
                let eligible = self.engine.check_endorsement(&self.app(app)?)?;
                serde_json::json!({ "eligible": eligible })
            }
            Step::ReconcileAll => serde_json::to_value(self.engine.reconcile_all())?,
            Step::SetEligibility { app, eligible } => {
                self.engine.set_voting_eligibility(&self.app(app)?, *eligible, &self.admin)?;
                serde_json::Value::Null
            }
            Step::SetLevel { node, level } => serde_json::json!({ "found": self.nodes.set_level(*node, *level) }),
            Step::Delegate { node, to } => serde_json::json!({ "found": self.nodes.delegate(*node, *to) }),
            Step::RevokeDelegation { node } => {
                serde_json::json!({ "revoked": self.nodes.revoke_delegation(*node) })
            }
            Step::Transfer { node, to } => serde_json::json!({ "found": self.nodes.transfer(*node, *to) }),
            Step::Burn { node } => serde_json::json!({ "found": self.nodes.burn(*node).is_some() }),
            Step::Advance { blocks } => serde_json::json!({ "height": self.clock.advance(*blocks) }),
            Step::StartRound { blocks } => {
                let round = self.clock.start_round_after(*blocks);
                let eligible = self.engine.start_round(round)?;
                serde_json::json!({ "round": round, "eligible": eligible })
            }
            Step::UpdateThreshold { threshold } => {
                self.engine.update_threshold(*threshold, &self.admin)?;
                serde_json::Value::Null
            }
            Step::UpdateCooldown { rounds } => {
                self.engine.update_cooldown_period(*rounds, &self.admin)?;
                serde_json::Value::Null
            }
            Step::UpdateGracePeriod { length } => {
                self.engine.update_grace_period(*length, &self.admin)?;
                serde_json::Value::Null
            }
            Step::RemoveSubmission { app } => {
                let freed = self.engine.remove_xapp_submission(&self.app(app)?, &self.admin)?;
                serde_json::json!({ "freed_nodes": freed })
            }
        };
        Ok(value)
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn simulate(scenario_path: &Path, config_path: Option<&Path>) -> Result<Report> {
    let config = load_config(config_path)?;
    let raw = std::fs::read_to_string(scenario_path)
        .with_context(|| format!("reading scenario {}", scenario_path.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", scenario_path.display()))?;

    let sim = Simulation::new(config, &scenario)?;
    info!(
        "Replaying {} steps over {} nodes and {} apps",
        scenario.steps.len(),
        scenario.nodes.len(),
        scenario.apps.len()
    );

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = match sim.run(step) {
            Ok(value) => StepOutcome {
                index,
                step: step.clone(),
                result: Some(value).filter(|v| !v.is_null()),
                error: None,
            },
            Err(e) => {
                warn!("Step {} rejected: {:#}", index, e);
                StepOutcome { index, step: step.clone(), result: None, error: Some(format!("{:#}", e)) }
            }
        };
        steps.push(outcome);
    }

    Ok(Report {
        round: sim.clock.current_round_id(),
        height: sim.clock.current_height(),
        steps,
        apps: sim.engine.app_summaries(),
        unendorsed: sim.engine.unendorsed_app_ids(),
        eligible: sim.engine.eligible_app_ids(),
        events: sim.engine.drain_events(),
    })
}

fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateConfig { path } => {
            let config = load_config(Some(path.as_path()))?;
            println!(
                "Config OK: threshold {}, {} scored levels, grace {}, cooldown {}, reconcile on round start {}",
                config.score_table.threshold,
                config.score_table.points.values().filter(|p| **p > 0).count(),
                config.grace_period,
                config.cooldown_period,
                config.reconcile_on_round_start
            );
        }
        Commands::PrintDefaultConfig => {
            print!("{}", EngineConfig::default().to_yaml_string()?);
        }
        Commands::Simulate { scenario, config } => {
            let report = simulate(&scenario, config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
