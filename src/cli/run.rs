use super::config::{resolve_config_path, DaoConfig};
use super::init_logging;
use super::script::{Script, ScriptStep};
use daobase::governance::{
    AutoActionCaller, Clock, GovernanceCore, GovernanceResult, ManualClock, SystemClock,
};
use daobase::ledger::InMemoryLedger;
use daobase::voting::parse_duration_to_secs;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

type Core = GovernanceCore<InMemoryLedger, ManualClock>;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub dao: String,
    pub steps: Vec<StepReport>,
    pub proposals: Vec<ProposalLine>,
    pub balances: Vec<BalanceLine>,
    pub audit_entries: usize,
    pub audit_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProposalLine {
    pub id: u64,
    pub action: String,
    pub proposer: String,
    pub state: String,
    pub yes: u64,
    pub no: u64,
    pub executed: bool,
}

#[derive(Debug, Serialize)]
pub struct BalanceLine {
    pub token: String,
    pub holder: String,
    pub amount: u64,
}

/// Bootstrap the configured DAO and replay a script against it.
///
/// The ledger is in-memory and the clock starts at the current time; it
/// only moves on `advance` steps. A failing step is reported and the replay
/// continues with the next one.
pub fn execute(
    config_path: Option<String>,
    script_path: String,
    json: bool,
    snapshot: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path);
    let config = DaoConfig::load(&config_path)?;
    init_logging(&config.logging)?;

    let script = Script::load(Path::new(&script_path))?;
    let clock = ManualClock::new(SystemClock.now());
    let mut core = config.builder()?.with_clock(clock.clone()).build()?;

    info!(dao = %config.dao.name, steps = script.steps.len(), "replaying script");

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let result = apply_step(&mut core, &clock, step);
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => {
                warn!(step = index, error = %e, "step failed");
                (None, Some(e.to_string()))
            }
        };
        steps.push(StepReport {
            index,
            step: step.describe(),
            outcome,
            error,
        });
    }

    let report = build_report(&config.dao.name, &core, steps);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(path) = snapshot {
        let path = PathBuf::from(path);
        fs::write(&path, core.state().to_bytes()?)
            .map_err(|e| format!("Failed to write snapshot '{}': {}", path.display(), e))?;
        if !json {
            println!("Snapshot written to {}", path.display());
        }
    }

    Ok(())
}

fn apply_step(
    core: &mut Core,
    clock: &ManualClock,
    step: &ScriptStep,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let value = match step {
        ScriptStep::Request {
            caller,
            via: Some(via),
            action,
        } => to_value(AutoActionCaller::new(via.clone()).do_action(core, caller, action.clone()))?,
        ScriptStep::Request { caller, action, .. } => {
            to_value(core.request_action(caller, action.clone()))?
        }
        ScriptStep::Vote {
            proposal,
            voter,
            choice,
        } => to_value(core.vote(*proposal, voter, *choice))?,
        ScriptStep::Advance { duration } => {
            let secs = parse_duration_to_secs(duration)?;
            clock.advance(secs);
            serde_json::json!({ "now": clock.now() })
        }
        ScriptStep::CloseExpired => to_value(core.close_expired())?,
    };
    Ok(value)
}

fn to_value<T: Serialize>(
    result: GovernanceResult<T>,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(result?)?)
}

fn build_report(name: &str, core: &Core, steps: Vec<StepReport>) -> RunReport {
    let proposals = core
        .state()
        .proposals
        .iter()
        .map(|proposal| ProposalLine {
            id: proposal.id().0,
            action: proposal.action().to_string(),
            proposer: proposal.proposer().to_string(),
            state: format!("{:?}", proposal.voting().state()),
            yes: proposal.voting().stats().yes,
            no: proposal.voting().stats().no,
            executed: proposal.is_executed(),
        })
        .collect();

    let ledger = core.ledger();
    let balances = ledger
        .tokens()
        .flat_map(|token| {
            ledger.holders(token).map(move |(holder, amount)| BalanceLine {
                token: token.to_string(),
                holder: holder.to_string(),
                amount,
            })
        })
        .collect();

    RunReport {
        dao: name.to_string(),
        steps,
        proposals,
        balances,
        audit_entries: core.audit_log().len(),
        audit_verified: core.audit_log().verify().is_ok(),
    }
}

fn print_report(report: &RunReport) {
    println!("🏛  {}", report.dao);
    println!();

    for step in &report.steps {
        match (&step.outcome, &step.error) {
            (_, Some(error)) => println!("  [{}] ❌ {}: {}", step.index, step.step, error),
            (Some(outcome), None) => println!("  [{}] ✅ {}: {}", step.index, step.step, outcome),
            (None, None) => println!("  [{}] {}", step.index, step.step),
        }
    }

    println!();
    println!("Proposals:");
    if report.proposals.is_empty() {
        println!("  (none)");
    }
    for proposal in &report.proposals {
        println!(
            "  #{} {} by {}: {} (yes {}, no {}){}",
            proposal.id,
            proposal.action,
            proposal.proposer,
            proposal.state,
            proposal.yes,
            proposal.no,
            if proposal.executed { ", executed" } else { "" }
        );
    }

    println!();
    println!("Balances:");
    if report.balances.is_empty() {
        println!("  (none)");
    }
    for balance in &report.balances {
        println!("  {} {}: {}", balance.token, balance.holder, balance.amount);
    }

    println!();
    println!(
        "Audit log: {} entries, chain {}",
        report.audit_entries,
        if report.audit_verified { "verified" } else { "BROKEN" }
    );
}
