use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use trigger_rs::blackboard::MemoryBlackboard;
use trigger_rs::error::{BlackboardError, TriggerError};
use trigger_rs::expression::Value;
use trigger_rs::trigger::{Trigger, TriggerLoader, TriggerSet};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and type-check an expression
    Check {
        /// The expression to check
        expression: String,
    },
    /// Evaluate an expression against a fresh blackboard
    ///
    /// The whole expression is a condition, so a bare name such as `x` is
    /// read as a boolean. Compare numbers explicitly: `x > 0`.
    Eval {
        /// The expression to evaluate
        expression: String,

        /// Blackboard values, e.g. --set player.level=5
        #[arg(short, long, value_name = "NAME=VALUE")]
        set: Vec<String>,
    },
    /// Link every trigger in a file and apply updates in order
    Run {
        /// Path to the trigger file (falls back to TRIGGER_FILE)
        #[arg(short, long)]
        file: Option<String>,

        /// Updates applied one after another, e.g. --set gold=100
        #[arg(short, long, value_name = "NAME=VALUE")]
        set: Vec<String>,
    },
}

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Check { expression } => {
            let mut trigger = Trigger::new(expression);
            trigger.compile()?;
            let root = trigger
                .expression()
                .context("Compiled trigger has no expression")?;

            println!("Expression: {}", root);
            println!("Type: {}", root.data_type());
            for group in trigger.reference_groups() {
                println!("Reference: {} ({})", group.name, group.data_type);
            }
            for warning in trigger.warnings() {
                println!("Warning: {}", warning);
            }
        }
        Commands::Eval { expression, set } => {
            println!("{}", evaluate(expression, &set)?);
        }
        Commands::Run { file, set } => {
            let path = file
                .or_else(|| std::env::var("TRIGGER_FILE").ok())
                .context("No trigger file given; pass --file or set TRIGGER_FILE")?;
            let definition = TriggerLoader::new()
                .load(&path)
                .with_context(|| format!("Failed to load trigger file '{}'", path))?;
            log::info!(
                "Loaded {} triggers from {}",
                definition.triggers.len(),
                path
            );

            let mut blackboard = MemoryBlackboard::new(&definition.blackboard)?;
            let mut triggers = TriggerSet::from_definitions(&definition.triggers)?;
            for (id, e) in triggers.link_all(&mut blackboard) {
                eprintln!("Trigger '{}' disabled: {}", id, e);
            }
            println!("Active: {}", format_ids(&triggers.active_ids()));

            for assignment in &set {
                let (name, value) = match parse_assignment(assignment) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        eprintln!("{:#}", e);
                        continue;
                    }
                };
                if let Err(e) = blackboard.set(&name, value.clone()) {
                    eprintln!("Cannot set '{}': {}", name, e);
                    continue;
                }
                println!("{} = {}", name, value);
                for transition in triggers.poll_transitions() {
                    let state = if transition.active { "active" } else { "inactive" };
                    println!("  {} -> {}", transition.id, state);
                }
            }

            println!("Active: {}", format_ids(&triggers.active_ids()));
            triggers.unlink_all(&mut blackboard);
        }
    }

    Ok(())
}

fn evaluate(expression: String, assignments: &[String]) -> Result<Value> {
    let mut blackboard = MemoryBlackboard::empty();
    for assignment in assignments {
        let (name, value) = parse_assignment(assignment)?;
        blackboard
            .set(&name, value)
            .with_context(|| format!("Cannot set '{}'", name))?;
    }

    let mut trigger = Trigger::new(expression);
    if let Err(e) = trigger.link(&mut blackboard) {
        if let TriggerError::Binding(BlackboardError::TypeMismatch { name, requested, .. }) = &e {
            let hint = format!(
                "'{}' is used as a {} here; compare it explicitly, e.g. '{} > 0'",
                name, requested, name
            );
            return Err(anyhow::Error::new(e).context(hint));
        }
        return Err(e.into());
    }
    let result = trigger.evaluate();
    trigger.unlink(&mut blackboard);
    Ok(result?)
}

/// Split `name=value`; the value is read as JSON and falls back to a string
fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = assignment.split_once('=') else {
        bail!("Expected NAME=VALUE, got '{}'", assignment);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing name in '{}'", assignment);
    }
    let raw = raw.trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

fn format_ids(ids: &[&str]) -> String {
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.join(", ")
    }
}
