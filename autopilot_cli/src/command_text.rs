use std::num::ParseIntError;
use std::path::PathBuf;

use sim_schema::{ParseScenarioFlagError, ScenarioFlag, ShipmentId, SkuId};
use thiserror::Error;

use core_sim::views::AT_RISK_LIMIT;

const DEFAULT_EXCEPTION_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Tick { steps: u32 },
    Start,
    Stop,
    Toggle(ScenarioFlag),
    Kpis,
    Exceptions { limit: usize },
    Rebalance(SkuId),
    Quotes(ShipmentId),
    Carriers,
    AtRisk { limit: usize },
    Watch,
    Positions(SkuId),
    Drift,
    Playbooks,
    /// Raw JSON action document; parsed by the engine so unknown kinds reach the audit log.
    Act(String),
    Best { exception_id: String },
    Snapshot(PathBuf),
    Reset { seed: Option<u64> },
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error(transparent)]
    InvalidFlag(#[from] ParseScenarioFlagError),
}

pub fn parse_command_line(input: &str) -> Result<ConsoleCommand, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_ascii_lowercase(), rest.trim()),
        None => (trimmed.to_ascii_lowercase(), ""),
    };
    let mut parts = rest.split_whitespace();

    match verb.as_str() {
        "tick" => {
            let steps = parts.next().unwrap_or("1");
            Ok(ConsoleCommand::Tick {
                steps: parse_u32(steps, "tick steps")?,
            })
        }
        "start" => Ok(ConsoleCommand::Start),
        "stop" => Ok(ConsoleCommand::Stop),
        "toggle" => {
            let flag = parts.next().ok_or(CommandParseError::MissingArgument("flag"))?;
            Ok(ConsoleCommand::Toggle(flag.parse()?))
        }
        "kpis" => Ok(ConsoleCommand::Kpis),
        "exceptions" => {
            let limit = match parts.next() {
                Some(value) => parse_u32(value, "exception limit")? as usize,
                None => DEFAULT_EXCEPTION_LIMIT,
            };
            Ok(ConsoleCommand::Exceptions { limit })
        }
        "rebalance" => {
            let sku = parts.next().ok_or(CommandParseError::MissingArgument("sku"))?;
            Ok(ConsoleCommand::Rebalance(SkuId::new(sku)))
        }
        "quotes" => {
            let shipment = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("shipment"))?;
            Ok(ConsoleCommand::Quotes(ShipmentId::new(shipment)))
        }
        "carriers" => Ok(ConsoleCommand::Carriers),
        "atrisk" => {
            let limit = match parts.next() {
                Some(value) => parse_u32(value, "at-risk limit")? as usize,
                None => AT_RISK_LIMIT,
            };
            Ok(ConsoleCommand::AtRisk { limit })
        }
        "watch" => Ok(ConsoleCommand::Watch),
        "positions" => {
            let sku = parts.next().ok_or(CommandParseError::MissingArgument("sku"))?;
            Ok(ConsoleCommand::Positions(SkuId::new(sku)))
        }
        "drift" => Ok(ConsoleCommand::Drift),
        "playbooks" => Ok(ConsoleCommand::Playbooks),
        "act" => {
            if rest.is_empty() {
                return Err(CommandParseError::MissingArgument("action json"));
            }
            Ok(ConsoleCommand::Act(rest.to_string()))
        }
        "best" => {
            let id = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("exception id"))?;
            Ok(ConsoleCommand::Best {
                exception_id: id.to_string(),
            })
        }
        "snapshot" => {
            let dir = parts.next().unwrap_or(".");
            Ok(ConsoleCommand::Snapshot(PathBuf::from(dir)))
        }
        "reset" => {
            let seed = parts.next().map(|s| parse_u64(s, "reset seed")).transpose()?;
            Ok(ConsoleCommand::Reset { seed })
        }
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, CommandParseError> {
    value
        .parse::<u32>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_u64(value: &str, context: &'static str) -> Result<u64, CommandParseError> {
    value
        .parse::<u64>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}
