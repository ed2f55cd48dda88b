use color_eyre::Result;
use core_sim::numeric::{format_percent, format_units, format_usd};
use core_sim::playbook::{execution_note, PLAYBOOKS};
use core_sim::views::{
    at_risk_shipments, carrier_scorecard, choke_watchlist, cost_index_drift, inventory_positions,
    CarrierStatus,
};
use core_sim::{ActionRequest, TickReport, World};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::command_text::{parse_command_line, ConsoleCommand};
use crate::scheduler::TickScheduler;

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub struct Console {
    world: World,
    scheduler: TickScheduler,
}

impl Console {
    pub fn new(world: World, scheduler: TickScheduler) -> Self {
        Self { world, scheduler }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn handle(&mut self, command: ConsoleCommand) -> Reply {
        let text = match command {
            ConsoleCommand::Tick { steps } => {
                let mut last = None;
                for _ in 0..steps {
                    last = Some(self.world.tick());
                }
                match last {
                    Some(report) => tick_line(&self.world, &report),
                    None => "no ticks requested".to_string(),
                }
            }
            ConsoleCommand::Start => {
                if self.scheduler.start() {
                    format!("auto-tick every {}ms", self.scheduler.period().as_millis())
                } else {
                    "auto-tick already running".to_string()
                }
            }
            ConsoleCommand::Stop => {
                if self.scheduler.stop() {
                    "auto-tick stopped".to_string()
                } else {
                    "auto-tick not running".to_string()
                }
            }
            ConsoleCommand::Toggle(flag) => {
                let on = self.world.toggle_scenario(flag);
                let pin = self
                    .world
                    .scenario()
                    .pins
                    .pinned_for(flag)
                    .map(|pin| format!(" ({pin})"))
                    .unwrap_or_default();
                format!("{flag} {}{pin}", if on { "on" } else { "off" })
            }
            ConsoleCommand::Kpis => kpi_line(&self.world),
            ConsoleCommand::Exceptions { limit } => {
                let derived = self.world.derive();
                let mut out = String::new();
                for exception in derived.top(limit) {
                    out.push_str(&format!(
                        "{:<32} {:<26} {:>10}  score {:.2}  {}\n",
                        exception.id,
                        exception.kind(),
                        format_usd(exception.value_at_risk),
                        exception.risk_score,
                        exception.rationale
                    ));
                }
                if out.is_empty() {
                    out.push_str("no exceptions");
                }
                out.trim_end().to_string()
            }
            ConsoleCommand::Rebalance(sku) => {
                let proposals = self.world.rebalance_proposals(&sku);
                if proposals.is_empty() {
                    format!("no rebalance for {sku}")
                } else {
                    proposals
                        .iter()
                        .map(|p| {
                            format!(
                                "{} -> {}  {} units  {}d  net {}",
                                p.from_dc,
                                p.to_dc,
                                format_units(i64::from(p.qty)),
                                p.transit_days,
                                format_usd(p.net_value)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ConsoleCommand::Quotes(shipment) => {
                let quotes = self.world.retender_quotes(&shipment);
                if quotes.is_empty() {
                    format!("no quotes for {shipment}")
                } else {
                    quotes
                        .iter()
                        .map(|q| {
                            format!(
                                "{:<10} freight {:>9}  late {}  expected {}",
                                q.carrier,
                                format_usd(q.freight),
                                format_percent(q.late_prob, 1),
                                format_usd(q.expected_total)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ConsoleCommand::Carriers => {
                let derived = self.world.derive();
                carrier_scorecard(&self.world, &derived)
                    .iter()
                    .map(|row| {
                        format!(
                            "{:<10} {:<20} on-time {}  cost x{:.2}{}",
                            row.carrier,
                            row.name,
                            format_percent(row.on_time_adjusted, 1),
                            row.cost_index,
                            if row.status == CarrierStatus::Disrupted {
                                "  DISRUPTED"
                            } else {
                                ""
                            }
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            ConsoleCommand::AtRisk { limit } => {
                let derived = self.world.derive();
                let rows = at_risk_shipments(&self.world, &derived, limit);
                if rows.is_empty() {
                    "no shipments in flight".to_string()
                } else {
                    rows.iter()
                        .map(|row| {
                            format!(
                                "{:<9} {} -> {}  {} x{}  {}  eta {}d  late {}",
                                row.shipment,
                                row.from,
                                row.to,
                                row.sku,
                                format_units(i64::from(row.qty)),
                                row.carrier,
                                row.eta_days,
                                format_percent(row.late_prob, 1)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ConsoleCommand::Watch => {
                let derived = self.world.derive();
                choke_watchlist(&self.world, &derived)
                    .iter()
                    .map(|row| {
                        let relief = if row.relief_days > 0 {
                            format!("  relief {}d", row.relief_days)
                        } else {
                            String::new()
                        };
                        format!(
                            "{:<6} cap {:>6}  in {:>6}  out {:>6}  util {}  risk {:.2}{relief}",
                            row.dc,
                            format_units(i64::from(row.effective_capacity)),
                            format_units(row.inbound as i64),
                            format_units(row.outbound as i64),
                            format_percent(row.utilization, 0),
                            row.risk
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            ConsoleCommand::Positions(sku) => {
                if self.world.baseline().sku(&sku).is_none() {
                    format!("unknown sku {sku}")
                } else {
                    let derived = self.world.derive();
                    inventory_positions(&self.world, &derived, &sku)
                        .iter()
                        .map(|row| {
                            format!(
                                "{:<6} on hand {:>6}  in transit {:>6}  {:.1}/day  DOC {:.1}",
                                row.dc,
                                format_units(i64::from(row.on_hand)),
                                format_units(row.in_transit as i64),
                                row.demand_per_day,
                                row.doc
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ConsoleCommand::Drift => {
                let drift = cost_index_drift(&self.world);
                format!(
                    "cost index {:.3}  drift {:+.3}",
                    drift.latest, drift.drift
                )
            }
            ConsoleCommand::Playbooks => {
                let mut out = String::new();
                for playbook in &PLAYBOOKS {
                    out.push_str(playbook.title);
                    out.push('\n');
                    for (step, text) in playbook.steps.iter().enumerate() {
                        out.push_str(&format!("  {}. {text}\n", step + 1));
                    }
                }
                out.push_str(execution_note(&self.world));
                out
            }
            ConsoleCommand::Act(json) => match ActionRequest::parse(&json) {
                Ok(request) => format!("{:?}", self.world.execute_request(request)),
                Err(err) => format!("error: {err}"),
            },
            ConsoleCommand::Best { exception_id } => {
                match self.world.execute_recommendation(&exception_id, 0) {
                    Some(outcome) => format!("{outcome:?}"),
                    None => format!("no recommendation for {exception_id}"),
                }
            }
            ConsoleCommand::Snapshot(dir) => match self.world.export_snapshot(&dir) {
                Ok(path) => format!("wrote {}", path.display()),
                Err(err) => format!("error: {err}"),
            },
            ConsoleCommand::Reset { seed } => {
                let seed = seed.unwrap_or_else(|| self.world.seed());
                self.scheduler.stop();
                self.world.reset_to_baseline(seed);
                format!("reset to seed {seed}")
            }
            ConsoleCommand::Quit => return Reply::Quit,
        };
        Reply::Text(text)
    }

    /// Advances one day on behalf of the scheduler.
    pub fn scheduled_tick(&mut self) -> String {
        let report = self.world.tick();
        tick_line(&self.world, &report)
    }
}

pub fn kpi_line(world: &World) -> String {
    let kpis = world.derive().kpis;
    format!(
        "day {}  VaR {}  service risk {}  avg DC util {}  late shipments {}",
        world.day(),
        format_usd(kpis.value_at_risk),
        format_percent(kpis.service_risk, 1),
        format_percent(kpis.avg_dc_utilization, 0),
        kpis.late_shipments
    )
}

fn tick_line(world: &World, report: &TickReport) -> String {
    format!(
        "{}  consumed {}  delivered {}",
        kpi_line(world),
        format_units(report.units_consumed as i64),
        report.delivered.len()
    )
}

enum Event {
    Line(Option<String>),
    Tick,
}

/// Reads commands from stdin until `quit` or EOF. Scheduled ticks and
/// commands are handled on this one task, one at a time.
pub async fn run_console(mut console: Console) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line?),
            _ = console.scheduler.next_tick() => Event::Tick,
        };

        let text = match event {
            Event::Tick => console.scheduled_tick(),
            Event::Line(None) => break,
            Event::Line(Some(line)) if line.trim().is_empty() => continue,
            Event::Line(Some(line)) => match parse_command_line(&line) {
                Ok(command) => match console.handle(command) {
                    Reply::Text(text) => text,
                    Reply::Quit => break,
                },
                Err(err) => format!("error: {err}"),
            },
        };
        stdout.write_all(text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    console.scheduler.stop();
    Ok(())
}
