//! `capacity`: operator counters and the remaining capacity.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use waitroom_core::{CapacityMonitor, CapacityState, Derived};

use crate::cli::{CapacityArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output::{self, DetailRow, Tone, paint};

/// Reports arrive as one mutation per counter; wait this long after the
/// first change so a single report renders once.
const SETTLE: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize)]
struct CapacityView {
    serving_counter: Option<i64>,
    waiting_room_size: Option<i64>,
    active_tokens: Option<i64>,
    expired_tokens: Option<i64>,
    remaining_capacity: Derived<i64>,
    last_changed: Option<DateTime<Utc>>,
}

impl CapacityView {
    fn new(state: &CapacityState, last_changed: Option<DateTime<Utc>>) -> Self {
        Self {
            serving_counter: state.serving_counter,
            waiting_room_size: state.waiting_room_size,
            active_tokens: state.active_tokens,
            expired_tokens: state.expired_tokens,
            remaining_capacity: state.remaining_capacity(),
            last_changed,
        }
    }

    fn counters_eq(&self, other: &Self) -> bool {
        self.serving_counter == other.serving_counter
            && self.waiting_room_size == other.waiting_room_size
            && self.active_tokens == other.active_tokens
            && self.expired_tokens == other.expired_tokens
    }
}

fn counter(value: Option<i64>, color: bool) -> String {
    match value {
        Some(n) => n.to_string(),
        None => paint("unknown", Tone::Warn, color),
    }
}

fn detail_rows(v: &CapacityView, color: bool) -> Vec<DetailRow> {
    let remaining = match v.remaining_capacity {
        Derived::Known(n) if n < 0 => paint(&n.to_string(), Tone::Bad, color),
        Derived::Known(n) => paint(&n.to_string(), Tone::Good, color),
        Derived::Unknown => paint("unknown", Tone::Warn, color),
    };
    vec![
        DetailRow::new("Serving counter", counter(v.serving_counter, color)),
        DetailRow::new("Waiting room size", counter(v.waiting_room_size, color)),
        DetailRow::new("Active tokens", counter(v.active_tokens, color)),
        DetailRow::new("Expired tokens", counter(v.expired_tokens, color)),
        DetailRow::new("Remaining capacity", remaining),
        DetailRow::new(
            "Last changed",
            v.last_changed
                .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ),
    ]
}

fn view_of(monitor: &CapacityMonitor) -> CapacityView {
    CapacityView::new(&monitor.snapshot(), monitor.last_changed())
}

fn render(view: &CapacityView, global: &GlobalOpts) {
    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, view, detail_rows, color);
    output::print_output(&out, global.quiet);
}

pub async fn handle(args: CapacityArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let monitor_config = config::resolve_monitor_config(global)?;
    let poll_interval = monitor_config.poll.period();
    let monitor = CapacityMonitor::connect(monitor_config)?;

    let result = if let Some(n) = args.admit {
        admit(&monitor, global, n).await
    } else if args.watch {
        watch(&monitor, global, poll_interval).await
    } else {
        show_once(&monitor, global).await
    };

    monitor.shutdown().await;
    result
}

async fn show_once(monitor: &CapacityMonitor, global: &GlobalOpts) -> Result<(), CliError> {
    monitor.refresh().await?;
    render(&view_of(monitor), global);
    Ok(())
}

async fn admit(monitor: &CapacityMonitor, global: &GlobalOpts, n: u32) -> Result<(), CliError> {
    monitor.increment_serving_counter(i64::from(n)).await?;
    render(&view_of(monitor), global);
    Ok(())
}

async fn watch(
    monitor: &CapacityMonitor,
    global: &GlobalOpts,
    poll_interval: Duration,
) -> Result<(), CliError> {
    let mut states = monitor.subscribe();
    monitor.start().await;

    let mut shown: Option<CapacityView> = None;
    let mut health = tokio::time::interval(poll_interval);
    health.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_none() {
                    return Ok(());
                }
                tokio::time::sleep(SETTLE).await;
                let view = view_of(monitor);
                if shown.as_ref().is_none_or(|prev| !prev.counters_eq(&view)) {
                    render(&view, global);
                    shown = Some(view);
                }
            }
            _ = health.tick() => {
                if !monitor.is_running().await {
                    return Err(CliError::Internal {
                        message: "capacity polling stopped after repeated failures".into(),
                    });
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("watch interrupted");
                return Ok(());
            }
        }
    }
}
