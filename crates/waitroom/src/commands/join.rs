//! `join`: take a place in line, wait to be served, then check out.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use waitroom_core::{AdmissionPhase, AdmissionSession, AdmissionState, Derived};

use crate::cli::{GlobalOpts, JoinArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, DetailRow, Tone, paint};

/// What `join` prints once it is done.
#[derive(Debug, Serialize)]
struct AdmissionView {
    phase: AdmissionPhase,
    event_id: String,
    request_id: Option<String>,
    my_position: u64,
    queue_position: u64,
    people_ahead: Derived<u64>,
    has_token: bool,
    token_expires_in: Option<u64>,
    receipt: Option<serde_json::Value>,
}

impl From<&AdmissionState> for AdmissionView {
    fn from(s: &AdmissionState) -> Self {
        Self {
            phase: s.phase(),
            event_id: s.event_id.clone(),
            request_id: s.request_id.as_ref().map(ToString::to_string),
            my_position: s.my_position,
            queue_position: s.queue_position,
            people_ahead: s.people_ahead(),
            has_token: s.has_token(),
            token_expires_in: s.token.as_ref().and_then(waitroom_core::Token::expires_in),
            receipt: s.receipt.as_ref().map(|r| r.as_json().clone()),
        }
    }
}

fn detail_rows(v: &AdmissionView, color: bool) -> Vec<DetailRow> {
    let phase_tone = match v.phase {
        AdmissionPhase::Completed | AdmissionPhase::Admitted => Tone::Good,
        AdmissionPhase::Queued => Tone::Warn,
        AdmissionPhase::Unregistered => Tone::Normal,
    };
    let ahead_tone = if v.people_ahead.is_unknown() {
        Tone::Warn
    } else {
        Tone::Normal
    };

    let mut rows = vec![
        DetailRow::new("Phase", paint(&v.phase.to_string(), phase_tone, color)),
        DetailRow::new("Event", v.event_id.clone()),
        DetailRow::new("Request ID", v.request_id.clone().unwrap_or_else(|| "-".into())),
        DetailRow::new("My position", v.my_position.to_string()),
        DetailRow::new("Serving position", v.queue_position.to_string()),
        DetailRow::new(
            "People ahead",
            paint(&v.people_ahead.to_string(), ahead_tone, color),
        ),
        DetailRow::new("Token", if v.has_token { "issued" } else { "-" }),
    ];
    if let Some(secs) = v.token_expires_in {
        rows.push(DetailRow::new(
            "Token valid for",
            humantime::format_duration(Duration::from_secs(secs)).to_string(),
        ));
    }
    if let Some(ref receipt) = v.receipt {
        let text = match receipt {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        rows.push(DetailRow::new("Receipt", text));
    }
    rows
}

/// One line for the spinner while waiting.
fn progress_message(s: &AdmissionState) -> String {
    match s.phase() {
        AdmissionPhase::Unregistered => "joining the waiting room...".into(),
        AdmissionPhase::Queued => match s.people_ahead() {
            Derived::Known(0) => format!("position {}: you are next", s.my_position),
            Derived::Known(n) => format!("position {}: {n} ahead of you", s.my_position),
            Derived::Unknown if s.has_queue_position() => {
                format!("position {}: waiting for the line to move", s.my_position)
            }
            Derived::Unknown => "waiting for a queue position...".into(),
        },
        AdmissionPhase::Admitted => "admitted, checking out...".into(),
        AdmissionPhase::Completed => "checkout complete".into(),
    }
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

pub async fn handle(args: JoinArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut session_config = config::resolve_session_config(global)?;
    if let Some(query) = args.launch_query {
        session_config.launch_query_parameters = query.trim_start_matches('?').to_owned();
    }
    let checkout_enabled = !args.no_checkout && session_config.commerce_api.is_some();

    let session = AdmissionSession::connect(session_config)?;
    let bar = spinner(global.quiet);

    let watcher = {
        let bar = bar.clone();
        let mut states = session.subscribe();
        bar.set_message(progress_message(states.current()));
        tokio::spawn(async move {
            while let Some(state) = states.changed().await {
                bar.set_message(progress_message(&state));
            }
        })
    };

    let result = run(&session, checkout_enabled).await;

    watcher.abort();
    bar.finish_and_clear();

    let view = AdmissionView::from(session.snapshot().as_ref());
    session.shutdown().await;
    result?;

    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, &view, detail_rows, color);
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn run(session: &AdmissionSession, checkout: bool) -> Result<(), CliError> {
    until_interrupted(admit(session, checkout), async {
        // A failed handler install means no Ctrl-C will ever arrive.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Drive `work` unless `interrupt` resolves first. Covers every await in
/// `work`, joining and checkout included.
async fn until_interrupted(
    work: impl Future<Output = Result<(), CliError>>,
    interrupt: impl Future<Output = ()>,
) -> Result<(), CliError> {
    tokio::select! {
        result = work => result,
        () = interrupt => Err(CliError::Cancelled),
    }
}

async fn admit(session: &AdmissionSession, checkout: bool) -> Result<(), CliError> {
    let request_id = session.join().await?;
    tracing::debug!(%request_id, "queued");

    let token = session.wait_for_token().await?;
    tracing::debug!(expires_in = ?token.expires_in(), "token issued");

    if checkout {
        session.checkout().await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use waitroom_core::{RequestId, Token};

    use super::*;

    fn queued(my: u64, serving: u64) -> AdmissionState {
        AdmissionState {
            event_id: "Sample".into(),
            request_id: Some(RequestId::new("req-1").unwrap()),
            my_position: my,
            queue_position: serving,
            ..AdmissionState::default()
        }
    }

    #[test]
    fn progress_reports_people_ahead() {
        assert_eq!(progress_message(&queued(10, 4)), "position 10: 6 ahead of you");
        assert_eq!(progress_message(&queued(10, 10)), "position 10: you are next");
        assert_eq!(
            progress_message(&queued(10, 0)),
            "position 10: waiting for the line to move"
        );
        assert_eq!(
            progress_message(&AdmissionState::default()),
            "joining the waiting room..."
        );
    }

    #[test]
    fn view_hides_the_token_secret() {
        let mut state = queued(3, 3);
        state.token = Some(Token::new("super-secret").unwrap().with_expires_in(3600));
        let view = AdmissionView::from(&state);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(json.contains(r#""token_expires_in":3600"#));
    }

    #[test]
    fn unknown_people_ahead_is_null_in_json() {
        let view = AdmissionView::from(&queued(7, 0));
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["people_ahead"].is_null());
    }

    #[tokio::test]
    async fn interrupt_cancels_work_still_in_flight() {
        let stuck = std::future::pending::<Result<(), CliError>>();
        let result = until_interrupted(stuck, std::future::ready(())).await;
        assert!(matches!(result, Err(CliError::Cancelled)));
    }

    #[tokio::test]
    async fn finished_work_wins_over_a_quiet_interrupt() {
        let result = until_interrupted(async { Ok(()) }, std::future::pending()).await;
        assert!(result.is_ok());

        let failed = until_interrupted(
            async {
                Err(CliError::Internal {
                    message: "checkout failed".into(),
                })
            },
            std::future::pending(),
        )
        .await;
        assert!(matches!(failed, Err(CliError::Internal { .. })));
    }

    #[test]
    fn rows_include_receipt_once_checked_out() {
        let mut state = queued(1, 1);
        state.token = Some(Token::new("t").unwrap());
        state.receipt = Some(waitroom_core::Receipt::from("rcpt-42"));
        let rows = detail_rows(&AdmissionView::from(&state), false);
        let receipt = rows.iter().find(|r| r.field == "Receipt").unwrap();
        assert_eq!(receipt.value, "rcpt-42");
        assert_eq!(rows[0].value, AdmissionPhase::Completed.to_string());
    }
}
