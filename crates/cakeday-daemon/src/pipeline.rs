use std::sync::Arc;

use anyhow::{bail, Context};
use cakeday_core::{CakedayConfig, NotificationWindow};
use cakeday_scheduler::{NotificationCycle, SchedulerLoop};
use cakeday_store::{Database, EmployeeRepository, SqliteDeliveryLedger, SubscriptionRepository};
use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::info;

/// Wire the SQLite store and the configured notifier into a cycle.
pub fn build_cycle(config: &CakedayConfig, db: &Database) -> anyhow::Result<NotificationCycle> {
    let notifier =
        cakeday_notify::from_config(&config.smtp).context("failed to set up the notifier")?;
    info!(
        notifier = notifier.name(),
        dedupe = config.scheduler.dedupe,
        "notification pipeline ready"
    );

    let cycle = NotificationCycle::new(
        Arc::new(EmployeeRepository::new(db.clone())),
        Arc::new(SubscriptionRepository::new(db.clone())),
        notifier,
    );
    Ok(if config.scheduler.dedupe {
        cycle.with_ledger(Arc::new(SqliteDeliveryLedger::new(db.clone())))
    } else {
        cycle
    })
}

/// Run the scheduler until Ctrl-C / SIGTERM, then let the current cycle finish.
pub async fn serve(config: &CakedayConfig, db: &Database) -> anyhow::Result<()> {
    let scheduler = SchedulerLoop::new(
        build_cycle(config, db)?,
        config.scheduler.cadence(),
        config.scheduler.window_days,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    shutdown_signal().await;
    info!("shutdown requested; waiting for the current cycle to finish");
    // signal scheduler to stop
    let _ = shutdown_tx.send(true);
    scheduler_task.await.context("scheduler task panicked")?;
    Ok(())
}

/// One cycle on demand. Fails only when the birthday query itself failed,
/// so scripts can tell "nothing to do" from "could not look".
pub async fn run_once(
    config: &CakedayConfig,
    db: &Database,
    date: Option<NaiveDate>,
    days: Option<u32>,
) -> anyhow::Result<()> {
    let window = window_for(config, date, days);
    let report = build_cycle(config, db)?.run(window).await;
    println!("{window}: {report}");
    if report.aborted {
        bail!("notification cycle aborted");
    }
    Ok(())
}

pub fn window_for(
    config: &CakedayConfig,
    date: Option<NaiveDate>,
    days: Option<u32>,
) -> NotificationWindow {
    let days = days.unwrap_or(config.scheduler.window_days);
    match date {
        Some(start) => NotificationWindow::new(start, days),
        None => NotificationWindow::starting_today(days),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
