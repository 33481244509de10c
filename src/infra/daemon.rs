// src/infra/daemon.rs — Long-running service: HTTP endpoint plus daily reminders

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;

use crate::api::{self, ApiState};
use crate::bot::connector::BotConnector;
use crate::bot::TimesheetBot;
use crate::infra::config::Config;
use crate::infra::scheduler::{parse_daily_time, DailyTrigger};
use crate::store::StoreHandle;
use crate::timesheet::reminder::ReminderDispatcher;
use crate::timesheet::session::{InMemorySessionStore, SessionStore};

/// How often the loop checks the reminder trigger and session TTL.
const TICK: Duration = Duration::from_secs(30);

/// Everything the service shares between the HTTP endpoint and the
/// reminder job.
pub struct AppContext {
    pub config: Config,
    pub store: StoreHandle,
    pub sessions: Arc<dyn SessionStore>,
    pub connector: Arc<dyn BotConnector>,
}

impl AppContext {
    pub fn new(config: Config, store: StoreHandle, connector: Arc<dyn BotConnector>) -> Self {
        Self {
            config,
            store,
            sessions: Arc::new(InMemorySessionStore::new()),
            connector,
        }
    }

    pub fn bot(&self) -> TimesheetBot {
        TimesheetBot::new(
            self.connector.clone(),
            self.sessions.clone(),
            self.store.clone(),
            self.config.timesheet.clone(),
        )
    }

    pub fn reminders(&self) -> ReminderDispatcher {
        ReminderDispatcher::new(
            self.connector.clone(),
            self.store.clone(),
            self.sessions.clone(),
            self.config.timesheet.clone(),
            self.config.reminder.clone(),
        )
    }
}

/// Serve the bot endpoint and fire the daily reminder until Ctrl+C.
pub async fn run_daemon(ctx: AppContext) -> anyhow::Result<()> {
    tracing::info!("Timesheet bot starting...");

    let state = ApiState {
        bot: Arc::new(ctx.bot()),
    };
    let server_config = ctx.config.server.clone();
    let mut server = tokio::spawn(async move { api::start_server(&server_config, state).await });

    let dispatcher = Arc::new(ctx.reminders());
    let mut trigger = if ctx.config.reminder.enabled {
        let time = parse_daily_time(&ctx.config.reminder.time).ok_or_else(|| {
            anyhow::anyhow!("reminder.time must be HH:MM, got '{}'", ctx.config.reminder.time)
        })?;
        let trigger = DailyTrigger::new(time, Local::now().naive_local());
        tracing::info!("Daily reminder scheduled; next run at {}", trigger.next_fire());
        Some(trigger)
    } else {
        tracing::info!("Daily reminder disabled");
        None
    };
    let session_ttl = ctx.config.timesheet.session_ttl();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut tick = tokio::time::interval(TICK);
    // Consume the immediate first tick
    tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = Local::now();
                if trigger.as_mut().is_some_and(|t| t.poll(now.naive_local())) {
                    spawn_reminder_run(dispatcher.clone(), now.date_naive());
                }
                if let Some(ttl) = session_ttl {
                    let evicted = ctx.sessions.evict_idle(ttl);
                    if evicted > 0 {
                        tracing::info!("Evicted {} idle timesheet session(s)", evicted);
                    }
                }
            }
            result = &mut server => {
                return match result {
                    Ok(Ok(())) => Err(anyhow::anyhow!("HTTP server stopped unexpectedly")),
                    Ok(Err(e)) => Err(e.context("HTTP server failed")),
                    Err(e) => Err(anyhow::anyhow!("HTTP server task panicked: {e}")),
                };
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    server.abort();
    tracing::info!("Timesheet bot stopped.");
    Ok(())
}

fn spawn_reminder_run(dispatcher: Arc<ReminderDispatcher>, today: chrono::NaiveDate) {
    tokio::spawn(async move {
        if let Err(e) = dispatcher.run(today).await {
            tracing::error!("Reminder run failed: {}", e);
        }
    });
}
