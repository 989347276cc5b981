//! Run the overdue sweep once and deliver the resulting notifications.
//!
//! Meant for cron or manual use; the server runs the same sweep on its own
//! worker.

use std::sync::Arc;

use anyhow::Context;

use libris_server::{
    config::AppConfig,
    repository::Repository,
    services::{
        email::EmailService,
        events::EventBus,
        notifications::NotificationService,
        overdue::{OverdueChecker, TriggerSource},
    },
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = telemetry::init_tracing(&config.logging);

    let repository = Repository::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    let (events, mut received) = EventBus::new();
    let checker = OverdueChecker::new(repository.clone(), events);
    let notifications = NotificationService::new(
        repository,
        Arc::new(EmailService::new(config.email.clone())),
    );

    tracing::info!(source = ?TriggerSource::Manual, "Checking for overdue reservations");
    let found = checker.run_once().await?;

    // The checker owns the only sender; dropping it closes the queue
    drop(checker);

    let mut failed = 0usize;
    while let Some(event) = received.recv().await {
        if let Err(e) = notifications.dispatch(&event).await {
            failed += 1;
            tracing::error!(
                reservation_id = event.reservation().id,
                "Failed to notify overdue reservation: {}",
                e
            );
        }
    }

    tracing::info!(found, failed, "Overdue check complete");
    println!("Found {} overdue reservation(s); {} notification(s) failed", found, failed);

    Ok(())
}
