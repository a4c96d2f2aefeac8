use std::time::Duration;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

mod catalogs;
mod classifier;
mod config;
mod database;
mod deal_finder;
mod digest;
mod engine;
mod error;
mod models;
mod telegram;
mod traits;

use config::Config;
use deal_finder::DealFinder;
use telegram::commands::CommandRouter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting game deal finder bot");

    let config = Config::from_env();
    let finder = DealFinder::new(&config).await?;

    // Run once immediately so a fresh deploy reports current deals
    if let Err(e) = finder.run_cycle().await {
        error!("Error during initial cycle: {}", e);
    }

    let router = CommandRouter::new(&config, finder.clone());
    tokio::spawn(router.run());

    let sched = JobScheduler::new().await?;

    let job_finder = finder.clone();
    sched
        .add(Job::new_async(config.poll_cron.as_str(), move |_uuid, _l| {
            let finder = job_finder.clone();
            Box::pin(async move {
                if let Err(e) = finder.run_cycle().await {
                    error!("Error running deal cycle: {}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started - polling storefronts on '{}'", config.poll_cron);
    sched.start().await?;

    // Keep the program running
    loop {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
}
