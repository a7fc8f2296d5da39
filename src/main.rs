mod catalog;
mod config;
mod data;
mod error;
mod generator;
mod pipeline;
mod projector;
mod server;
mod store;
mod validator;

use log::{error, info};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{MemoryStore, SeedData};

const BUNDLED_SEED: &str = include_str!("../data/seed.json");

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let seed = match &config.server.seed_path {
        Some(path) => SeedData::from_file(path),
        None => {
            info!("No seed_path configured; using the bundled seed data.");
            SeedData::from_json(BUNDLED_SEED)
        }
    };
    let seed = match seed {
        Ok(seed) => seed,
        Err(e) => {
            error!("Failed to load seed data: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(server::AppState {
        store: Arc::new(MemoryStore::with_seed(seed)),
        settings: config.scheduler.clone(),
    });

    if let Err(e) = server::run_server(&config.server, state).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
