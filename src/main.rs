pub mod models {
    pub mod sensor;
}

pub mod cli;
pub mod config;
pub mod db {
    pub mod models;
}
pub mod error;
pub mod schema;
pub mod stores;
pub mod utils;
pub mod services {
    pub mod counters;
    pub mod create;
    pub mod indexer;
    pub mod profiles;
    pub mod query;
    pub mod record;
    pub mod registrar;
    pub mod seed;
    pub mod snapshots;
    pub mod telemetry;
}

use crate::cli::{Command, Invocation};
use crate::config::Config;
use crate::stores::Stores;
use crate::stores::cache::RedisCache;
use crate::stores::document::MongoProfileStore;
use crate::stores::relational::PgIdentityStore;
use crate::stores::search::ElasticsearchClient;
use crate::stores::timeseries::TimescaleStore;
use crate::stores::wide_column::CassandraStore;
use diesel::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::{error, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
pub const TIMESCALE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations_ts");

fn apply_database_migrations(conn: &mut PgConnection, label: &str, migrations: EmbeddedMigrations) -> Result<(), String> {
    match conn.run_pending_migrations(migrations) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("{} schema is up to date; no migrations were applied", label);
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} {} migration(s): {}", applied.len(), label, names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying {} migrations failed: {}", label, e)),
    }
}

fn connect_postgres(url: &str, label: &str, migrations: EmbeddedMigrations) -> Result<PgConnection, String> {
    let mut conn = PgConnection::establish(url).map_err(|e| format!("{} connection failed: {}", label, e))?;
    info!("Connected to {}", label);
    apply_database_migrations(&mut conn, label, migrations)?;
    Ok(conn)
}

pub fn run(command: Command) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (elasticsearch={}, cassandra_nodes={}, request_timeout={}s)",
        cfg.elasticsearch_url,
        cfg.cassandra_nodes.join(","),
        cfg.request_timeout.as_secs()
    );

    // 2) Relational + time-series databases, migrated on connect
    let relational = PgIdentityStore::new(connect_postgres(&cfg.database_url, "relational database", MIGRATIONS)?);
    let timeseries = TimescaleStore::new(connect_postgres(
        &cfg.timescale_url,
        "timescale database",
        TIMESCALE_MIGRATIONS,
    )?);

    // 3) Remaining stores
    let documents = MongoProfileStore::connect(&cfg.mongodb_url).map_err(|e| format!("MongoDB: {}", e))?;
    info!("Connected to MongoDB");
    let columns = CassandraStore::connect(&cfg.cassandra_nodes).map_err(|e| format!("Cassandra: {}", e))?;
    info!("Connected to Cassandra");
    let cache = RedisCache::connect(&cfg.redis_url).map_err(|e| format!("Redis: {}", e))?;
    info!("Connected to Redis");
    let search = ElasticsearchClient::new(&cfg.elasticsearch_url, cfg.request_timeout);

    let stores = Stores {
        relational: &relational,
        documents: &documents,
        search: &search,
        columns: &columns,
        timeseries: &timeseries,
        cache: &cache,
    };

    // 4) Dispatch
    let response = cli::dispatch(&stores, command).map_err(|e| format!("{} ({})", e, e.status()))?;
    let out = serde_json::to_string_pretty(&response).map_err(|e| format!("encode response: {}", e))?;
    println!("{}", out);
    Ok(())
}

fn main() {
    let Invocation { env_file, command } = match cli::parse_args(std::env::args().skip(1)) {
        Ok(inv) => inv,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    let loaded_env = match env_file {
        Some(path) if !path.is_file() => {
            eprintln!("fatal: env file not found: {}", path.display());
            std::process::exit(1);
        }
        Some(path) => Some(path),
        None => std::env::current_dir().ok().map(|cwd| cwd.join(".env")).filter(|p| p.is_file()),
    };
    let applied = match loaded_env.as_deref().map(config::load_env_file).transpose() {
        Ok(applied) => applied,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let (Some(path), Some(count)) = (loaded_env.as_ref(), applied) {
        info!("Environment loaded from {} ({} variable(s) applied)", path.display(), count);
    }

    info!(
        "senser {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
