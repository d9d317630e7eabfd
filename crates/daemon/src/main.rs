use std::{collections::HashMap, env, sync::Arc, time::Duration};

use database::{DatabaseConnectionInfo, PgDatabase};
use fleets::{
    roundtrip::RoundtripFleetClient, street::StreetFleetClient,
    zone::ZoneFleetClient,
};
use model::{Position, Scope};
use tracking::{
    cycle::sweep_free_spaces, run_cycle, CycleError, CycleOptions,
    EngineConfig, FleetProfile, ReconciliationEngine, SnapshotProvider,
};

struct Job {
    provider: Arc<dyn SnapshotProvider>,
    profile: FleetProfile,
    scope: Scope,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_seconds(key: &str, default: u64) -> Duration {
    let seconds = env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(seconds)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `"montreal:59,quebec:90"` -> region to partner city id.
fn parse_city_ids(value: &str) -> HashMap<String, u32> {
    split_csv(value)
        .into_iter()
        .filter_map(|entry| {
            let (region, id) = entry.split_once(':')?;
            Some((region.trim().to_owned(), id.trim().parse().ok()?))
        })
        .collect()
}

fn jobs_from_env() -> Vec<Job> {
    let mut jobs = Vec::new();

    if let Ok(url) = env::var("ZONE_API_URL") {
        let consumer_key = env::var("ZONE_CONSUMER_KEY")
            .expect("expected ZONE_CONSUMER_KEY alongside ZONE_API_URL.");
        let company = env_or("ZONE_COMPANY", "zoomway");
        let provider: Arc<dyn SnapshotProvider> =
            Arc::new(ZoneFleetClient::new(url, consumer_key));
        for region in split_csv(&env_or("ZONE_REGIONS", "montreal")) {
            jobs.push(Job {
                provider: provider.clone(),
                profile: ZoneFleetClient::profile(),
                scope: Scope::new(company.clone(), region),
            });
        }
    }

    if let Ok(url) = env::var("STREET_API_URL") {
        let company = env_or("STREET_COMPANY", "streetcar");
        let region = env_or("STREET_REGION", "montreal");
        let longitude: f64 = env_or("STREET_REF_LONGITUDE", "-73.5631")
            .parse()
            .expect("expected STREET_REF_LONGITUDE to be a number.");
        let latitude: f64 = env_or("STREET_REF_LATITUDE", "45.4842")
            .parse()
            .expect("expected STREET_REF_LATITUDE to be a number.");
        jobs.push(Job {
            provider: Arc::new(StreetFleetClient::new(
                url,
                Position::new(longitude, latitude),
            )),
            profile: StreetFleetClient::profile(),
            scope: Scope::new(company, region),
        });
    }

    if let Ok(url) = env::var("ROUNDTRIP_API_URL") {
        let company = env_or("ROUNDTRIP_COMPANY", "roundabout");
        let city_ids = parse_city_ids(&env_or(
            "ROUNDTRIP_CITY_IDS",
            "montreal:59,quebec:90",
        ));
        let provider: Arc<dyn SnapshotProvider> =
            Arc::new(RoundtripFleetClient::new(url, city_ids.clone()));
        for region in city_ids.into_keys() {
            jobs.push(Job {
                provider: provider.clone(),
                profile: RoundtripFleetClient::profile(),
                scope: Scope::new(company.clone(), region),
            });
        }
    }

    jobs
}

async fn run_scope_loop(
    job: Job,
    database: PgDatabase,
    period: Duration,
    engine_config: EngineConfig,
    options: CycleOptions,
) {
    let engine = ReconciliationEngine::new(engine_config, job.profile);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let fleet = job.provider.fleet();
        match run_cycle(
            job.provider.as_ref(),
            &engine,
            &database,
            &job.scope,
            &options,
        )
        .await
        {
            Ok(report) => {
                log::info!("{} {}: {}", fleet, job.scope, report);
            }
            Err(CycleError::LockContention) => {
                log::warn!(
                    "{} {}: previous cycle still running, skipping tick",
                    fleet,
                    job.scope
                );
            }
            Err(why) => {
                log::error!("{} {}: cycle failed: {:?}", fleet, job.scope, why);
            }
        }
    }
}

async fn run_free_space_loop(database: PgDatabase, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match sweep_free_spaces(&database, period).await {
            Ok(written) => {
                log::info!("free space sweep: {} log rows", written);
            }
            Err(why) => log::error!("free space sweep failed: {:?}", why),
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    // database
    let connection_info = DatabaseConnectionInfo::from_env()
        .expect("expected database connection info in env.");
    let database = PgDatabase::connect(connection_info)
        .await
        .expect("could not connect to database.");

    let period = env_seconds("RECONCILE_INTERVAL_SECONDS", 120);
    let sweep_period = env_seconds("FREE_SPACE_INTERVAL_SECONDS", 300);
    let options = CycleOptions {
        fetch_timeout: env_seconds("FETCH_TIMEOUT_SECONDS", 30),
    };
    let engine_config = EngineConfig {
        assignment_radius_m: env_or("ASSIGNMENT_RADIUS_M", "5.0")
            .parse()
            .expect("expected ASSIGNMENT_RADIUS_M to be a number."),
        ..EngineConfig::default()
    };

    let jobs = jobs_from_env();
    if jobs.is_empty() {
        log::warn!("no fleet endpoints configured, only sweeping free spaces");
    }
    for job in jobs {
        log::info!("scheduling {} for scope {}", job.provider.fleet(), job.scope);
        tokio::spawn(run_scope_loop(
            job,
            database.clone(),
            period,
            engine_config.clone(),
            options.clone(),
        ));
    }
    tokio::spawn(run_free_space_loop(database, sweep_period));

    let _ = tokio::signal::ctrl_c().await;
}
