use std::time::{Duration, Instant};

use mongodb::bson::{doc, DateTime, Document};
use tracing::{debug, error, info};

use crate::config::db::{BootstrapConfig, ConnectionSpec, MARKER_COLLECTION};
use crate::error::DbInfraError;
use crate::infra::db::engine::{BootstrapEngine, MongoEngine};
use crate::infra::db::user::AppUser;

/// Outcome of a successful bootstrap run.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    pub db_name: String,
    pub user: String,
    pub created_at: DateTime,
    pub elapsed: Duration,
}

/// What a previous run left behind on the target database.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapStatus {
    pub db_name: String,
    pub user: String,
    pub marker_present: bool,
    pub marker_created_at: Option<DateTime>,
    pub user_present: bool,
}

impl BootstrapStatus {
    pub fn is_complete(&self) -> bool {
        self.marker_present && self.user_present
    }
}

pub fn marker_document(created_at: DateTime) -> Document {
    doc! { "createdAt": created_at }
}

/// Sanitize a connection string by masking the password.
/// Used for logging and error messages.
pub fn sanitize_db_url(url: &str) -> String {
    let Some((auth_part, host_part)) = url.rsplit_once('@') else {
        return url.to_string();
    };
    let Some((scheme, userinfo)) = auth_part.split_once("://") else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host_part}"),
        None => url.to_string(),
    }
}

/// Connect with `connection` and run the bootstrap against the live engine.
pub async fn orchestrate_bootstrap(
    connection: &ConnectionSpec,
    config: &BootstrapConfig,
) -> Result<BootstrapReport, DbInfraError> {
    info!("bootstrap=connect uri={}", connection.sanitized());
    let engine = MongoEngine::connect(connection).await?;
    run_bootstrap(&engine, config).await
}

pub async fn orchestrate_inspect(
    connection: &ConnectionSpec,
    config: &BootstrapConfig,
) -> Result<BootstrapStatus, DbInfraError> {
    info!("inspect=connect uri={}", connection.sanitized());
    let engine = MongoEngine::connect(connection).await?;
    inspect_bootstrap(&engine, config).await
}

/// Admin context, marker insert, then user creation. The first failing call
/// aborts the run; an inserted marker is not rolled back.
pub async fn run_bootstrap<E>(
    engine: &E,
    config: &BootstrapConfig,
) -> Result<BootstrapReport, DbInfraError>
where
    E: BootstrapEngine + ?Sized,
{
    let start = Instant::now();

    info!(
        "bootstrap=start variant={:?} db={} user={}",
        config.variant, config.db_name, config.credentials.user
    );

    let result = bootstrap_steps(engine, config).await;

    match result {
        Ok(created_at) => {
            let elapsed = start.elapsed();
            info!(
                "bootstrap=done db={} user={} elapsed_ms={}",
                config.db_name,
                config.credentials.user,
                elapsed.as_millis()
            );
            Ok(BootstrapReport {
                db_name: config.db_name.clone(),
                user: config.credentials.user.clone(),
                created_at,
                elapsed,
            })
        }
        Err(e) => {
            error!(
                step = ?e.step(),
                db = %config.db_name,
                elapsed_ms = start.elapsed().as_millis(),
                "bootstrap=failed err={e}"
            );
            Err(e)
        }
    }
}

async fn bootstrap_steps<E>(engine: &E, config: &BootstrapConfig) -> Result<DateTime, DbInfraError>
where
    E: BootstrapEngine + ?Sized,
{
    engine.use_admin().await?;

    let created_at = DateTime::now();
    engine
        .insert_marker(&config.db_name, marker_document(created_at))
        .await?;
    debug!(
        db = %config.db_name,
        collection = MARKER_COLLECTION,
        created_at = %created_at,
        "marker inserted"
    );

    let user = AppUser::scoped(&config.credentials, &config.db_name);
    engine.create_user(&config.db_name, &user).await?;
    debug!(db = %config.db_name, user = %user.name, role = "readWrite", "user created");

    Ok(created_at)
}

/// Read-only probe of the marker collection and the application user.
pub async fn inspect_bootstrap<E>(
    engine: &E,
    config: &BootstrapConfig,
) -> Result<BootstrapStatus, DbInfraError>
where
    E: BootstrapEngine + ?Sized,
{
    let marker = engine.find_marker(&config.db_name).await?;
    let user_present = engine
        .user_exists(&config.db_name, &config.credentials.user)
        .await?;

    let status = BootstrapStatus {
        db_name: config.db_name.clone(),
        user: config.credentials.user.clone(),
        marker_present: marker.is_some(),
        marker_created_at: marker
            .as_ref()
            .and_then(|doc| doc.get_datetime("createdAt").ok().copied()),
        user_present,
    };

    info!(
        "inspect=done db={} marker={} user={}",
        status.db_name, status.marker_present, status.user_present
    );

    Ok(status)
}
