use std::collections::HashMap;

use db_infra::config::db::{BootstrapConfig, Variant};
use db_infra::infra::db::{
    inspect_bootstrap, run_bootstrap, Action, BootstrapEngine, InMemoryEngine,
};
use db_infra::{BootstrapStep, DbInfraError};
use mongodb::bson::DateTime;

fn config_with(variant: Variant, pairs: &[(&str, &str)]) -> BootstrapConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BootstrapConfig::resolve(variant, |name| vars.get(name).cloned())
}

#[tokio::test]
async fn single_marker_with_timestamp_inside_run_window() {
    test_support::logging::init();
    let engine = InMemoryEngine::new();
    let config = config_with(Variant::App, &[]);

    let before = DateTime::now();
    let report = run_bootstrap(&engine, &config).await.unwrap();
    let after = DateTime::now();

    let markers = engine.marker_documents("appdb").await;
    assert_eq!(markers.len(), 1);

    let created_at = *markers[0].get_datetime("createdAt").unwrap();
    assert!(created_at >= before, "createdAt predates the run");
    assert!(created_at <= after, "createdAt is after the run ended");
    assert_eq!(report.created_at, created_at);
    assert_eq!(report.db_name, "appdb");
    assert_eq!(report.user, "appuser");
}

#[tokio::test]
async fn created_user_is_scoped_read_write() {
    test_support::logging::init();
    let engine = InMemoryEngine::new();
    let config = config_with(Variant::App, &[]);
    run_bootstrap(&engine, &config).await.unwrap();

    let user = engine
        .authenticate("appdb", "appuser", "apppass")
        .await
        .expect("app user should authenticate against its database");
    assert_eq!(user.roles.len(), 1);

    for action in [Action::Find, Action::Insert, Action::Update, Action::Remove] {
        assert!(
            engine
                .authorize("appdb", "appuser", "apppass", "appdb", action)
                .await,
            "{action:?} should be allowed on appdb"
        );
    }

    let denied = [
        ("otherdb", Action::DropDatabase),
        ("appdb", Action::DropDatabase),
        ("admin", Action::CreateUser),
        ("otherdb", Action::Find),
    ];
    for (target, action) in denied {
        assert!(
            !engine
                .authorize("appdb", "appuser", "apppass", target, action)
                .await,
            "{action:?} on {target} should be denied"
        );
    }
}

#[tokio::test]
async fn basic_variant_defaults() {
    test_support::logging::init();
    let engine = InMemoryEngine::new();
    let config = config_with(Variant::Basic, &[]);
    run_bootstrap(&engine, &config).await.unwrap();

    assert_eq!(engine.marker_documents("mongo").await.len(), 1);
    assert!(engine.authenticate("mongo", "mongo", "mongo").await.is_some());
}

#[tokio::test]
async fn target_database_from_env_scopes_the_user() {
    test_support::logging::init();

    for (variant, user, password) in [
        (Variant::App, "appuser", "apppass"),
        (Variant::Basic, "mongo", "mongo"),
    ] {
        let engine = InMemoryEngine::new();
        let config = config_with(variant, &[("MONGO_INITDB_DATABASE", "testdb")]);
        run_bootstrap(&engine, &config).await.unwrap();

        let created = engine
            .authenticate("testdb", user, password)
            .await
            .expect("user should exist on testdb");
        assert_eq!(created.roles.len(), 1);
        assert_eq!(created.roles[0].db, "testdb");
        assert_eq!(created.roles[0].role.as_str(), "readWrite");
        assert_eq!(engine.database_names().await, vec!["testdb"]);
    }
}

#[tokio::test]
async fn second_run_fails_at_user_creation_after_inserting_marker() {
    test_support::logging::init();
    let engine = InMemoryEngine::new();
    let config = config_with(Variant::App, &[]);

    run_bootstrap(&engine, &config).await.unwrap();
    let err = run_bootstrap(&engine, &config).await.unwrap_err();

    assert!(matches!(
        err,
        DbInfraError::Engine {
            step: BootstrapStep::CreateUser,
            ..
        }
    ));
    assert!(err.to_string().contains("already exists"));
    assert_eq!(engine.marker_documents("appdb").await.len(), 2);
}

#[tokio::test]
async fn empty_credentials_reach_the_engine_verbatim() {
    test_support::logging::init();
    let engine = InMemoryEngine::new();
    let config = config_with(Variant::App, &[("APP_USER", ""), ("APP_PASS", "")]);
    run_bootstrap(&engine, &config).await.unwrap();

    assert!(engine.user_exists("appdb", "").await.unwrap());
    assert!(engine.authenticate("appdb", "", "").await.is_some());
}

#[tokio::test]
async fn failure_aborts_remaining_steps() {
    test_support::logging::init();
    let config = config_with(Variant::App, &[]);

    let engine = InMemoryEngine::failing_at(BootstrapStep::SwitchAdmin);
    let err = run_bootstrap(&engine, &config).await.unwrap_err();
    assert_eq!(err.step(), Some(BootstrapStep::SwitchAdmin));
    assert!(engine.marker_documents("appdb").await.is_empty());
    assert!(!engine.user_exists("appdb", "appuser").await.unwrap());

    let engine = InMemoryEngine::failing_at(BootstrapStep::InsertMarker);
    let err = run_bootstrap(&engine, &config).await.unwrap_err();
    assert_eq!(err.step(), Some(BootstrapStep::InsertMarker));
    assert!(!engine.user_exists("appdb", "appuser").await.unwrap());
}

#[tokio::test]
async fn user_creation_failure_keeps_marker() {
    test_support::logging::init();
    let config = config_with(Variant::App, &[]);
    let engine = InMemoryEngine::failing_at(BootstrapStep::CreateUser);

    let err = run_bootstrap(&engine, &config).await.unwrap_err();
    assert_eq!(err.step(), Some(BootstrapStep::CreateUser));
    assert_eq!(engine.marker_documents("appdb").await.len(), 1);
}

#[tokio::test]
async fn inspect_reports_fresh_and_bootstrapped_states() {
    test_support::logging::init();
    let engine = InMemoryEngine::new();
    let config = config_with(Variant::App, &[("MONGO_INITDB_DATABASE", "probe")]);

    let fresh = inspect_bootstrap(&engine, &config).await.unwrap();
    assert!(!fresh.marker_present);
    assert!(!fresh.user_present);
    assert_eq!(fresh.marker_created_at, None);
    assert!(!fresh.is_complete());

    let report = run_bootstrap(&engine, &config).await.unwrap();

    let done = inspect_bootstrap(&engine, &config).await.unwrap();
    assert!(done.is_complete());
    assert_eq!(done.db_name, "probe");
    assert_eq!(done.marker_created_at, Some(report.created_at));
}

#[tokio::test]
async fn runs_through_a_trait_object() {
    test_support::logging::init();
    let engine: Box<dyn BootstrapEngine> = Box::new(InMemoryEngine::new());
    let config = config_with(Variant::App, &[]);

    run_bootstrap(engine.as_ref(), &config).await.unwrap();
    assert!(engine.user_exists("appdb", "appuser").await.unwrap());
}
