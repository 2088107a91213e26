// Standard library imports
use std::collections::HashMap;

// External crate imports
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::Client;
use tokio::sync::Mutex;
use tracing::{debug, trace};

// Internal crate imports
use crate::config::db::{ConnectionSpec, ADMIN_DB, MARKER_COLLECTION};
use crate::error::{BootstrapStep, DbInfraError};
use crate::infra::db::user::{Action, AppUser};

// ============================================================================
// BootstrapEngine Trait
// ============================================================================

/// Database calls a bootstrap run is made of.
#[async_trait]
pub trait BootstrapEngine: Send + Sync {
    /// Select the administrative database as the active context.
    async fn use_admin(&self) -> Result<(), DbInfraError>;

    /// Insert `marker` into the marker collection of `db`.
    async fn insert_marker(&self, db: &str, marker: Document) -> Result<(), DbInfraError>;

    /// Create `user` on `db` with its role grants.
    async fn create_user(&self, db: &str, user: &AppUser) -> Result<(), DbInfraError>;

    /// First document of the marker collection of `db`, if any.
    async fn find_marker(&self, db: &str) -> Result<Option<Document>, DbInfraError>;

    async fn user_exists(&self, db: &str, name: &str) -> Result<bool, DbInfraError>;
}

// ============================================================================
// MongoEngine
// ============================================================================

/// Engine backed by a live MongoDB deployment.
pub struct MongoEngine {
    client: Client,
}

impl MongoEngine {
    pub async fn connect(spec: &ConnectionSpec) -> Result<Self, DbInfraError> {
        let client = Client::with_uri_str(spec.uri())
            .await
            .map_err(|e| DbInfraError::engine(BootstrapStep::Connect, e))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl BootstrapEngine for MongoEngine {
    async fn use_admin(&self) -> Result<(), DbInfraError> {
        // The driver has no session-wide "current database"; a ping on admin
        // proves the root credentials are accepted there.
        self.client
            .database(ADMIN_DB)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DbInfraError::engine(BootstrapStep::SwitchAdmin, e))?;
        debug!(db = ADMIN_DB, "admin context reachable");
        Ok(())
    }

    async fn insert_marker(&self, db: &str, marker: Document) -> Result<(), DbInfraError> {
        let result = self
            .client
            .database(db)
            .collection::<Document>(MARKER_COLLECTION)
            .insert_one(marker)
            .await
            .map_err(|e| DbInfraError::engine(BootstrapStep::InsertMarker, e))?;
        trace!(db = db, inserted_id = %result.inserted_id, "marker insert acknowledged");
        Ok(())
    }

    async fn create_user(&self, db: &str, user: &AppUser) -> Result<(), DbInfraError> {
        self.client
            .database(db)
            .run_command(user.create_user_command())
            .await
            .map_err(|e| DbInfraError::engine(BootstrapStep::CreateUser, e))?;
        Ok(())
    }

    async fn find_marker(&self, db: &str) -> Result<Option<Document>, DbInfraError> {
        self.client
            .database(db)
            .collection::<Document>(MARKER_COLLECTION)
            .find_one(doc! {})
            .await
            .map_err(|e| DbInfraError::engine(BootstrapStep::Inspect, e))
    }

    async fn user_exists(&self, db: &str, name: &str) -> Result<bool, DbInfraError> {
        let reply = self
            .client
            .database(db)
            .run_command(doc! { "usersInfo": name })
            .await
            .map_err(|e| DbInfraError::engine(BootstrapStep::Inspect, e))?;
        Ok(reply
            .get_array("users")
            .map(|users| !users.is_empty())
            .unwrap_or(false))
    }
}

// ============================================================================
// InMemoryEngine
// ============================================================================

#[derive(Debug, Default)]
struct InMemoryState {
    admin_selected: bool,
    markers: HashMap<String, Vec<Document>>,
    // (db, user name)
    users: HashMap<(String, String), AppUser>,
    fail_at: Option<BootstrapStep>,
}

/// Process-local engine with the same observable rules as a fresh MongoDB
/// instance: databases appear on first write, user names are unique per
/// database, and user creation requires the admin context.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<InMemoryState>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose `step` call fails unconditionally.
    pub fn failing_at(step: BootstrapStep) -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                fail_at: Some(step),
                ..InMemoryState::default()
            }),
        }
    }

    pub async fn marker_documents(&self, db: &str) -> Vec<Document> {
        let state = self.state.lock().await;
        state.markers.get(db).cloned().unwrap_or_default()
    }

    /// Databases that received at least one write.
    pub async fn database_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut names: Vec<String> = state.markers.keys().cloned().collect();
        for (db, _) in state.users.keys() {
            if !names.contains(db) {
                names.push(db.clone());
            }
        }
        names.sort();
        names
    }

    /// Returns the user when `name`/`password` match an account on `db`.
    pub async fn authenticate(&self, db: &str, name: &str, password: &str) -> Option<AppUser> {
        let state = self.state.lock().await;
        state
            .users
            .get(&(db.to_string(), name.to_string()))
            .filter(|user| user.password == password)
            .cloned()
    }

    /// Whether the account `name`/`password` on `db` may perform `action` on
    /// `target_db`. Unknown users and wrong passwords are denied.
    pub async fn authorize(
        &self,
        db: &str,
        name: &str,
        password: &str,
        target_db: &str,
        action: Action,
    ) -> bool {
        match self.authenticate(db, name, password).await {
            Some(user) => user.permits(target_db, action),
            None => false,
        }
    }

    fn check_injected(state: &InMemoryState, step: BootstrapStep) -> Result<(), DbInfraError> {
        if state.fail_at == Some(step) {
            return Err(DbInfraError::engine(step, "injected engine failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl BootstrapEngine for InMemoryEngine {
    async fn use_admin(&self) -> Result<(), DbInfraError> {
        let mut state = self.state.lock().await;
        Self::check_injected(&state, BootstrapStep::SwitchAdmin)?;
        state.admin_selected = true;
        Ok(())
    }

    async fn insert_marker(&self, db: &str, marker: Document) -> Result<(), DbInfraError> {
        let mut state = self.state.lock().await;
        Self::check_injected(&state, BootstrapStep::InsertMarker)?;
        state.markers.entry(db.to_string()).or_default().push(marker);
        Ok(())
    }

    async fn create_user(&self, db: &str, user: &AppUser) -> Result<(), DbInfraError> {
        let mut state = self.state.lock().await;
        Self::check_injected(&state, BootstrapStep::CreateUser)?;

        if !state.admin_selected {
            return Err(DbInfraError::engine(
                BootstrapStep::CreateUser,
                format!("not authorized on {db} to execute command createUser"),
            ));
        }

        let key = (db.to_string(), user.name.clone());
        if state.users.contains_key(&key) {
            return Err(DbInfraError::engine(
                BootstrapStep::CreateUser,
                format!("User \"{}@{}\" already exists", user.name, db),
            ));
        }
        state.users.insert(key, user.clone());
        Ok(())
    }

    async fn find_marker(&self, db: &str) -> Result<Option<Document>, DbInfraError> {
        let state = self.state.lock().await;
        Self::check_injected(&state, BootstrapStep::Inspect)?;
        Ok(state.markers.get(db).and_then(|docs| docs.first().cloned()))
    }

    async fn user_exists(&self, db: &str, name: &str) -> Result<bool, DbInfraError> {
        let state = self.state.lock().await;
        Self::check_injected(&state, BootstrapStep::Inspect)?;
        Ok(state.users.contains_key(&(db.to_string(), name.to_string())))
    }
}
