use std::fmt;

use mongodb::bson::{doc, Document};

use crate::config::db::AppCredentials;

/// Built-in database roles this tool can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinRole {
    ReadWrite,
}

impl BuiltinRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinRole::ReadWrite => "readWrite",
        }
    }

    /// Whether the role allows `action` on the database it is scoped to.
    pub fn permits(self, action: Action) -> bool {
        match self {
            BuiltinRole::ReadWrite => matches!(
                action,
                Action::Find | Action::Insert | Action::Update | Action::Remove
            ),
        }
    }
}

/// Operations a user may attempt against a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Find,
    Insert,
    Update,
    Remove,
    DropDatabase,
    CreateUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: BuiltinRole,
    pub db: String,
}

impl RoleGrant {
    pub fn read_write(db: &str) -> Self {
        Self {
            role: BuiltinRole::ReadWrite,
            db: db.to_string(),
        }
    }

    pub fn permits(&self, db: &str, action: Action) -> bool {
        self.db == db && self.role.permits(action)
    }

    pub fn to_document(&self) -> Document {
        doc! { "role": self.role.as_str(), "db": self.db.as_str() }
    }
}

/// Application account created by the bootstrap.
#[derive(Clone, PartialEq, Eq)]
pub struct AppUser {
    pub name: String,
    pub password: String,
    pub roles: Vec<RoleGrant>,
}

impl fmt::Debug for AppUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUser")
            .field("name", &self.name)
            .field("password", &"***")
            .field("roles", &self.roles)
            .finish()
    }
}

impl AppUser {
    /// User holding exactly one grant: `readWrite` on `db`.
    pub fn scoped(credentials: &AppCredentials, db: &str) -> Self {
        Self {
            name: credentials.user.clone(),
            password: credentials.password.clone(),
            roles: vec![RoleGrant::read_write(db)],
        }
    }

    pub fn permits(&self, db: &str, action: Action) -> bool {
        self.roles.iter().any(|grant| grant.permits(db, action))
    }

    /// `createUser` command document, run against the user's own database.
    pub fn create_user_command(&self) -> Document {
        let roles: Vec<Document> = self.roles.iter().map(RoleGrant::to_document).collect();
        doc! {
            "createUser": self.name.as_str(),
            "pwd": self.password.as_str(),
            "roles": roles,
        }
    }
}
