use std::{env, sync::Arc, time::Instant};

use serde::Serialize;

use roster_core::{
    Database, authority::SessionAuthority, directory::SqlSessionAuthority, project::ProjectStore,
};

use crate::procedures;

/// Everything a procedure invocation needs, constructed explicitly once at
/// process start and cloned per request. No hidden globals.
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<dyn SessionAuthority>,
    pub project_store: ProjectStore,
    pub metadata: ServerMetadata,
    pub procedures: Arc<crate::procedure::ProcedureRouter>,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub message: String,
    pub environment: String,
}

impl ServerMetadata {
    pub fn load() -> Self {
        let version = env::var("ROSTER_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let environment =
            env::var("ROSTER_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let message = env::var("ROSTER_SERVER_MESSAGE")
            .unwrap_or_else(|_| format!("Roster {version} Server"));

        Self {
            version,
            message,
            environment,
        }
    }
}

pub fn build_state(database: &Database) -> AppState {
    let authority: Arc<dyn SessionAuthority> = Arc::new(SqlSessionAuthority::new(database));
    let project_store = ProjectStore::new(database);
    let procedures = Arc::new(procedures::build_registry());

    AppState {
        authority,
        project_store,
        metadata: ServerMetadata::load(),
        procedures,
        started_at: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_metadata_serializes_with_expected_fields() {
        let metadata = ServerMetadata {
            version: "0.3.0".into(),
            message: "Roster 0.3.0 Server".into(),
            environment: "test".into(),
        };

        let json = serde_json::to_value(&metadata).expect("metadata serializes");
        assert_eq!(json["version"], "0.3.0");
        assert_eq!(json["message"], "Roster 0.3.0 Server");
        assert_eq!(json["environment"], "test");
    }
}
