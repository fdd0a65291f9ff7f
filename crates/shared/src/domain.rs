use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(TodoId);

/// User identifier assigned by the remote auth subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// One row of the remote `todos` collection.
///
/// `id` and `created_at` are assigned by the service; local copies are a
/// snapshot that is replaced wholesale on every reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub task: String,
    #[serde(default)]
    pub is_complete: bool,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}
