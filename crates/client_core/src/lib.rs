//! Client binding for the hosted backend service.
//!
//! Wraps the service's auth subsystem (`/auth/v1/*`) and the `todos`
//! collection of its data API (`/rest/v1/todos`). The binding owns nothing
//! but a session cache; the remote service is the system of record.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Todo, TodoId, UserId},
    error::{ApiError, ErrorCode},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use url::Url;

pub mod config;
pub mod error;

pub use config::Settings;
pub use error::ClientError;

const AUTH_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Service user object, cached as part of the session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// Local cache of the service's current session state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// Auth-state transitions observable through [`subscribe_auth_events`].
///
/// [`subscribe_auth_events`]: SupabaseClient::subscribe_auth_events
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct InsertTodoRow<'a> {
    task: &'a str,
    user_id: UserId,
}

#[derive(Debug, Serialize)]
struct TodoCompletionPatch {
    is_complete: bool,
}

/// Seam between the presentation layer and the remote binding.
///
/// The backend worker drives this trait so tests can substitute a fake for
/// the real service.
#[async_trait]
pub trait TodoBackend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ClientError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ClientError>;
    async fn sign_out(&self) -> Result<(), ClientError>;
    async fn current_session(&self) -> Option<Session>;
    async fn list_todos(&self) -> Result<Vec<Todo>, ClientError>;
    async fn insert_todo(&self, task: &str) -> Result<(), ClientError>;
    async fn set_todo_complete(&self, id: TodoId, is_complete: bool) -> Result<(), ClientError>;
    async fn delete_todo(&self, id: TodoId) -> Result<(), ClientError>;
    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Handle to the hosted backend, initialized once per process.
pub struct SupabaseClient {
    http: Client,
    settings: Settings,
    session: Mutex<Option<Session>>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    pub fn new(settings: Settings) -> Arc<Self> {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            http: Client::new(),
            settings,
            session: Mutex::new(None),
            auth_events,
        })
    }

    pub fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    /// Clone of the cached session, if any.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Registers a new account. Success does not establish a session; the
    /// service sends a confirmation email instead.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let url = self.endpoint("auth/v1/signup")?;
        let response = self
            .http
            .post(url)
            .header("apikey", &self.settings.anon_key)
            .json(&CredentialsRequest { email, password })
            .send()
            .await?;
        self.check_service_response(response).await?;
        info!("auth: sign-up accepted, awaiting email confirmation");
        Ok(())
    }

    /// Password sign-in. On success the session is cached and
    /// [`AuthEvent::SignedIn`] is broadcast.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response = self
            .http
            .post(url)
            .header("apikey", &self.settings.anon_key)
            .json(&CredentialsRequest { email, password })
            .send()
            .await?;
        let response = self.check_service_response(response).await?;
        let session: Session = response.json().await?;

        *self.session.lock().await = Some(session.clone());
        let _ = self.auth_events.send(AuthEvent::SignedIn(session.clone()));
        info!(user_id = %session.user.id.0, "auth: session established");
        Ok(session)
    }

    /// Drops the cached session and revokes it remotely.
    ///
    /// The local cache is cleared and [`AuthEvent::SignedOut`] is broadcast
    /// before the revoke call, so a failed revoke never leaves the binding
    /// signed in.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let access_token = self
            .session
            .lock()
            .await
            .take()
            .map(|session| session.access_token);
        let _ = self.auth_events.send(AuthEvent::SignedOut);
        info!("auth: signed out");

        let Some(access_token) = access_token else {
            return Ok(());
        };

        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .http
            .post(url)
            .header("apikey", &self.settings.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        self.check_service_response(response).await?;
        Ok(())
    }

    /// Full snapshot of the `todos` collection, newest first.
    pub async fn list_todos(&self) -> Result<Vec<Todo>, ClientError> {
        let mut url = self.endpoint("rest/v1/todos")?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "created_at.desc");
        let response = self
            .http
            .get(url)
            .header("apikey", &self.settings.anon_key)
            .bearer_auth(self.bearer_token().await)
            .send()
            .await?;
        let response = self.check_service_response(response).await?;
        let todos: Vec<Todo> = response.json().await?;
        debug!(count = todos.len(), "todos: snapshot loaded");
        Ok(todos)
    }

    /// Inserts a row owned by the current session's user.
    ///
    /// The task text is sent exactly as given; the emptiness check belongs
    /// to the caller.
    pub async fn insert_todo(&self, task: &str) -> Result<(), ClientError> {
        let owner = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|session| session.user.id)
            .ok_or(ClientError::NotSignedIn)?;

        let url = self.endpoint("rest/v1/todos")?;
        let response = self
            .http
            .post(url)
            .header("apikey", &self.settings.anon_key)
            .bearer_auth(self.bearer_token().await)
            .header("Prefer", "return=minimal")
            .json(&[InsertTodoRow {
                task,
                user_id: owner,
            }])
            .send()
            .await?;
        self.check_service_response(response).await?;
        Ok(())
    }

    pub async fn set_todo_complete(
        &self,
        id: TodoId,
        is_complete: bool,
    ) -> Result<(), ClientError> {
        let mut url = self.endpoint("rest/v1/todos")?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", id.0));
        let response = self
            .http
            .patch(url)
            .header("apikey", &self.settings.anon_key)
            .bearer_auth(self.bearer_token().await)
            .header("Prefer", "return=minimal")
            .json(&TodoCompletionPatch { is_complete })
            .send()
            .await?;
        self.check_service_response(response).await?;
        Ok(())
    }

    pub async fn delete_todo(&self, id: TodoId) -> Result<(), ClientError> {
        let mut url = self.endpoint("rest/v1/todos")?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", id.0));
        let response = self
            .http
            .delete(url)
            .header("apikey", &self.settings.anon_key)
            .bearer_auth(self.bearer_token().await)
            .send()
            .await?;
        self.check_service_response(response).await?;
        Ok(())
    }

    /// Session access token when signed in, anon key otherwise.
    async fn bearer_token(&self) -> String {
        match self.session.lock().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.settings.anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.settings.url.trim_end_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(|source| ClientError::InvalidEndpoint {
            url: self.settings.url.clone(),
            source,
        })
    }

    async fn check_service_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::new(
            ErrorCode::from_status(status.as_u16()),
            error::service_error_message(&body, status.as_u16()),
        )
        .into())
    }
}

#[async_trait]
impl TodoBackend for SupabaseClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ClientError> {
        SupabaseClient::sign_up(self, email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ClientError> {
        SupabaseClient::sign_in(self, email, password)
            .await
            .map(drop)
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        SupabaseClient::sign_out(self).await
    }

    async fn current_session(&self) -> Option<Session> {
        SupabaseClient::current_session(self).await
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, ClientError> {
        SupabaseClient::list_todos(self).await
    }

    async fn insert_todo(&self, task: &str) -> Result<(), ClientError> {
        SupabaseClient::insert_todo(self, task).await
    }

    async fn set_todo_complete(&self, id: TodoId, is_complete: bool) -> Result<(), ClientError> {
        SupabaseClient::set_todo_complete(self, id, is_complete).await
    }

    async fn delete_todo(&self, id: TodoId) -> Result<(), ClientError> {
        SupabaseClient::delete_todo(self, id).await
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        SupabaseClient::subscribe_auth_events(self)
    }
}

#[cfg(test)]
mod tests;
