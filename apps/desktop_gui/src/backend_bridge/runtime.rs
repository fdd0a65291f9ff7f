//! Backend worker: owns the tokio runtime, the remote client, and the
//! auth-change subscription.

use std::{sync::Arc, thread};

use client_core::{AuthEvent, Settings, SupabaseClient, TodoBackend};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn spawn_backend_thread(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let backend: Arc<dyn TodoBackend> = SupabaseClient::new(Settings::from_env());
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            let mut auth_events = backend.subscribe_auth_events();
            let ui_tx_clone = ui_tx.clone();
            let auth_task = tokio::spawn(async move {
                while let Ok(event) = auth_events.recv().await {
                    let session_user = match event {
                        AuthEvent::SignedIn(session) => Some(session.user),
                        AuthEvent::SignedOut => None,
                    };
                    let _ = ui_tx_clone.try_send(UiEvent::SessionChanged(session_user));
                }
            });

            // Initial session check. Sessions are not persisted across
            // processes, so a fresh start reports the signed-out state.
            let initial_user = backend.current_session().await.map(|session| session.user);
            let _ = ui_tx.try_send(UiEvent::SessionChanged(initial_user));

            while let Ok(cmd) = cmd_rx.recv() {
                handle_command(backend.as_ref(), cmd, &ui_tx).await;
            }

            // UI side hung up; release the auth subscription.
            auth_task.abort();
        });
    });
}

pub(crate) async fn handle_command(
    backend: &dyn TodoBackend,
    cmd: BackendCommand,
    ui_tx: &Sender<UiEvent>,
) {
    match cmd {
        BackendCommand::SignUp { email, password } => {
            tracing::info!("backend: sign_up");
            match backend.sign_up(&email, &password).await {
                Ok(()) => {
                    let _ = ui_tx.try_send(UiEvent::SignUpAccepted);
                }
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::SignUp,
                        err.to_string(),
                    )));
                }
            }
        }
        BackendCommand::SignIn { email, password } => {
            tracing::info!("backend: sign_in");
            // Success reaches the UI through the auth-change subscription.
            if let Err(err) = backend.sign_in(&email, &password).await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::SignIn,
                    err.to_string(),
                )));
            }
        }
        BackendCommand::SignOut => {
            tracing::info!("backend: sign_out");
            // The local session is already cleared; a failed remote revoke
            // is diagnostic only.
            if let Err(err) = backend.sign_out().await {
                tracing::warn!("backend: sign-out revoke failed: {err}");
            }
        }
        BackendCommand::ReloadTodos => {
            reload_todos(backend, ui_tx).await;
        }
        BackendCommand::AddTodo { task } => {
            tracing::info!(task_len = task.len(), "backend: add_todo");
            match backend.insert_todo(&task).await {
                Ok(()) => {
                    let _ = ui_tx.try_send(UiEvent::TodoAdded);
                    reload_todos(backend, ui_tx).await;
                }
                Err(err) => tracing::error!("backend: add_todo failed: {err}"),
            }
        }
        BackendCommand::SetTodoComplete {
            todo_id,
            is_complete,
        } => {
            tracing::info!(todo_id = todo_id.0, is_complete, "backend: set_todo_complete");
            match backend.set_todo_complete(todo_id, is_complete).await {
                Ok(()) => reload_todos(backend, ui_tx).await,
                Err(err) => {
                    tracing::error!(todo_id = todo_id.0, "backend: set_todo_complete failed: {err}")
                }
            }
        }
        BackendCommand::DeleteTodo { todo_id } => {
            tracing::info!(todo_id = todo_id.0, "backend: delete_todo");
            match backend.delete_todo(todo_id).await {
                Ok(()) => reload_todos(backend, ui_tx).await,
                Err(err) => {
                    tracing::error!(todo_id = todo_id.0, "backend: delete_todo failed: {err}")
                }
            }
        }
    }
}

async fn reload_todos(backend: &dyn TodoBackend, ui_tx: &Sender<UiEvent>) {
    match backend.list_todos().await {
        Ok(todos) => {
            let _ = ui_tx.try_send(UiEvent::TodosLoaded(todos));
        }
        // The UI keeps its previous snapshot; the failure is diagnostic only.
        Err(err) => tracing::error!("backend: reload_todos failed: {err}"),
    }
}
