use std::time::Duration;

mod backend_bridge;
mod controller;

use backend_bridge::commands::BackendCommand;
use backend_bridge::runtime::spawn_backend_thread;
use client_core::AuthUser;
use controller::events::{UiError, UiErrorCategory, UiErrorContext, UiEvent};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use eframe::egui;
use shared::domain::Todo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppViewState {
    SignIn,
    Todos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

/// Blocking notice with a single OK button; the rest of the window is
/// disabled while it is open.
#[derive(Debug, Clone)]
struct NoticeModal {
    title: String,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignInFocusField {
    Email,
    Password,
}

#[derive(Debug, Clone)]
struct SignInUiState {
    focus: Option<SignInFocusField>,
    attempted_auto_focus: bool,
}

impl Default for SignInUiState {
    fn default() -> Self {
        Self {
            focus: Some(SignInFocusField::Email),
            attempted_auto_focus: false,
        }
    }
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Auth => "Authentication",
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

fn lighten_color(c: egui::Color32, t: f32) -> egui::Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |channel: u8| -> u8 {
        let channel = channel as f32;
        (channel + (255.0 - channel) * t).round().clamp(0.0, 255.0) as u8
    };
    egui::Color32::from_rgba_unmultiplied(mix(c.r()), mix(c.g()), mix(c.b()), c.a())
}

struct DesktopGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    email: String,
    password: String,
    composer: String,

    session_user: Option<AuthUser>,
    todos: Vec<Todo>,

    view_state: AppViewState,
    status: String,
    status_banner: Option<StatusBanner>,
    notice: Option<NoticeModal>,

    sign_in_ui: SignInUiState,
}

impl DesktopGuiApp {
    fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            email: String::new(),
            password: String::new(),
            composer: String::new(),
            session_user: None,
            todos: Vec::new(),
            view_state: AppViewState::SignIn,
            status: "Not signed in".to_string(),
            status_banner: None,
            notice: None,
            sign_in_ui: SignInUiState::default(),
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::SessionChanged(Some(user)) => {
                    let same_user = self.session_user.as_ref().map(|u| u.id) == Some(user.id);
                    if !same_user {
                        self.todos.clear();
                        queue_command(&self.cmd_tx, BackendCommand::ReloadTodos, &mut self.status);
                    }
                    self.session_user = Some(user);
                    self.view_state = AppViewState::Todos;
                    self.password.clear();
                    self.status = "Signed in".to_string();
                    self.status_banner = None;
                }
                UiEvent::SessionChanged(None) => {
                    self.session_user = None;
                    self.todos.clear();
                    self.composer.clear();
                    self.password.clear();
                    self.view_state = AppViewState::SignIn;
                    self.status = "Not signed in".to_string();
                    self.sign_in_ui = SignInUiState::default();
                }
                UiEvent::SignUpAccepted => {
                    self.notice = Some(NoticeModal {
                        title: "Account created".to_string(),
                        message: "Check your email to confirm your account!".to_string(),
                    });
                    self.status = "Sign-up accepted".to_string();
                }
                UiEvent::TodoAdded => {
                    self.composer.clear();
                }
                UiEvent::TodosLoaded(todos) => {
                    self.todos = todos;
                    self.status = format!("{} todos", self.todos.len());
                }
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => match err.context() {
                    UiErrorContext::SignIn => {
                        self.notice = Some(NoticeModal {
                            title: "Sign in failed".to_string(),
                            message: err.message().to_string(),
                        });
                        self.status = format!("{} error: {}", err_label(err.category()), err.message());
                    }
                    UiErrorContext::SignUp => {
                        self.notice = Some(NoticeModal {
                            title: "Sign up failed".to_string(),
                            message: err.message().to_string(),
                        });
                        self.status = format!("{} error: {}", err_label(err.category()), err.message());
                    }
                    UiErrorContext::BackendStartup => {
                        self.status = err.message().to_string();
                        self.status_banner = Some(StatusBanner {
                            severity: StatusBannerSeverity::Error,
                            message: err.message().to_string(),
                        });
                    }
                    UiErrorContext::General => {
                        self.status =
                            format!("{} error: {}", err_label(err.category()), err.message());
                    }
                },
            }
        }
    }

    fn try_sign_in(&mut self) {
        self.status = "Signing in...".to_string();
        // Credentials go out exactly as typed; validation is the service's.
        queue_command(
            &self.cmd_tx,
            BackendCommand::SignIn {
                email: self.email.clone(),
                password: self.password.clone(),
            },
            &mut self.status,
        );
    }

    fn try_sign_up(&mut self) {
        self.status = "Signing up...".to_string();
        queue_command(
            &self.cmd_tx,
            BackendCommand::SignUp {
                email: self.email.clone(),
                password: self.password.clone(),
            },
            &mut self.status,
        );
    }

    fn try_add_todo(&mut self) {
        // Whitespace-only input performs no insert; the text itself is sent
        // untrimmed.
        if self.composer.trim().is_empty() {
            return;
        }
        queue_command(
            &self.cmd_tx,
            BackendCommand::AddTodo {
                task: self.composer.clone(),
            },
            &mut self.status,
        );
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::none()
                .fill(fill)
                .stroke(stroke)
                .rounding(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
        }
    }

    fn credential_field(
        &mut self,
        ui: &mut egui::Ui,
        id: &'static str,
        label: &str,
        hint: &str,
        value: &mut String,
        masked: bool,
        should_focus: bool,
    ) -> egui::Response {
        ui.label(egui::RichText::new(label).strong());
        let edit = egui::TextEdit::singleline(value)
            .id_source(id)
            .password(masked)
            .hint_text(
                egui::RichText::new(hint)
                    .color(ui.visuals().weak_text_color().gamma_multiply(0.85)),
            )
            .desired_width(f32::INFINITY);

        let response = ui.add_sized([ui.available_width(), 34.0], edit);
        if should_focus {
            response.request_focus();
        }
        response
    }

    fn show_sign_in_screen(&mut self, ctx: &egui::Context) {
        let input_enabled = self.notice.is_none();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(input_enabled, |ui| {
                let avail = ui.available_size();
                let card_width = avail.x.clamp(320.0, 420.0);
                let top_space = (avail.y * 0.14).clamp(18.0, 120.0);

                ui.add_space(top_space);
                ui.vertical_centered(|ui| {
                    ui.set_width(card_width);

                    egui::Frame::none()
                        .fill(lighten_color(ui.visuals().panel_fill, 0.03))
                        .rounding(14.0)
                        .stroke(egui::Stroke::new(
                            1.0,
                            ui.visuals().widgets.noninteractive.bg_stroke.color,
                        ))
                        .inner_margin(egui::Margin::symmetric(20, 18))
                        .show(ui, |ui| {
                            ui.style_mut().spacing.item_spacing = egui::vec2(10.0, 10.0);

                            ui.horizontal(|ui| {
                                ui.label(egui::RichText::new("📝").size(24.0));
                                ui.vertical(|ui| {
                                    ui.heading("My Todos");
                                    ui.weak("Sign in or create an account.");
                                });
                            });

                            ui.add_space(8.0);
                            self.show_status_banner(ui);

                            let mut focus_to_set = None;
                            if !self.sign_in_ui.attempted_auto_focus {
                                self.sign_in_ui.attempted_auto_focus = true;
                                focus_to_set = self.sign_in_ui.focus;
                            } else if self.sign_in_ui.focus.is_some() {
                                focus_to_set = self.sign_in_ui.focus;
                                self.sign_in_ui.focus = None;
                            }

                            let mut email_buf = self.email.clone();
                            let mut password_buf = self.password.clone();

                            let email_resp = self.credential_field(
                                ui,
                                "sign_in_email",
                                "Email",
                                "you@example.com",
                                &mut email_buf,
                                false,
                                focus_to_set == Some(SignInFocusField::Email),
                            );

                            ui.add_space(6.0);

                            let password_resp = self.credential_field(
                                ui,
                                "sign_in_password",
                                "Password",
                                "password",
                                &mut password_buf,
                                true,
                                focus_to_set == Some(SignInFocusField::Password),
                            );

                            self.email = email_buf;
                            self.password = password_buf;

                            let enter_pressed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
                            if enter_pressed && (email_resp.has_focus() || password_resp.has_focus())
                            {
                                self.try_sign_in();
                            }

                            ui.add_space(10.0);
                            ui.horizontal(|ui| {
                                let half =
                                    (ui.available_width() - ui.spacing().item_spacing.x) / 2.0;
                                let sign_in = egui::Button::new(
                                    egui::RichText::new("Sign in").strong(),
                                );
                                if ui.add_sized([half, 36.0], sign_in).clicked() {
                                    self.try_sign_in();
                                }
                                if ui.add_sized([half, 36.0], egui::Button::new("Sign up")).clicked()
                                {
                                    self.try_sign_up();
                                }
                            });

                            ui.add_space(8.0);
                            ui.separator();
                            ui.horizontal_wrapped(|ui| {
                                ui.small("Status:");
                                ui.small(egui::RichText::new(&self.status).weak());
                            });
                        });
                });
            });
        });
    }

    fn show_todos_screen(&mut self, ctx: &egui::Context) {
        let input_enabled = self.notice.is_none();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(input_enabled, |ui| {
                ui.vertical_centered(|ui| {
                    let card_width = ui.available_width().clamp(340.0, 560.0);
                    ui.set_width(card_width);

                    ui.add_space(12.0);
                    ui.horizontal(|ui| {
                        ui.heading("My Todos");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Sign out").clicked() {
                                self.status = "Signing out...".to_string();
                                queue_command(
                                    &self.cmd_tx,
                                    BackendCommand::SignOut,
                                    &mut self.status,
                                );
                            }
                        });
                    });
                    if let Some(email) = self
                        .session_user
                        .as_ref()
                        .and_then(|user| user.email.as_deref())
                    {
                        ui.weak(email);
                    }

                    self.show_status_banner(ui);
                    ui.add_space(8.0);

                    let mut composer_buf = self.composer.clone();
                    let mut submit = false;
                    ui.horizontal(|ui| {
                        let edit = egui::TextEdit::singleline(&mut composer_buf)
                            .id_source("todo_composer")
                            .hint_text("What needs to be done?")
                            .desired_width(ui.available_width() - 64.0);
                        let response = ui.add(edit);
                        if response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter))
                        {
                            submit = true;
                            response.request_focus();
                        }
                        if ui.button("Add").clicked() {
                            submit = true;
                        }
                    });
                    self.composer = composer_buf;
                    if submit {
                        self.try_add_todo();
                    }

                    ui.add_space(10.0);
                    ui.separator();

                    let mut pending: Vec<BackendCommand> = Vec::new();
                    egui::ScrollArea::vertical()
                        .auto_shrink([false, true])
                        .show(ui, |ui| {
                            if self.todos.is_empty() {
                                ui.add_space(24.0);
                                ui.weak("No todos yet. Add one above!");
                            } else {
                                for todo in &self.todos {
                                    ui.horizontal(|ui| {
                                        let mut checked = todo.is_complete;
                                        if ui.checkbox(&mut checked, "").changed() {
                                            pending.push(BackendCommand::SetTodoComplete {
                                                todo_id: todo.id,
                                                is_complete: checked,
                                            });
                                        }
                                        let text = if todo.is_complete {
                                            egui::RichText::new(&todo.task).strikethrough().weak()
                                        } else {
                                            egui::RichText::new(&todo.task)
                                        };
                                        ui.label(text);
                                        ui.with_layout(
                                            egui::Layout::right_to_left(egui::Align::Center),
                                            |ui| {
                                                if ui.small_button("✕").clicked() {
                                                    pending.push(BackendCommand::DeleteTodo {
                                                        todo_id: todo.id,
                                                    });
                                                }
                                            },
                                        );
                                    });
                                }
                            }
                        });
                    for cmd in pending {
                        queue_command(&self.cmd_tx, cmd, &mut self.status);
                    }

                    ui.add_space(8.0);
                    ui.separator();
                    ui.horizontal_wrapped(|ui| {
                        ui.small("Status:");
                        ui.small(egui::RichText::new(&self.status).weak());
                    });
                });
            });
        });
    }

    fn show_notice_modal(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.notice.clone() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new(egui::RichText::new(notice.title).strong())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.set_min_width(260.0);
                ui.label(&notice.message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });
        if dismissed {
            self.notice = None;
        }
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        match self.view_state {
            AppViewState::SignIn => self.show_sign_in_screen(ctx),
            AppViewState::Todos => self.show_todos_screen(ctx),
        }
        self.show_notice_modal(ctx);

        // Worker events arrive without user input; poll at a steady cadence.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn queue_command(cmd_tx: &Sender<BackendCommand>, cmd: BackendCommand, status: &mut String) {
    let cmd_name = match &cmd {
        BackendCommand::SignUp { .. } => "sign_up",
        BackendCommand::SignIn { .. } => "sign_in",
        BackendCommand::SignOut => "sign_out",
        BackendCommand::ReloadTodos => "reload_todos",
        BackendCommand::AddTodo { .. } => "add_todo",
        BackendCommand::SetTodoComplete { .. } => "set_todo_complete",
        BackendCommand::DeleteTodo { .. } => "delete_todo",
    };
    tracing::debug!(command = cmd_name, "queueing ui->backend command");
    match cmd_tx.try_send(cmd) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
            tracing::warn!(command = cmd_name, "ui->backend command queue is full");
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure)"
                    .to_string();
            tracing::error!(command = cmd_name, "ui->backend command queue disconnected");
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    spawn_backend_thread(cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("My Todos")
            .with_inner_size([460.0, 640.0])
            .with_min_inner_size([380.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "My Todos",
        options,
        Box::new(|_cc| Ok(Box::new(DesktopGuiApp::new(cmd_tx, ui_rx)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::AuthUser;
    use shared::domain::{TodoId, UserId};
    use uuid::Uuid;

    fn test_app() -> (DesktopGuiApp, Receiver<BackendCommand>, Sender<UiEvent>) {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(16);
        let (ui_tx, ui_rx) = bounded::<UiEvent>(16);
        (DesktopGuiApp::new(cmd_tx, ui_rx), cmd_rx, ui_tx)
    }

    fn user(n: u128) -> AuthUser {
        AuthUser {
            id: UserId(Uuid::from_u128(n)),
            email: Some("a@example.com".to_string()),
        }
    }

    fn sample_todo(id: i64, task: &str) -> Todo {
        Todo {
            id: TodoId(id),
            task: task.to_string(),
            is_complete: false,
            user_id: UserId(Uuid::from_u128(1)),
            created_at: "2024-05-01T09:30:00Z".parse().expect("timestamp"),
        }
    }

    #[test]
    fn sign_in_transition_queues_exactly_one_reload() {
        let (mut app, cmd_rx, ui_tx) = test_app();

        ui_tx
            .try_send(UiEvent::SessionChanged(Some(user(1))))
            .expect("send event");
        app.process_ui_events();

        assert_eq!(app.view_state, AppViewState::Todos);
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(BackendCommand::ReloadTodos)
        ));
        assert!(cmd_rx.try_recv().is_err());

        // A repeated event for the same user must not trigger another reload.
        ui_tx
            .try_send(UiEvent::SessionChanged(Some(user(1))))
            .expect("send event");
        app.process_ui_events();
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn switching_users_reloads_again() {
        let (mut app, cmd_rx, ui_tx) = test_app();

        ui_tx
            .try_send(UiEvent::SessionChanged(Some(user(1))))
            .expect("send event");
        ui_tx
            .try_send(UiEvent::SessionChanged(None))
            .expect("send event");
        ui_tx
            .try_send(UiEvent::SessionChanged(Some(user(2))))
            .expect("send event");
        app.process_ui_events();

        let mut reloads = 0;
        while let Ok(cmd) = cmd_rx.try_recv() {
            if matches!(cmd, BackendCommand::ReloadTodos) {
                reloads += 1;
            }
        }
        assert_eq!(reloads, 2);
    }

    #[test]
    fn sign_out_returns_to_credential_form() {
        let (mut app, _cmd_rx, ui_tx) = test_app();

        ui_tx
            .try_send(UiEvent::SessionChanged(Some(user(1))))
            .expect("send event");
        ui_tx
            .try_send(UiEvent::TodosLoaded(vec![sample_todo(1, "water plants")]))
            .expect("send event");
        app.process_ui_events();
        assert_eq!(app.todos.len(), 1);

        ui_tx
            .try_send(UiEvent::SessionChanged(None))
            .expect("send event");
        app.process_ui_events();

        assert_eq!(app.view_state, AppViewState::SignIn);
        assert!(app.todos.is_empty());
        assert!(app.session_user.is_none());
    }

    #[test]
    fn whitespace_only_composer_queues_no_insert() {
        let (mut app, cmd_rx, _ui_tx) = test_app();

        app.composer = "   ".to_string();
        app.try_add_todo();

        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn add_todo_sends_raw_task_and_clears_on_confirmation() {
        let (mut app, cmd_rx, ui_tx) = test_app();

        app.composer = "  buy milk ".to_string();
        app.try_add_todo();

        match cmd_rx.try_recv() {
            Ok(BackendCommand::AddTodo { task }) => assert_eq!(task, "  buy milk "),
            other => panic!("expected AddTodo, got {other:?}"),
        }
        // Input is only cleared once the insert is confirmed.
        assert_eq!(app.composer, "  buy milk ");

        ui_tx.try_send(UiEvent::TodoAdded).expect("send event");
        app.process_ui_events();
        assert!(app.composer.is_empty());
    }

    #[test]
    fn todos_loaded_replaces_snapshot_wholesale() {
        let (mut app, _cmd_rx, ui_tx) = test_app();

        ui_tx
            .try_send(UiEvent::TodosLoaded(vec![
                sample_todo(1, "one"),
                sample_todo(2, "two"),
            ]))
            .expect("send event");
        app.process_ui_events();
        assert_eq!(app.todos.len(), 2);

        ui_tx
            .try_send(UiEvent::TodosLoaded(vec![sample_todo(3, "three")]))
            .expect("send event");
        app.process_ui_events();
        assert_eq!(app.todos.len(), 1);
        assert_eq!(app.todos[0].id, TodoId(3));
    }

    #[test]
    fn sign_up_acceptance_opens_blocking_notice() {
        let (mut app, _cmd_rx, ui_tx) = test_app();

        ui_tx.try_send(UiEvent::SignUpAccepted).expect("send event");
        app.process_ui_events();

        let notice = app.notice.as_ref().expect("notice should open");
        assert_eq!(notice.message, "Check your email to confirm your account!");
    }

    #[test]
    fn auth_flow_error_opens_notice_with_remote_message() {
        let (mut app, _cmd_rx, ui_tx) = test_app();

        ui_tx
            .try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::SignIn,
                "Validation: Invalid login credentials",
            )))
            .expect("send event");
        app.process_ui_events();

        let notice = app.notice.as_ref().expect("notice should open");
        assert_eq!(notice.title, "Sign in failed");
        assert!(notice.message.contains("Invalid login credentials"));
        assert_eq!(app.view_state, AppViewState::SignIn);
    }

    #[test]
    fn startup_failure_raises_banner_not_notice() {
        let (mut app, _cmd_rx, ui_tx) = test_app();

        ui_tx
            .try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                "backend worker startup failure: failed to build runtime: boom",
            )))
            .expect("send event");
        app.process_ui_events();

        assert!(app.status_banner.is_some());
        assert!(app.notice.is_none());
    }

    #[test]
    fn classifies_disconnected_queue_as_transport_error() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected (possible startup/runtime failure)",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
    }

    #[test]
    fn classifies_credential_rejection_as_auth_error() {
        let err = UiError::from_message(UiErrorContext::SignIn, "Invalid login credentials");
        assert_eq!(err.category(), UiErrorCategory::Auth);
    }
}
