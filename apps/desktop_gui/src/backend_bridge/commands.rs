//! Backend commands queued from UI to backend worker.

use shared::domain::TodoId;

#[derive(Debug)]
pub enum BackendCommand {
    SignUp {
        email: String,
        password: String,
    },
    SignIn {
        email: String,
        password: String,
    },
    SignOut,
    ReloadTodos,
    AddTodo {
        task: String,
    },
    SetTodoComplete {
        todo_id: TodoId,
        is_complete: bool,
    },
    DeleteTodo {
        todo_id: TodoId,
    },
}
