//! HTTP notification trigger handlers
//!
//! - `send` command envelope (`POST /api/v1/command`)
//! - Direct send with full summary (`POST /api/v1/notifications/send`)

mod content;
mod handlers;
mod models;

pub use content::{CommandRequest, SendFields};
pub use handlers::{do_command, send_notification};
pub use models::SendResponse;
