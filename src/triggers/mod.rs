mod http;

pub use http::{do_command, send_notification, CommandRequest, SendFields, SendResponse};
