//! Notification text templating.
//!
//! Preset titles, bodies and image URLs may contain `<<variable>>`
//! placeholders that are filled from the caller's `template_vars`.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use firebase_push_service::template::substitute;
//!
//! let mut vars = HashMap::new();
//! vars.insert("alert_type".to_string(), "Motion".to_string());
//!
//! assert_eq!(substitute("Alert: <<alert_type>>", &vars), "Alert: Motion");
//! assert_eq!(substitute("<<unknown>>", &vars), "<<unknown>>");
//! ```

mod substitution;

pub use substitution::{stringify_value, substitute};
