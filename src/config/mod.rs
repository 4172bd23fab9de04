mod credentials;
mod settings;

pub use credentials::{CredentialError, ServiceAccountKey, ServiceAccountSource};
pub use settings::{
    ApiConfig, FirebaseConfig, OtelConfig, PresetSource, ServerConfig, Settings,
};
