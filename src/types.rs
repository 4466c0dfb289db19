//! Re-exported types from external crates for convenience.
//!
//! These types are commonly used in this SDK and are re-exported here
//! so users don't need to add these dependencies to their `Cargo.toml`.

/// Secret string type used for the API key; redacted in debug output.
pub use secrecy::SecretString;
/// Raw JSON values, used for request attributes and unstructured message content.
pub use serde_json::{Map, Value};
/// UUID type used for generated session identifiers.
pub use uuid::Uuid;

/// Free-form request attributes sent alongside a user message.
pub type Attributes = Map<String, Value>;
