//! # settings-merge
//!
//! Order-preserving recursive merge for JSON settings documents.
//!
//! Tools that provision an application (generate ids, keys, client
//! credentials) need to write their output into a settings file that may
//! already hold other values. This crate merges the newly produced content
//! into the existing document without losing anything:
//!
//! - objects merge key by key, keeping the existing key order and appending
//!   new keys at the end
//! - arrays concatenate
//! - a non-null incoming scalar replaces the existing value
//! - an incoming `null` never erases an existing value
//!
//! ## Quick start
//!
//! ```rust
//! use settings_merge::merge_documents;
//!
//! let existing = r#"{"Logging":{"Level":"Info"},"App":{"Id":"a1"}}"#;
//! let produced = r#"{"App":{"ClientId":"c1"}}"#;
//! let merged = merge_documents(existing, produced).unwrap();
//!
//! let value: serde_json::Value = serde_json::from_str(&merged).unwrap();
//! assert_eq!(value["App"]["Id"], "a1");
//! assert_eq!(value["App"]["ClientId"], "c1");
//! ```
//!
//! ## Modules
//!
//! - [`value`] — `Value` document tree and typed accessors
//! - [`merge`] — the merge engine (`merge`, `merge_object`, `merge_array`)
//! - [`document`] — JSON text ⇄ `Value`, `merge_documents`
//! - [`secrets`] — per-project `secrets.json` store
//! - [`error`] — error type

pub mod document;
pub mod error;
pub mod merge;
pub mod secrets;
pub mod value;

pub use document::{merge_documents, parse, parse_lenient, serialize, serialize_compact};
pub use error::{Result, SettingsError};
pub use merge::{merge, merge_array, merge_object, try_merge};
pub use secrets::{
    AppSecrets, Application, AzureAd, Identity, RsaKeys, SecretsLocation, SecretsStore,
    UnifySection,
};
pub use value::{Kind, Object, Value};
