//! Per-project secrets files.
//!
//! Each project owns a directory named by its secrets id under a shared root,
//! holding a single `secrets.json`. Writing new content never clobbers the
//! existing file: it is merged in with [`merge_documents`], so values written
//! by earlier runs (or by hand) survive.
//!
//! The root follows the conventional user-secrets location:
//!
//! - `%APPDATA%\Microsoft\UserSecrets` when `APPDATA` is set
//! - `$HOME/.microsoft/usersecrets` otherwise

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{merge_documents, parse_lenient};
use crate::error::{Result, SettingsError};

/// File name of the secrets document inside a project's directory.
pub const SECRETS_FILE: &str = "secrets.json";

/// Where a write landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsLocation {
    pub dir: PathBuf,
    pub file: PathBuf,
}

/// A directory of per-project secrets documents.
#[derive(Debug, Clone)]
pub struct SecretsStore {
    root: PathBuf,
}

impl SecretsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the store at the platform's user-secrets location.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::SecretsRoot`] if neither `APPDATA` nor `HOME`
    /// is set.
    pub fn from_env() -> Result<Self> {
        resolve_root(|name| std::env::var(name).ok()).map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the secrets for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidId`] if `id` is not a plain directory name.
    pub fn secrets_dir(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }

    /// Path of the `secrets.json` for `id`.
    pub fn secrets_file(&self, id: &str) -> Result<PathBuf> {
        Ok(self.secrets_dir(id)?.join(SECRETS_FILE))
    }

    /// Read and parse the secrets document for `id`, or `None` if there is none.
    pub fn load(&self, id: &str) -> Result<Option<crate::Value>> {
        let file = self.secrets_file(id)?;
        if !file.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&file).map_err(|e| SettingsError::io(&file, e))?;
        parse_lenient(&text).map(Some)
    }

    /// Read the secrets document for `id` as [`AppSecrets`].
    pub fn load_app_secrets(&self, id: &str) -> Result<Option<AppSecrets>> {
        match self.load(id)? {
            Some(value) => Ok(Some(AppSecrets::from_document(value)?)),
            None => Ok(None),
        }
    }

    /// Write `content` (JSON text) as the secrets for `id`.
    ///
    /// If `previous_id` names an existing secrets directory, its document is
    /// merged with `content` first, and the directory is renamed to `id` when
    /// the ids differ. Otherwise the directory for `id` is created and
    /// `content` is written as-is.
    ///
    /// # Errors
    ///
    /// Fails on invalid ids, unparsable documents, a scalar existing document,
    /// or any filesystem error.
    pub fn write(
        &self,
        id: &str,
        previous_id: Option<&str>,
        content: &str,
    ) -> Result<SecretsLocation> {
        let dir = self.secrets_dir(id)?;
        let file = dir.join(SECRETS_FILE);
        let mut content = Cow::Borrowed(content);

        match previous_id.filter(|p| !p.is_empty()) {
            Some(previous) => {
                let existing_dir = self.secrets_dir(previous)?;
                if existing_dir.is_dir() {
                    let existing_file = existing_dir.join(SECRETS_FILE);
                    if existing_file.is_file() {
                        let existing = fs::read_to_string(&existing_file)
                            .map_err(|e| SettingsError::io(&existing_file, e))?;
                        debug!(file = %existing_file.display(), "merging into existing secrets");
                        content = Cow::Owned(merge_documents(&existing, &content)?);
                    }
                    if existing_dir != dir {
                        info!(from = previous, to = id, "moving secrets directory");
                        fs::rename(&existing_dir, &dir)
                            .map_err(|e| SettingsError::io(&existing_dir, e))?;
                    }
                } else {
                    create_dir(&dir)?;
                }
            }
            None => create_dir(&dir)?,
        }

        fs::write(&file, content.as_bytes()).map_err(|e| SettingsError::io(&file, e))?;
        info!(file = %file.display(), "wrote secrets");
        Ok(SecretsLocation { dir, file })
    }

    /// Merge `content` into the existing secrets for `id`, creating them if absent.
    pub fn merge_into(&self, id: &str, content: &str) -> Result<SecretsLocation> {
        self.write(id, Some(id), content)
    }
}

/// Resolve the secrets root from environment variables supplied by `lookup`.
///
/// Empty values count as unset.
///
/// # Errors
///
/// Returns [`SettingsError::SecretsRoot`] if neither `APPDATA` nor `HOME` is set.
pub fn resolve_root<F>(lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(app_data) = var("APPDATA") {
        return Ok(Path::new(&app_data).join("Microsoft").join("UserSecrets"));
    }
    if let Some(home) = var("HOME") {
        return Ok(Path::new(&home).join(".microsoft").join("usersecrets"));
    }
    Err(SettingsError::SecretsRoot)
}

fn validate_id(id: &str) -> Result<()> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.contains('\0');
    if bad {
        return Err(SettingsError::InvalidId(id.to_owned()));
    }
    Ok(())
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| SettingsError::io(dir, e))
}

// ── Typed view of the secrets document ─────────────────────────────────────

/// The application secrets this tool writes, under the `Unify` section:
///
/// ```json
/// {
///   "Unify": {
///     "Application": {
///       "Id": "...",
///       "MasterKey": "...",
///       "RsaKeys": { "PublicKey": "...", "PrivateKey": "..." }
///     },
///     "Identity": {
///       "AzureAd": { "ClientId": "...", "ClientSecret": "..." }
///     }
///   }
/// }
/// ```
///
/// Unset fields are omitted when serialized, so writing a partially filled
/// value merges only what is set and leaves the rest of the file alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppSecrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unify: Option<UnifySection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnifySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// Identifiers and keys generated for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsa_keys: Option<RsaKeys>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RsaKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_ad: Option<AzureAd>,
}

/// Client credentials registered with the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AzureAd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl AppSecrets {
    /// Secrets carrying only identity client credentials.
    pub fn identity(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self::section(UnifySection {
            application: None,
            identity: Some(Identity {
                azure_ad: Some(AzureAd {
                    client_id: Some(client_id.into()),
                    client_secret,
                }),
            }),
        })
    }

    /// Secrets carrying only the application section.
    pub fn application(
        id: impl Into<String>,
        master_key: Option<String>,
        rsa_keys: Option<RsaKeys>,
    ) -> Self {
        Self::section(UnifySection {
            application: Some(Application {
                id: Some(id.into()),
                master_key,
                rsa_keys,
            }),
            identity: None,
        })
    }

    fn section(section: UnifySection) -> Self {
        Self {
            unify: Some(section),
        }
    }

    /// Serialize as indented JSON, ready to hand to [`SecretsStore::write`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read the typed view out of a parsed document. Unknown keys are ignored.
    pub fn from_document(value: crate::Value) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::from(value))?)
    }

    pub fn client_id(&self) -> Option<&str> {
        let azure_ad = self.unify.as_ref()?.identity.as_ref()?.azure_ad.as_ref()?;
        azure_ad.client_id.as_deref()
    }

    pub fn application_id(&self) -> Option<&str> {
        self.unify.as_ref()?.application.as_ref()?.id.as_deref()
    }
}
