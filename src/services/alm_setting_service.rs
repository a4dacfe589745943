use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::AuthorizationContext;
use crate::database::{SettingsStore, StoreError};

use super::actions::{
    ActionParams, PARAM_APP_ID, PARAM_KEY, PARAM_NEW_KEY, PARAM_PRIVATE_KEY, PARAM_URL, UPDATE_GITHUB,
};

#[derive(Debug, Error)]
pub enum AlmSettingError {
    #[error("Insufficient privileges")]
    PermissionDenied,

    #[error("The '{0}' parameter is missing")]
    MissingParameter(&'static str),

    #[error("'{param}' length ({actual}) is longer than the maximum authorized ({max})")]
    ParameterTooLong {
        param: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("No ALM setting with key '{0}' has been found")]
    NotFound(String),

    #[error("ALM setting with key '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validated input of the update_github action
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateGitHubRequest {
    pub key: String,
    pub new_key: Option<String>,
    pub url: String,
    pub app_id: String,
    pub private_key: String,
}

impl UpdateGitHubRequest {
    pub fn from_params(params: &ActionParams) -> Result<Self, AlmSettingError> {
        Ok(Self {
            key: params.mandatory(&UPDATE_GITHUB, PARAM_KEY)?,
            new_key: params.optional(&UPDATE_GITHUB, PARAM_NEW_KEY)?,
            url: params.mandatory(&UPDATE_GITHUB, PARAM_URL)?,
            app_id: params.mandatory(&UPDATE_GITHUB, PARAM_APP_ID)?,
            private_key: params.mandatory(&UPDATE_GITHUB, PARAM_PRIVATE_KEY)?,
        })
    }

    /// The rename target, when one is actually requested
    fn rename_target(&self) -> Option<&str> {
        self.new_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Administration of ALM integration settings
#[derive(Clone)]
pub struct AlmSettingService {
    store: Arc<dyn SettingsStore>,
    audit: bool,
}

impl AlmSettingService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store, audit: false }
    }

    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    /// Update a GitHub setting, optionally renaming its key.
    ///
    /// The caller must be a system administrator; this is checked before the
    /// parameters are even looked at. Parameters are validated before the store
    /// is touched.
    pub async fn update_github(
        &self,
        actor: &dyn AuthorizationContext,
        params: &ActionParams,
    ) -> Result<(), AlmSettingError> {
        self.authorize(actor)?;

        let request = UpdateGitHubRequest::from_params(params)?;
        self.apply_github_update(actor, request).await
    }

    /// Reject callers without the system administrator capability
    pub fn authorize(&self, actor: &dyn AuthorizationContext) -> Result<(), AlmSettingError> {
        if !actor.is_system_administrator() {
            warn!("User '{}' denied ALM settings access: not a system administrator", actor.login());
            return Err(AlmSettingError::PermissionDenied);
        }
        Ok(())
    }

    async fn apply_github_update(
        &self,
        actor: &dyn AuthorizationContext,
        request: UpdateGitHubRequest,
    ) -> Result<(), AlmSettingError> {
        // Dropping the transaction on any early return discards it
        let mut tx = self.store.begin().await?;

        let mut setting = tx
            .select_by_key(&request.key)
            .await?
            .ok_or_else(|| AlmSettingError::NotFound(request.key.clone()))?;

        // Not atomic against a concurrent rename to the same key: the store's
        // unique constraint catches that case at write or commit time.
        if let Some(new_key) = request.rename_target().filter(|k| *k != request.key) {
            if let Some(existing) = tx.select_by_key(new_key).await? {
                return Err(AlmSettingError::AlreadyExists(existing.key));
            }
        }

        let previous_key = std::mem::take(&mut setting.key);
        setting.key = request
            .rename_target()
            .map(str::to_string)
            .unwrap_or_else(|| request.key.clone());
        setting.url = request.url;
        setting.app_id = request.app_id;
        setting.private_key = request.private_key;
        setting.updated_at = Utc::now();

        let unique = |e: StoreError| match e {
            StoreError::UniqueViolation(_) => AlmSettingError::AlreadyExists(setting.key.clone()),
            other => AlmSettingError::Store(other),
        };
        tx.update(&setting).await.map_err(&unique)?;
        tx.commit().await.map_err(&unique)?;

        debug!("ALM setting {} updated", setting.uuid);
        if self.audit {
            info!(
                target: "audit",
                actor = actor.login(),
                action = UPDATE_GITHUB.key,
                alm = %setting.alm,
                key = %previous_key,
                new_key = %setting.key,
                private_key_sha256 = %fingerprint(&setting.private_key),
                "ALM setting updated"
            );
        }
        Ok(())
    }
}

/// Short SHA-256 fingerprint so secrets can be correlated in logs without being logged
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..16].to_string()
}
