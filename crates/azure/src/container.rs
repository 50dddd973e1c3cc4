//! Container creation
//!
//! `object_store` only works with blobs inside an existing container, so
//! creating one goes through the Azure storage SDK. Credentials are read
//! from the same `AZURE_STORAGE_*` variables `object_store` uses.

use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::prelude::ClientBuilder;

use ap_core::config::AzureSettings;
use ap_core::{Error, RemotePath, Result};

const ALREADY_EXISTS: &str = "ContainerAlreadyExists";

const AUTH_FAILURES: &[&str] = &[
    "AuthenticationFailed",
    "AuthorizationFailure",
    "AuthorizationPermissionMismatch",
    "InsufficientAccountPermissions",
];

/// Credentials that can sign a create-container request
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Credentials {
    AccessKey(String),
    SasToken(String),
    BearerToken(String),
    Emulator,
}

impl Credentials {
    /// Pick credentials from a variable lookup; `None` when nothing usable is set
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.is_empty()))
        };

        if get(&["AZURE_STORAGE_USE_EMULATOR"]).is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            return Some(Credentials::Emulator);
        }
        if let Some(key) = get(&[
            "AZURE_STORAGE_ACCOUNT_KEY",
            "AZURE_STORAGE_ACCESS_KEY",
            "AZURE_STORAGE_MASTER_KEY",
        ]) {
            return Some(Credentials::AccessKey(key));
        }
        if let Some(token) = get(&["AZURE_STORAGE_SAS_KEY", "AZURE_STORAGE_SAS_TOKEN"]) {
            return Some(Credentials::SasToken(token));
        }
        get(&["AZURE_STORAGE_TOKEN"]).map(Credentials::BearerToken)
    }

    pub(crate) fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn storage_credentials(self, account: &str) -> Result<StorageCredentials> {
        match self {
            Credentials::AccessKey(key) => Ok(StorageCredentials::access_key(account.to_string(), key)),
            Credentials::SasToken(token) => StorageCredentials::sas_token(token)
                .map_err(|e| Error::Config(format!("Invalid AZURE_STORAGE_SAS_KEY: {e}"))),
            Credentials::BearerToken(token) => Ok(StorageCredentials::bearer_token(token)),
            Credentials::Emulator => Ok(StorageCredentials::anonymous()),
        }
    }
}

/// Create the container of `path`; an existing container counts as success
pub(crate) async fn create_container(
    settings: &AzureSettings,
    path: &RemotePath,
    credentials: Credentials,
) -> Result<()> {
    let container = path.with_key("").to_string();

    let builder = match (credentials, &settings.endpoint) {
        (Credentials::Emulator, _) => ClientBuilder::emulator(),
        (credentials, Some(endpoint)) => ClientBuilder::with_location(
            CloudLocation::Custom {
                account: path.account.clone(),
                uri: endpoint.trim_end_matches('/').to_string(),
            },
            credentials.storage_credentials(&path.account)?,
        ),
        (credentials, None) => ClientBuilder::new(
            path.account.clone(),
            credentials.storage_credentials(&path.account)?,
        ),
    };

    let result = builder
        .container_client(path.container.clone())
        .create()
        .await;
    match result {
        Ok(_) => {
            tracing::info!(container = %container, "Created container");
            Ok(())
        }
        Err(e) => {
            let code = e.as_http_error().and_then(|http| http.error_code());
            classify_create_failure(code, &container, &e.to_string())
        }
    }
}

fn classify_create_failure(code: Option<&str>, container: &str, message: &str) -> Result<()> {
    match code {
        Some(ALREADY_EXISTS) => {
            tracing::debug!(container = %container, "Container already exists");
            Ok(())
        }
        Some(code) if AUTH_FAILURES.contains(&code) => {
            Err(Error::Auth(format!("Cannot create container {container}: {message}")))
        }
        _ => Err(Error::Transfer(format!(
            "Cannot create container {container}: {message}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_access_key_wins_over_tokens() {
        let creds = Credentials::from_lookup(lookup(&[
            ("AZURE_STORAGE_SAS_KEY", "sv=2022"),
            ("AZURE_STORAGE_ACCESS_KEY", "c2VjcmV0"),
        ]));
        assert_eq!(creds, Some(Credentials::AccessKey("c2VjcmV0".into())));
    }

    #[test]
    fn test_token_credentials() {
        assert_eq!(
            Credentials::from_lookup(lookup(&[("AZURE_STORAGE_SAS_TOKEN", "sv=2022&sig=x")])),
            Some(Credentials::SasToken("sv=2022&sig=x".into()))
        );
        assert_eq!(
            Credentials::from_lookup(lookup(&[("AZURE_STORAGE_TOKEN", "eyJ0")])),
            Some(Credentials::BearerToken("eyJ0".into()))
        );
    }

    #[test]
    fn test_emulator_and_missing_credentials() {
        assert_eq!(
            Credentials::from_lookup(lookup(&[
                ("AZURE_STORAGE_USE_EMULATOR", "TRUE"),
                ("AZURE_STORAGE_ACCOUNT_KEY", "k"),
            ])),
            Some(Credentials::Emulator)
        );
        assert_eq!(Credentials::from_lookup(lookup(&[])), None);
        assert_eq!(
            Credentials::from_lookup(lookup(&[("AZURE_STORAGE_ACCOUNT_KEY", "")])),
            None
        );
    }

    #[test]
    fn test_existing_container_is_success() {
        assert!(classify_create_failure(Some("ContainerAlreadyExists"), "c", "409").is_ok());
    }

    #[test]
    fn test_create_failures() {
        assert!(matches!(
            classify_create_failure(Some("AuthorizationFailure"), "c", "403"),
            Err(Error::Auth(_))
        ));
        assert!(matches!(
            classify_create_failure(Some("ContainerBeingDeleted"), "c", "409"),
            Err(Error::Transfer(_))
        ));
        assert!(matches!(
            classify_create_failure(None, "c", "connection reset"),
            Err(Error::Transfer(_))
        ));
    }
}
