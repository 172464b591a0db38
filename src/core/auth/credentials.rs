use data_encoding::BASE64;
use serde_json::Value;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{CredentialsError, Result};

/// Application id and secret for a client-credentials grant
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Resolve credentials field by field: explicit argument, then the JSON
    /// file (`{"client_id": .., "client_secret": ..}`), then the environment.
    /// When a file is given it must hold every field not passed explicitly.
    pub fn resolve(
        client_id: Option<String>,
        client_secret: Option<String>,
        file: Option<&Path>,
        id_var: &str,
        secret_var: &str,
    ) -> Result<Self> {
        if let (Some(id), Some(secret)) = (&client_id, &client_secret) {
            return Ok(Self::new(id.clone(), secret.clone()));
        }

        let from_file = match file {
            Some(path) => Some((path, read_json_object(path)?)),
            None => None,
        };

        let field = |explicit: Option<String>, key: &str, var: &str, message: &str| {
            match (explicit, &from_file) {
                (Some(value), _) => Ok(value),
                (None, Some((path, data))) => required_key(data, path, key),
                (None, None) => required_env(var, message),
            }
        };

        let client_id = field(client_id, "client_id", id_var, "You must specify a client id")?;
        let client_secret = field(
            client_secret,
            "client_secret",
            secret_var,
            "You must specify a client secret",
        )?;

        Ok(Self::new(client_id, client_secret))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `Basic base64(client_id:client_secret)`
    pub fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(pair.as_bytes()))
    }
}

/// Resolve a pre-issued token: explicit argument, then `{"token": ..}` file,
/// then the environment.
pub fn resolve_static_token(
    token: Option<String>,
    file: Option<&Path>,
    token_var: &str,
) -> Result<String> {
    if let Some(token) = token {
        return Ok(token);
    }

    if let Some(path) = file {
        let data = read_json_object(path)?;
        return required_key(&data, path, "token");
    }

    required_env(token_var, "You must specify an API token")
}

fn required_env(var_name: &str, message: &str) -> Result<String> {
    match env::var(var_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(CredentialsError::Missing {
            variable: var_name.to_string(),
            message: message.to_string(),
        }
        .into()),
    }
}

fn read_json_object(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|source| CredentialsError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content)
        .map_err(|source| {
            CredentialsError::Malformed {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
}

fn required_key(data: &Value, path: &Path, key: &str) -> Result<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CredentialsError::MissingKey {
                path: path.to_path_buf(),
                key: key.to_string(),
            }
            .into()
        })
}
