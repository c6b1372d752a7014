use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, EncryptionService};

/// Decrypted Bronhouderportaal credentials, used as basic auth.
#[derive(Debug, Clone)]
pub struct RegistryCredentials {
    pub token: String,
    pub password: String,
}

/// A data owner. Credentials are stored encrypted and only decrypted at the
/// moment a delivery needs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisation {
    pub id: Uuid,
    pub name: String,
    /// Chamber-of-commerce number, 8 digits.
    pub kvk_number: String,
    /// Count of completed registry deliveries, incremented by the pipeline.
    pub request_count: i64,
    pub bro_token_encrypted: Option<String>,
    pub bro_password_encrypted: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organisation {
    pub fn new(name: impl Into<String>, kvk_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Organisation {
            id: Uuid::new_v4(),
            name: name.into(),
            kvk_number: kvk_number.into(),
            request_count: 0,
            bro_token_encrypted: None,
            bro_password_encrypted: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Store a fresh credential pair, replacing any previous one.
    pub fn set_credentials(
        &mut self,
        encryption: &EncryptionService,
        token: &str,
        password: &str,
    ) -> Result<(), AppError> {
        self.bro_token_encrypted = Some(encryption.encrypt(token)?);
        self.bro_password_encrypted = Some(encryption.encrypt(password)?);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn credentials(
        &self,
        encryption: &EncryptionService,
    ) -> Result<RegistryCredentials, AppError> {
        let (token, password) = match (&self.bro_token_encrypted, &self.bro_password_encrypted) {
            (Some(token), Some(password)) => (token, password),
            _ => {
                return Err(AppError::Internal(format!(
                    "Organisation {} has no registry credentials",
                    self.name
                )))
            }
        };
        Ok(RegistryCredentials {
            token: encryption.decrypt(token)?,
            password: encryption.decrypt(password)?,
        })
    }
}
