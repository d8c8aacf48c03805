use crate::types::{NotifierError, Result};
use serde::Serialize;
use std::fmt;

/// Login or registration form contents, checked before anything is sent.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn for_login(user_name: &str, password: &str) -> Result<Self> {
        let user_name = user_name.trim();
        if user_name.is_empty() || password.is_empty() {
            return Err(NotifierError::Validation(
                "Both user name and password are required".to_string(),
            ));
        }
        Ok(Self {
            user_name: user_name.to_string(),
            password: password.to_string(),
        })
    }

    pub fn for_registration(user_name: &str, password: &str, confirm: &str) -> Result<Self> {
        let credentials = Self::for_login(user_name, password)?;
        if password != confirm {
            return Err(NotifierError::Validation("Passwords do not match".to_string()));
        }
        Ok(credentials)
    }
}
