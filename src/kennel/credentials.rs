//! Write credential for the remote store.
//!
//! Reads never need a token; writes always do. The UI layer decides when to ask
//! for one and hands it over through [`CredentialProvider::set`].

use crate::error::Result;
use crate::store::backend::StorageBackend;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

pub const TOKEN_KEY: &str = "github_token";

pub trait CredentialProvider {
    fn get(&self) -> Option<String>;

    fn set(&self, token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

/// Token persisted under [`TOKEN_KEY`] in the local backend.
pub struct StoredCredentials {
    backend: Rc<dyn StorageBackend>,
}

impl StoredCredentials {
    pub fn new(backend: Rc<dyn StorageBackend>) -> Self {
        Self { backend }
    }
}

impl CredentialProvider for StoredCredentials {
    fn get(&self) -> Option<String> {
        match self.backend.read_key(TOKEN_KEY) {
            Ok(token) => token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "could not read stored token");
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return self.clear();
        }
        self.backend.write_key(TOKEN_KEY, token)
    }

    fn clear(&self) -> Result<()> {
        self.backend.remove_key(TOKEN_KEY)
    }
}

/// Process-local token, for tests and embedding.
#[derive(Default)]
pub struct StaticCredentials {
    token: RefCell<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: RefCell::new(token.map(str::to_string)),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn get(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        *self.token.borrow_mut() = Some(token.to_string()).filter(|t| !t.is_empty());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.borrow_mut() = None;
        Ok(())
    }
}
