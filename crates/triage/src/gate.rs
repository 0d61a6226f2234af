use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Access code check guarding session creation.
#[derive(Clone)]
pub struct AccessGate {
    secret: SecretString,
}

impl AccessGate {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Exact match against the configured code, compared in constant time.
    pub fn verify(&self, submitted: &str) -> bool {
        let expected = self.secret.expose_secret().as_bytes();
        let submitted = submitted.as_bytes();
        if expected.len() != submitted.len() {
            return false;
        }
        expected.ct_eq(submitted).into()
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}
