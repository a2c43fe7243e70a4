//! Per-run session context handed explicitly to the front end.

/// Decides once at startup whether this run has admin rights.
pub trait AuthCheck: Send + Sync {
    fn is_admin(&self) -> bool;
}

/// Fixed answer, typically read from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAuthCheck {
    admin: bool,
}

impl StaticAuthCheck {
    #[must_use]
    pub fn new(admin: bool) -> Self {
        Self { admin }
    }
}

impl AuthCheck for StaticAuthCheck {
    fn is_admin(&self) -> bool {
        self.admin
    }
}

/// Flags that decide which navigation chrome and admin actions are offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    is_admin: bool,
}

impl SessionContext {
    #[must_use]
    pub fn from_auth(auth: &dyn AuthCheck) -> Self {
        Self {
            is_admin: auth.is_admin(),
        }
    }

    #[must_use]
    pub fn learner() -> Self {
        Self { is_admin: false }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_reflects_auth_check() {
        assert!(SessionContext::from_auth(&StaticAuthCheck::new(true)).is_admin());
        assert!(!SessionContext::from_auth(&StaticAuthCheck::new(false)).is_admin());
        assert!(!SessionContext::learner().is_admin());
    }
}
