//! Local user identity.

/// A user identity registered with the manager for stat tracking.
///
/// The `signed_in` flag stands in for the platform's sign-in state. It is
/// consulted when the initial document fetch fails: a signed-in user falls
/// back to an offline document instead of failing the add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUser {
    user_id: String,
    signed_in: bool,
}

impl LocalUser {
    /// Creates a signed-in local user with the given platform id.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            signed_in: true,
        }
    }

    /// Sets the sign-in state.
    pub fn with_signed_in(mut self, signed_in: bool) -> Self {
        self.signed_in = signed_in;
        self
    }

    /// The user's unique platform id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether the user is considered signed in.
    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_builder() {
        let user = LocalUser::new("user-1");
        assert_eq!(user.user_id(), "user-1");
        assert!(user.is_signed_in());

        let user = LocalUser::new("user-2").with_signed_in(false);
        assert!(!user.is_signed_in());
    }
}
