/// Identity attached to every outgoing call.
///
/// Set once when the client is constructed and read-only afterwards. The
/// backend uses these headers for role scoping and audit; nothing in this
/// crate interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityContext {
    pub role: String,
    pub user_id: String,
    pub user_email: String,
}

impl IdentityContext {
    pub fn new(
        role: impl Into<String>,
        user_id: impl Into<String>,
        user_email: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            user_id: user_id.into(),
            user_email: user_email.into(),
        }
    }
}

pub(crate) const HEADER_ROLE: &str = "x-user-role";
pub(crate) const HEADER_USER_ID: &str = "x-user-id";
pub(crate) const HEADER_USER_EMAIL: &str = "x-user-email";
