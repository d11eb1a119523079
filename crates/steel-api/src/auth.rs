use std::sync::Arc;

use steel_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub admin_email: String,
}

/// Admin status is derived from a single configured email, never stored.
/// Comparison is exact-match, case-insensitive.
pub fn is_admin_email(admin_email: &str, email: &str) -> bool {
    admin_email.eq_ignore_ascii_case(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_match_ignores_case() {
        assert!(is_admin_email("admin@forgesteel.local", "Admin@ForgeSteel.LOCAL"));
    }

    #[test]
    fn admin_match_is_exact() {
        assert!(!is_admin_email("admin@forgesteel.local", "admin@forgesteel.localhost"));
        assert!(!is_admin_email("admin@forgesteel.local", "xadmin@forgesteel.local"));
    }
}
