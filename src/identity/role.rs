use serde::{Deserialize, Serialize};

/// Portal roles as issued by the external authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Finance,
    Operations,
    Marketing,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Finance, Role::Operations, Role::Marketing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Finance => "Finance",
            Role::Operations => "Operations",
            Role::Marketing => "Marketing",
        }
    }

    /// Parse a role claim value. Case-insensitive; unknown values yield None so
    /// the caller can apply the least-privilege fallback explicitly.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "finance" => Some(Role::Finance),
            "operations" => Some(Role::Operations),
            "marketing" => Some(Role::Marketing),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("Finance"), Some(Role::Finance));
        assert_eq!(Role::parse("MARKETING"), Some(Role::Marketing));
        assert_eq!(Role::parse(" operations "), Some(Role::Operations));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }
}
