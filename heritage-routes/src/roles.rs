use std::{
    convert::Infallible,
    fmt::Display,
    ops::{BitOr, BitOrAssign},
    str::FromStr,
};

use heritage_core::model::user::Role;
use routing::Roles;
use tracing::{instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct HeritageRoles(u8);

impl HeritageRoles {
    pub const NONE: HeritageRoles = HeritageRoles(0);
    pub const USER: HeritageRoles = HeritageRoles(1);
    pub const ADMIN: HeritageRoles = HeritageRoles(2);

    fn iter(&self) -> impl Iterator<Item = HeritageRoles> + '_ {
        [Self::USER, Self::ADMIN]
            .into_iter()
            .filter(|r| self.0 & r.0 != 0)
    }
}

impl Roles for HeritageRoles {
    fn none() -> Self {
        Self::NONE
    }

    fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn add(&mut self, other: Self) {
        *self |= other;
    }
}

impl Default for HeritageRoles {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<Role> for HeritageRoles {
    fn from(value: Role) -> Self {
        match value {
            Role::User => Self::USER,
            Role::Admin => Self::ADMIN,
        }
    }
}

/// Used in the forbidden message, `Access denied: Admin role required`.
impl Display for HeritageRoles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            return write!(f, "No");
        }

        for (i, role) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match role {
                Self::USER => write!(f, "User")?,
                _ => write!(f, "Admin")?,
            }
        }
        Ok(())
    }
}

impl BitOr for HeritageRoles {
    type Output = HeritageRoles;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for HeritageRoles {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = Self(self.0 | rhs.0);
    }
}

impl FromStr for HeritageRoles {
    type Err = Infallible; // unknown roles are ignored

    #[instrument]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Role>() {
            Ok(role) => Ok(role.into()),
            Err(e) => {
                warn!("{e}. Ignoring");
                Ok(Self::NONE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use routing::Roles;

    use super::HeritageRoles;

    #[test]
    fn roles_contains() {
        let roles = HeritageRoles::USER | HeritageRoles::ADMIN;

        assert!(roles.contains(HeritageRoles::USER));
        assert!(roles.contains(HeritageRoles::ADMIN));
        assert!(!HeritageRoles::USER.contains(HeritageRoles::ADMIN));
        assert!(HeritageRoles::ADMIN.contains(HeritageRoles::NONE));
    }

    #[test]
    fn roles_parse_from_token_claim() {
        assert_eq!(HeritageRoles::ADMIN, "admin".parse().unwrap());
        assert_eq!(HeritageRoles::USER, "user".parse().unwrap());
        assert_eq!(HeritageRoles::NONE, "superuser".parse().unwrap());
    }

    #[test]
    fn roles_display() {
        assert_eq!("Admin", HeritageRoles::ADMIN.to_string());
        assert_eq!("User, Admin", (HeritageRoles::ADMIN | HeritageRoles::USER).to_string());
        assert_eq!("No", HeritageRoles::NONE.to_string());
    }
}
