use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The role of a user, determining what they may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Official,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let role = match self {
            Self::Citizen => "citizen",
            Self::Official => "official",
            Self::Admin => "admin",
        };
        write!(f, "{}", role)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" => Ok(Self::Citizen),
            "official" => Ok(Self::Official),
            "admin" => Ok(Self::Admin),
            _ => Err(format!(
                "Invalid role '{}', expected one of 'citizen', 'official', 'admin'",
                s
            )),
        }
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).unwrap() // Valid because `Role` serialization doesn't fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roles() {
        assert_eq!("citizen".parse::<Role>().unwrap(), Role::Citizen);
        assert_eq!("official".parse::<Role>().unwrap(), Role::Official);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("mayor".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }
}
