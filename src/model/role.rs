use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum Role {
    /// Manages user accounts and sees everyone's attendance.
    Owner,
    #[default]
    Employee,
}

impl Role {
    pub fn is_owner(self) -> bool {
        self == Role::Owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_stored_name() {
        assert_eq!(Role::Owner.to_string(), "Owner");
        assert_eq!(Role::from_str("Employee").unwrap(), Role::Employee);
        assert!(Role::from_str("Admin").is_err());
        assert_eq!(Role::default(), Role::Employee);
    }
}
