use serde::{Deserialize, Serialize};

use crate::AuthorizationError;

/// Permission state of a protected resource.
///
/// Raw values match the platform enum, so statuses read from native APIs can
/// be converted with [`TryFrom<u64>`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    specta::Type,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AuthorizationStatus {
    /// Neither the user nor the system has made a decision yet
    #[default]
    NotDetermined,
    /// Access has been explicitly refused
    Denied,
    /// Access has been explicitly granted
    Authorized,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::NotDetermined)
    }

    pub fn raw(&self) -> u64 {
        match self {
            Self::NotDetermined => 0,
            Self::Denied => 1,
            Self::Authorized => 2,
        }
    }

    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

impl TryFrom<u64> for AuthorizationStatus {
    type Error = AuthorizationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::NotDetermined,
            1 => Self::Denied,
            2 => Self::Authorized,
            other => return Err(AuthorizationError::UnknownStatus(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn definition_order() {
        let all = AuthorizationStatus::iter().collect::<Vec<_>>();

        assert_eq!(
            all,
            vec![
                AuthorizationStatus::NotDetermined,
                AuthorizationStatus::Denied,
                AuthorizationStatus::Authorized,
            ]
        );
    }

    #[test]
    fn raw_values() {
        for status in AuthorizationStatus::iter() {
            assert_eq!(AuthorizationStatus::try_from(status.raw()).unwrap(), status);
        }

        assert!(matches!(
            AuthorizationStatus::try_from(3),
            Err(AuthorizationError::UnknownStatus(3))
        ));
    }

    #[test]
    fn predicates() {
        assert!(!AuthorizationStatus::NotDetermined.is_determined());
        assert!(AuthorizationStatus::Denied.is_determined());
        assert!(!AuthorizationStatus::Denied.is_authorized());
        assert!(AuthorizationStatus::Authorized.is_authorized());
    }

    #[test]
    fn names() {
        assert_eq!(
            AuthorizationStatus::NotDetermined.to_string(),
            "notDetermined"
        );
        assert_eq!(
            AuthorizationStatus::from_str("authorized").unwrap(),
            AuthorizationStatus::Authorized
        );
        assert!(AuthorizationStatus::from_str("granted").is_err());

        assert_eq!(
            serde_json::to_string(&AuthorizationStatus::Denied).unwrap(),
            "\"denied\""
        );
        assert_eq!(
            serde_json::from_str::<AuthorizationStatus>("\"notDetermined\"").unwrap(),
            AuthorizationStatus::NotDetermined
        );
    }
}
