//! Identifier newtypes
//!
//! Ids are UUID-backed and totally ordered. The ordering matters: when two
//! accounts are locked together, the lower id is always locked first.

macro_rules! entity_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(
                Debug,
                Clone,
                Copy,
                PartialEq,
                Eq,
                PartialOrd,
                Ord,
                Hash,
                serde::Deserialize,
                serde::Serialize,
            )]
            #[serde(transparent)]
            pub struct $name(uuid::Uuid);

            impl $name {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    uuid::Uuid::new_v4().into()
                }
            }

            impl From<uuid::Uuid> for $name {
                fn from(uuid: uuid::Uuid) -> Self {
                    Self(uuid)
                }
            }

            impl From<$name> for uuid::Uuid {
                fn from(id: $name) -> Self {
                    id.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl std::str::FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Ok(Self(uuid::Uuid::parse_str(s)?))
                }
            }
        )+
    };
}

entity_id! { AccountId, CustomerId, TransactionId }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_roundtrip() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(TransactionId::new(), TransactionId::new());
    }

    #[test]
    fn test_total_order() {
        let a = AccountId::from(uuid::Uuid::from_u128(1));
        let b = AccountId::from(uuid::Uuid::from_u128(2));
        assert!(a < b);
    }
}
