use super::traveler::Traveler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Member,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Owner => "OWNER",
            Role::Member => "MEMBER",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TripMember {
    pub traveler_id: String,
    pub name: String,
    pub role: Role,
}

impl TripMember {
    pub fn new(traveler: &Traveler, role: Role) -> Self {
        TripMember {
            traveler_id: traveler.id.clone(),
            name: traveler.name.clone(),
            role,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub members: Vec<TripMember>,
    pub created_by: String,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn is_member(&self, traveler_id: &str) -> bool {
        self.members.iter().any(|m| m.traveler_id == traveler_id)
    }

    pub fn is_owner(&self, traveler_id: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.traveler_id == traveler_id && m.is_owner())
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.traveler_id.as_str())
    }
}
