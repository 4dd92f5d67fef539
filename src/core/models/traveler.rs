use serde::{Deserialize, Serialize};

/// Registered traveler. `password_hash` is a bcrypt hash and never leaves the
/// service layer; the API exposes travelers through `TravelerResponse`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Traveler {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}
