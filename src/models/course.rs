use serde::{Deserialize, Serialize};

/// A course offering. Maintained by staff; read-only from the student side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub instructor: String,
    /// Display string such as "Mon, Wed 10:00 AM".
    pub schedule: String,
    #[serde(default = "open_by_default")]
    pub available: bool,
}

fn open_by_default() -> bool {
    true
}
