use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Identity;

/// A `profiles` row, keyed by identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub student_id: String,
    pub department: String,
    pub year: u32,
    pub semester: u8,
}

impl Profile {
    pub fn term(&self) -> Term {
        Term {
            year: self.year,
            semester: self.semester,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub year: u32,
    pub semester: u8,
}

impl Term {
    pub fn new(year: u32, semester: u8) -> Result<Self, AppError> {
        if year < 1 {
            return Err(AppError::Validation("year must be 1 or greater".to_string()));
        }
        if !(1..=3).contains(&semester) {
            return Err(AppError::Validation("semester must be 1, 2 or 3".to_string()));
        }
        Ok(Self { year, semester })
    }
}

/// What the profile screen shows. Built from the profile row when one exists;
/// otherwise from the identity alone, leaving the student id empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub full_name: String,
    pub email: String,
    pub student_id: Option<String>,
    pub department: Option<String>,
    pub term: Option<Term>,
}

impl ProfileView {
    pub fn from_profile(identity: &Identity, profile: Profile) -> Self {
        let term = profile.term();
        Self {
            full_name: profile.full_name,
            email: identity.email.clone(),
            student_id: Some(profile.student_id),
            department: Some(profile.department),
            term: Some(term),
        }
    }

    pub fn from_identity(identity: &Identity) -> Self {
        let full_name = identity
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| identity.email.clone());
        Self {
            full_name,
            email: identity.email.clone(),
            student_id: identity.student_number.clone(),
            department: None,
            term: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(display_name: Option<&str>) -> Identity {
        Identity {
            id: "u-1".to_string(),
            email: "jane@student.edu".to_string(),
            display_name: display_name.map(str::to_string),
            student_number: None,
        }
    }

    #[test]
    fn term_rejects_out_of_range_values() {
        assert!(Term::new(0, 1).is_err());
        assert!(Term::new(2, 0).is_err());
        assert!(Term::new(2, 4).is_err());
        assert_eq!(Term::new(3, 3).unwrap(), Term { year: 3, semester: 3 });
    }

    #[test]
    fn identity_fallback_never_invents_a_student_id() {
        let view = ProfileView::from_identity(&identity(Some("Jane Roe")));
        assert_eq!(view.full_name, "Jane Roe");
        assert_eq!(view.student_id, None);

        let view = ProfileView::from_identity(&identity(Some("  ")));
        assert_eq!(view.full_name, "jane@student.edu");
    }
}
