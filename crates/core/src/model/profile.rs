use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ProfileId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("profile name cannot be empty")]
    EmptyName,

    #[error("unknown CEFR level: {0}")]
    UnknownCefrLevel(String),
}

/// Common European Framework of Reference proficiency bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum CefrLevel {
    #[default]
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }

    /// Human label shown next to the band on the dashboard.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            CefrLevel::A1 | CefrLevel::A2 => "Beginner",
            CefrLevel::B1 | CefrLevel::B2 => "Intermediate",
            CefrLevel::C1 | CefrLevel::C2 => "Advanced",
        }
    }
}

impl FromStr for CefrLevel {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            _ => Err(ProfileError::UnknownCefrLevel(s.to_string())),
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Learner profile shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// `None` until the profile has been persisted.
    pub id: Option<ProfileId>,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub cefr_level: CefrLevel,
    pub streak: u32,
    pub total_hours: f64,
    pub join_date: NaiveDate,
    pub preferred_language: Option<String>,
    pub learning_goals: Vec<String>,
}

impl Profile {
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyName` if the name is blank.
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        join_date: NaiveDate,
    ) -> Result<Self, ProfileError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        Ok(Self {
            id: None,
            user_id,
            avatar: avatar_url(&name),
            name,
            email: email.into(),
            cefr_level: CefrLevel::default(),
            streak: 0,
            total_hours: 0.0,
            join_date,
            preferred_language: None,
            learning_goals: Vec::new(),
        })
    }

    /// Stand-in profile for learners who have not completed onboarding yet.
    #[must_use]
    pub fn placeholder(user_id: UserId, today: NaiveDate) -> Self {
        let name = "Learner".to_string();
        Self {
            id: None,
            user_id,
            avatar: avatar_url(&name),
            name,
            email: String::new(),
            cefr_level: CefrLevel::A1,
            streak: 0,
            total_hours: 0.0,
            join_date: today,
            preferred_language: None,
            learning_goals: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Generated avatar for a display name.
#[must_use]
pub fn avatar_url(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}

/// Billing state attached to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: String,
    pub status: String,
    pub renewal_date: Option<String>,
    pub billing_cycle: String,
    pub next_payment: String,
    pub features: Vec<String>,
}

impl Subscription {
    /// What a learner without a subscription row sees.
    #[must_use]
    pub fn free() -> Self {
        Self {
            plan: "Free Plan".into(),
            status: "Inactive".into(),
            renewal_date: None,
            billing_cycle: "Monthly".into(),
            next_payment: "$0.00".into(),
            features: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn placeholder_matches_onboarding_defaults() {
        let today = fixed_now().date_naive();
        let profile = Profile::placeholder(UserId::random(), today);
        assert_eq!(profile.name, "Learner");
        assert_eq!(profile.cefr_level, CefrLevel::A1);
        assert_eq!(profile.streak, 0);
        assert!(profile.avatar.ends_with("seed=Learner"));
        assert!(!profile.is_persisted());
    }

    #[test]
    fn cefr_levels_parse_case_insensitively() {
        assert_eq!("b2".parse::<CefrLevel>().unwrap(), CefrLevel::B2);
        assert_eq!(CefrLevel::B2.label(), "Intermediate");
        assert!("Z9".parse::<CefrLevel>().is_err());
    }

    #[test]
    fn free_subscription_is_inactive() {
        let sub = Subscription::free();
        assert_eq!(sub.plan, "Free Plan");
        assert!(!sub.is_active());
        assert!(sub.features.is_empty());
    }

    #[test]
    fn profile_requires_name() {
        let today = fixed_now().date_naive();
        let err = Profile::new(UserId::random(), "  ", "a@b.c", today).unwrap_err();
        assert_eq!(err, ProfileError::EmptyName);
    }
}
