//! Verified caller identities
//!
//! Authentication happens outside the engine; an `Actor` is what the
//! transport layer hands over once it has verified the caller.

use crate::error::Rejection;
use roster_ledger::{LeagueId, Team, TeamId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Actor {
    /// Owner acting for one team
    Team { user: UserId, team: TeamId },
    /// Commissioner of one league
    Commissioner { user: UserId, league: LeagueId },
}

impl Actor {
    pub fn user(&self) -> UserId {
        match self {
            Actor::Team { user, .. } | Actor::Commissioner { user, .. } => *user,
        }
    }

    /// Require that the actor owns `team`
    pub fn authorize_team(&self, team: &Team) -> Result<(), Rejection> {
        match self {
            Actor::Team { user, team: id } if *id == team.id && *user == team.owner => Ok(()),
            _ => Err(Rejection::NotAuthorized(format!(
                "user {} cannot act for team {}",
                self.user(),
                team.id
            ))),
        }
    }

    /// Require that the actor is commissioner of `league`
    pub fn authorize_commissioner(&self, league: LeagueId) -> Result<(), Rejection> {
        match self {
            Actor::Commissioner { league: id, .. } if *id == league => Ok(()),
            _ => Err(Rejection::NotAuthorized(format!(
                "user {} is not commissioner of league {league}",
                self.user()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Team {
        Team { id: 3, league: 1, name: "Otters".into(), owner: 30, waiver_priority: 2 }
    }

    #[test]
    fn test_team_binding() {
        assert!(Actor::Team { user: 30, team: 3 }.authorize_team(&team()).is_ok());
        assert!(Actor::Team { user: 31, team: 3 }.authorize_team(&team()).is_err());
        assert!(Actor::Team { user: 30, team: 4 }.authorize_team(&team()).is_err());
        assert!(Actor::Commissioner { user: 30, league: 1 }.authorize_team(&team()).is_err());
    }

    #[test]
    fn test_commissioner_binding() {
        let actor = Actor::Commissioner { user: 1, league: 1 };
        assert!(actor.authorize_commissioner(1).is_ok());
        let err = actor.authorize_commissioner(2).unwrap_err();
        assert_eq!(err.code(), "not_authorized");
    }
}
