//! League seed files
//!
//! A seed is a JSON document describing one league: its configuration, teams,
//! player pool, draft board and game kickoffs. Importing writes it through the
//! store so the journal records it like any other change.

use anyhow::{ensure, Context, Result};
use roster_ledger::{
    DraftPick, GameKickoff, LeagueConfig, LeagueId, LeagueStore, Player, Team, TeamId, UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSeed {
    pub league: LeagueId,
    #[serde(default)]
    pub config: LeagueConfig,
    pub teams: Vec<TeamSeed>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub picks: Vec<PickSeed>,
    #[serde(default)]
    pub kickoffs: Vec<GameKickoff>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSeed {
    pub id: TeamId,
    pub name: String,
    pub owner: UserId,
    pub waiver_priority: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickSeed {
    /// Defaults to the league's season
    pub year: Option<i32>,
    pub round: u32,
    pub overall: u32,
    pub owner: TeamId,
    /// Defaults to `owner`
    pub original_team: Option<TeamId>,
}

/// What an import wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub teams: usize,
    pub players: usize,
    pub picks: usize,
    pub kickoffs: usize,
}

impl LeagueSeed {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {path:?}"))?;
        Self::from_json(&raw).with_context(|| format!("Invalid seed file {path:?}"))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let seed: Self = serde_json::from_str(raw).context("Failed to parse league seed")?;
        seed.validate()?;
        Ok(seed)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.teams.is_empty(), "league {} has no teams", self.league);
        self.config.validate().map_err(anyhow::Error::msg)?;

        let mut teams = HashSet::new();
        let mut priorities = HashSet::new();
        for team in &self.teams {
            ensure!(teams.insert(team.id), "team {} is listed twice", team.id);
            ensure!(
                priorities.insert(team.waiver_priority),
                "waiver priority {} is shared by two teams",
                team.waiver_priority
            );
        }

        let mut players = HashSet::new();
        for player in &self.players {
            ensure!(players.insert(player.id), "player {} is listed twice", player.id);
        }

        let mut overalls = HashSet::new();
        for pick in &self.picks {
            let year = pick.year.unwrap_or(self.config.season_year);
            ensure!(
                overalls.insert((year, pick.overall)),
                "pick {} of {year} is listed twice",
                pick.overall
            );
            ensure!(pick.round > 0 && pick.overall > 0, "pick numbers start at 1");
            for team in [Some(pick.owner), pick.original_team].into_iter().flatten() {
                ensure!(teams.contains(&team), "pick {} names unknown team {team}", pick.overall);
            }
        }

        Ok(())
    }
}

/// Write a seed into the store
pub async fn import(store: &dyn LeagueStore, seed: &LeagueSeed) -> Result<ImportSummary> {
    seed.validate()?;
    let league = seed.league;

    store
        .put_league_config(league, seed.config.clone())
        .await
        .with_context(|| format!("Failed to store config of league {league}"))?;

    for team in &seed.teams {
        store
            .upsert_team(Team {
                id: team.id,
                league,
                name: team.name.clone(),
                owner: team.owner,
                waiver_priority: team.waiver_priority,
            })
            .await
            .with_context(|| format!("Failed to store team {}", team.id))?;
    }

    for player in &seed.players {
        store
            .upsert_player(player.clone())
            .await
            .with_context(|| format!("Failed to store player {}", player.id))?;
    }

    // Re-importing must not duplicate the board
    let years: HashSet<i32> =
        seed.picks.iter().map(|p| p.year.unwrap_or(seed.config.season_year)).collect();
    let mut existing: HashSet<(i32, u32)> = HashSet::new();
    for year in years {
        for pick in store.draft_picks(league, year).await? {
            existing.insert((pick.year, pick.overall));
        }
    }

    let mut picks = 0;
    for pick in &seed.picks {
        let year = pick.year.unwrap_or(seed.config.season_year);
        if existing.contains(&(year, pick.overall)) {
            continue;
        }
        store
            .insert_pick(DraftPick {
                id: 0,
                league,
                year,
                round: pick.round,
                overall: pick.overall,
                original_team: pick.original_team.unwrap_or(pick.owner),
                owner: pick.owner,
                player: None,
                picked_at: None,
            })
            .await
            .with_context(|| format!("Failed to store pick {} of {year}", pick.overall))?;
        picks += 1;
    }

    for kickoff in &seed.kickoffs {
        store
            .put_kickoff(kickoff.clone())
            .await
            .with_context(|| format!("Failed to store kickoff of {}", kickoff.nfl_team))?;
    }

    let summary = ImportSummary {
        teams: seed.teams.len(),
        players: seed.players.len(),
        picks,
        kickoffs: seed.kickoffs.len(),
    };
    info!(league, ?summary, "league seed imported");
    Ok(summary)
}
