use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One historical game between a home and an away team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub date: NaiveDate,
    pub home: String,
    pub away: String,
    pub home_points: f64,
    pub away_points: f64,
    /// Played at a neutral site; no home advantage applies.
    pub neutral: bool,
}

impl Game {
    pub fn new(
        date: NaiveDate,
        home: impl Into<String>,
        away: impl Into<String>,
        home_points: f64,
        away_points: f64,
        neutral: bool,
    ) -> Self {
        Self {
            date,
            home: home.into(),
            away: away.into(),
            home_points,
            away_points,
            neutral,
        }
    }

    pub fn point_differential(&self) -> f64 {
        self.home_points - self.away_points
    }

    pub fn point_total(&self) -> f64 {
        self.home_points + self.away_points
    }
}

/// Ordered historical dataset, consumed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    games: Vec<Game>,
}

impl HistoricalData {
    pub fn new(games: Vec<Game>) -> Self {
        Self { games }
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.games.iter().map(|g| g.date).collect()
    }

    pub fn home_teams(&self) -> Vec<String> {
        self.games.iter().map(|g| g.home.clone()).collect()
    }

    pub fn away_teams(&self) -> Vec<String> {
        self.games.iter().map(|g| g.away.clone()).collect()
    }

    pub fn neutral(&self) -> Vec<bool> {
        self.games.iter().map(|g| g.neutral).collect()
    }
}

impl From<Vec<Game>> for HistoricalData {
    fn from(games: Vec<Game>) -> Self {
        Self::new(games)
    }
}
