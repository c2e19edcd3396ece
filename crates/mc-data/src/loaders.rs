use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use mc_types::{CalResult, DataError, Game, HistoricalData};
use serde::Deserialize;

/// Raw CSV row: `date,home,away,home_points,away_points,neutral`.
#[derive(Debug, Deserialize)]
struct GameRecord {
    date: String,
    home: String,
    away: String,
    home_points: f64,
    away_points: f64,
    #[serde(default)]
    neutral: String,
}

/// Loads historical games from CSV feeds.
///
/// Rows are taken in file order and are not cleaned; a row that cannot be
/// parsed fails the whole load with its line number.
#[derive(Debug, Default)]
pub struct GameLoader;

impl GameLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load_csv<P: AsRef<Path>>(&self, file_path: P) -> CalResult<HistoricalData> {
        let path = file_path.as_ref();
        tracing::info!("Loading games from: {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| DataError::LoadingFailed {
            message: format!("Failed to open CSV file {}: {}", path.display(), e),
        })?;
        let data = self.read(file)?;

        tracing::info!("Loaded {} games from {}", data.len(), path.display());
        Ok(data)
    }

    pub fn read<R: Read>(&self, reader: R) -> CalResult<HistoricalData> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut games = Vec::new();
        for (index, result) in rdr.deserialize::<GameRecord>().enumerate() {
            // Header is line 1.
            let line = index + 2;
            let record = result.map_err(|e| DataError::ParseError {
                line,
                message: e.to_string(),
            })?;
            games.push(self.parse_record(record, line)?);
        }

        if games.is_empty() {
            return Err(DataError::Empty.into());
        }

        Ok(HistoricalData::new(games))
    }

    fn parse_record(&self, record: GameRecord, line: usize) -> CalResult<Game> {
        let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").map_err(|e| {
            DataError::ParseError {
                line,
                message: format!("invalid date '{}': {}", record.date, e),
            }
        })?;

        let neutral = match record.neutral.to_lowercase().as_str() {
            "" | "false" | "0" | "no" => false,
            "true" | "1" | "yes" => true,
            other => {
                return Err(DataError::ParseError {
                    line,
                    message: format!("invalid neutral flag '{}'", other),
                }
                .into())
            }
        };

        Ok(Game::new(
            date,
            record.home,
            record.away,
            record.home_points,
            record.away_points,
            neutral,
        ))
    }
}
