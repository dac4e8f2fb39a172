//! Points tables and their aggregation.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ServiceError;

/// Highest raw value accepted in a points payload before clamping.
pub const MAX_RAW_POINTS: i64 = 100;

/// Validated mapping nickname → points awarded for one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsTable(IndexMap<String, u8>);

impl PointsTable {
    /// Validate a loose client payload against the room's players.
    ///
    /// Every key must name a player and every value must be an integer in
    /// `0..=100`. Accepted values are clamped to `max_points`.
    pub fn from_raw(
        raw: &IndexMap<String, Value>,
        is_player: impl Fn(&str) -> bool,
        max_points: u8,
    ) -> Result<Self, ServiceError> {
        let mut table = IndexMap::with_capacity(raw.len());
        for (nickname, value) in raw {
            if !is_player(nickname) {
                return Err(ServiceError::InvalidInput(format!(
                    "`{nickname}` is not a player of this room"
                )));
            }
            let points = value
                .as_i64()
                .filter(|points| (0..=MAX_RAW_POINTS).contains(points))
                .ok_or_else(|| {
                    ServiceError::InvalidInput(format!(
                        "points for `{nickname}` must be an integer between 0 and {MAX_RAW_POINTS}"
                    ))
                })?;
            let clamped = u8::try_from(points).unwrap_or(u8::MAX).min(max_points);
            table.insert(nickname.clone(), clamped);
        }
        Ok(Self(table))
    }

    /// Points awarded to `nickname`, if listed.
    pub fn get(&self, nickname: &str) -> Option<u8> {
        self.0.get(nickname).copied()
    }

    /// Iterate over `(nickname, points)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(nickname, points)| (nickname.as_str(), *points))
    }

    /// Number of listed players.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no player is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying ordered map.
    pub fn as_map(&self) -> &IndexMap<String, u8> {
        &self.0
    }
}

impl From<IndexMap<String, u8>> for PointsTable {
    fn from(map: IndexMap<String, u8>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, u8)> for PointsTable {
    fn from_iter<T: IntoIterator<Item = (String, u8)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Average several ballots into one table.
///
/// Each player's score is the mean of the ballots that list them, rounded
/// half up. Players no ballot mentions are left out.
pub fn average_ballots<'a>(
    ballots: impl IntoIterator<Item = &'a PointsTable>,
    players: impl IntoIterator<Item = &'a str>,
) -> PointsTable {
    let ballots: Vec<&PointsTable> = ballots.into_iter().collect();
    players
        .into_iter()
        .filter_map(|nickname| {
            let (sum, count) = ballots
                .iter()
                .filter_map(|ballot| ballot.get(nickname))
                .fold((0u32, 0u32), |(sum, count), points| {
                    (sum + u32::from(points), count + 1)
                });
            if count == 0 {
                return None;
            }
            let average = (sum * 2 + count) / (count * 2);
            Some((nickname.to_owned(), u8::try_from(average).unwrap_or(u8::MAX)))
        })
        .collect()
}
