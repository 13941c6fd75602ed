//! Games eligible for card-drop farming.

use std::fmt;

use super::AppId;

/// A title with card drops still pending.
///
/// Identity is the app id alone: `gameName` is display data, `hoursPlayed`
/// grows while the title is being played and `cardsRemaining` shrinks as the
/// web endpoint is resampled.
///
/// # Examples
///
/// ```
/// use droplord::domain::{AppId, Game};
///
/// let mut game = Game::new(AppId::new(440), "Team Fortress 2", 0.5, 3);
/// game.add_hours(1.5);
/// assert_eq!(game.hours_played(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct Game {
    app_id: AppId,
    name: String,
    hours_played: f32,
    cards_remaining: u16,
}

impl Game {
    /// Creates a game from a badges-scan row.
    pub fn new(app_id: AppId, name: impl Into<String>, hours_played: f32, cards_remaining: u16) -> Self {
        Self {
            app_id,
            name: name.into(),
            hours_played,
            cards_remaining,
        }
    }

    #[must_use]
    pub const fn app_id(&self) -> AppId {
        self.app_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn hours_played(&self) -> f32 {
        self.hours_played
    }

    #[must_use]
    pub const fn cards_remaining(&self) -> u16 {
        self.cards_remaining
    }

    /// Adds play time accrued during one farming wait window.
    pub fn add_hours(&mut self, hours: f32) {
        self.hours_played += hours;
    }

    /// Records a fresh cards-remaining observation from the web endpoint.
    pub fn set_cards_remaining(&mut self, cards: u16) {
        self.cards_remaining = cards;
    }
}

impl PartialEq for Game {
    fn eq(&self, other: &Self) -> bool {
        self.app_id == other.app_id
    }
}

impl Eq for Game {}

impl std::hash::Hash for Game {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.app_id.hash(state);
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.app_id)
    }
}

/// Display and scheduling order applied to the farm queue after a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FarmingOrder {
    #[default]
    Unordered,
    AppIdsAscending,
    NamesAscending,
    HoursAscending,
    HoursDescending,
}

impl FarmingOrder {
    /// Parses a configuration value; unknown values fall back to `Unordered`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unordered" => Some(Self::Unordered),
            "appids-ascending" => Some(Self::AppIdsAscending),
            "names-ascending" => Some(Self::NamesAscending),
            "hours-ascending" => Some(Self::HoursAscending),
            "hours-descending" => Some(Self::HoursDescending),
            _ => None,
        }
    }
}

/// The set of games left to farm, keyed by app id.
///
/// Insertion keeps first-seen rows: a second row for the same app id is
/// ignored. Iteration order is the order established by [`FarmQueue::sort`].
#[derive(Debug, Default)]
pub struct FarmQueue {
    games: Vec<Game>,
}

impl FarmQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a game unless one with the same app id is already queued.
    /// Returns whether the game was added.
    pub fn push(&mut self, game: Game) -> bool {
        if self.contains(game.app_id()) {
            return false;
        }
        self.games.push(game);
        true
    }

    /// Removes and returns the game with the given app id.
    pub fn remove(&mut self, app_id: AppId) -> Option<Game> {
        let idx = self.games.iter().position(|g| g.app_id() == app_id)?;
        Some(self.games.remove(idx))
    }

    #[must_use]
    pub fn contains(&self, app_id: AppId) -> bool {
        self.games.iter().any(|g| g.app_id() == app_id)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Game> {
        self.games.first()
    }

    #[must_use]
    pub fn get(&self, app_id: AppId) -> Option<&Game> {
        self.games.iter().find(|g| g.app_id() == app_id)
    }

    pub fn get_mut(&mut self, app_id: AppId) -> Option<&mut Game> {
        self.games.iter_mut().find(|g| g.app_id() == app_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Game> {
        self.games.iter()
    }

    pub fn clear(&mut self) {
        self.games.clear();
    }

    /// Total card drops pending across the queue.
    #[must_use]
    pub fn cards_remaining(&self) -> u32 {
        self.games.iter().map(|g| u32::from(g.cards_remaining())).sum()
    }

    /// Applies the configured ordering.
    pub fn sort(&mut self, order: FarmingOrder) {
        match order {
            FarmingOrder::Unordered => {}
            FarmingOrder::AppIdsAscending => self.games.sort_by_key(Game::app_id),
            FarmingOrder::NamesAscending => {
                self.games.sort_by(|a, b| a.name().cmp(b.name()));
            }
            FarmingOrder::HoursAscending => {
                self.games
                    .sort_by(|a, b| a.hours_played().total_cmp(&b.hours_played()));
            }
            FarmingOrder::HoursDescending => {
                self.games
                    .sort_by(|a, b| b.hours_played().total_cmp(&a.hours_played()));
            }
        }
    }

    /// The games with at least `threshold` hours on record, i.e. the solo
    /// candidates of the restricted algorithm.
    #[must_use]
    pub fn with_hours_at_least(&self, threshold: f32) -> Vec<Game> {
        self.games
            .iter()
            .filter(|g| g.hours_played() >= threshold)
            .cloned()
            .collect()
    }

    /// The top `limit` games by hours played, descending: the multiplexed
    /// set of the restricted algorithm.
    #[must_use]
    pub fn top_by_hours(&self, limit: usize) -> Vec<Game> {
        let mut games = self.games.clone();
        games.sort_by(|a, b| b.hours_played().total_cmp(&a.hours_played()));
        games.truncate(limit);
        games
    }

    /// Clones the queue contents in current order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Game> {
        self.games.clone()
    }
}
