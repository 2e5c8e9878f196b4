//! League tiers and the points that lead to them.

use crate::model::result::QuizResult;

/// Points per correct answer.
pub const POINTS_PER_CORRECT: u32 = 10;
/// Bonus for answering every question correctly.
pub const PERFECT_BONUS: u32 = 100;
/// Bonus for an excellent (>= 80 %) but not perfect result.
pub const EXCELLENT_BONUS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum League {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl League {
    pub const ALL: [League; 5] = [
        League::Bronze,
        League::Silver,
        League::Gold,
        League::Platinum,
        League::Diamond,
    ];

    #[must_use]
    pub fn min_points(self) -> u32 {
        match self {
            League::Bronze => 0,
            League::Silver => 500,
            League::Gold => 1500,
            League::Platinum => 3000,
            League::Diamond => 5000,
        }
    }

    /// Display name used by the app (Arabic).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            League::Bronze => "برونزي",
            League::Silver => "فضي",
            League::Gold => "ذهبي",
            League::Platinum => "بلاتيني",
            League::Diamond => "ماسي",
        }
    }

    /// Highest league whose threshold `points` reaches.
    #[must_use]
    pub fn for_points(points: u32) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|league| points >= league.min_points())
            .unwrap_or(League::Bronze)
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            League::Bronze => Some(League::Silver),
            League::Silver => Some(League::Gold),
            League::Gold => Some(League::Platinum),
            League::Platinum => Some(League::Diamond),
            League::Diamond => None,
        }
    }
}

/// Points earned by a single result.
#[must_use]
pub fn points_for(result: &QuizResult) -> u32 {
    let base = result.score().saturating_mul(POINTS_PER_CORRECT);
    let bonus = if result.is_perfect() {
        PERFECT_BONUS
    } else if result.is_excellent() {
        EXCELLENT_BONUS
    } else {
        0
    };
    base.saturating_add(bonus)
}

#[must_use]
pub fn total_points<'a>(results: impl IntoIterator<Item = &'a QuizResult>) -> u32 {
    results
        .into_iter()
        .fold(0_u32, |acc, r| acc.saturating_add(points_for(r)))
}

/// Points still missing to reach the next league; `None` at the top.
#[must_use]
pub fn points_to_next(points: u32) -> Option<u32> {
    League::for_points(points)
        .next()
        .map(|next| next.min_points().saturating_sub(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answers;

    fn result(score: u32, total: u32) -> QuizResult {
        QuizResult::new(score, total, Answers::new(), 0)
    }

    #[test]
    fn perfect_and_excellent_bonuses() {
        assert_eq!(points_for(&result(10, 10)), 200);
        assert_eq!(points_for(&result(8, 10)), 130);
        assert_eq!(points_for(&result(7, 10)), 70);
    }

    #[test]
    fn league_thresholds() {
        assert_eq!(League::for_points(0), League::Bronze);
        assert_eq!(League::for_points(499), League::Bronze);
        assert_eq!(League::for_points(500), League::Silver);
        assert_eq!(League::for_points(4999), League::Platinum);
        assert_eq!(League::for_points(9000), League::Diamond);
    }

    #[test]
    fn distance_to_next_league() {
        assert_eq!(points_to_next(330), Some(170));
        assert_eq!(points_to_next(5000), None);
    }

    #[test]
    fn totals_accumulate() {
        let results = [result(10, 10), result(8, 10)];
        assert_eq!(total_points(&results), 330);
    }
}
