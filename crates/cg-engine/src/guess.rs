use super::*;
use cg_core::Points;
use cg_core::Pounds;
use cg_listings::Listing;

/// One scored guess inside a challenge session.
/// Append-only, ordered by `car_index`; the actual price is revealed
/// to the player once the guess is in.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeGuess {
    pub car_index: i32,
    pub car_id: String,
    pub guessed_price: Pounds,
    pub actual_price: Pounds,
    pub difference: Pounds,
    pub percentage: f64,
    pub points: Points,
}

impl ChallengeGuess {
    /// Scores a guess against the car at `index`.
    pub fn score(index: usize, car: &Listing, guessed: Pounds) -> Self {
        let actual = car.price();
        let percentage = score::percentage(actual, guessed);
        Self {
            car_index: index as i32,
            car_id: car.id().to_string(),
            guessed_price: guessed,
            actual_price: actual,
            difference: score::difference(actual, guessed),
            percentage,
            points: score::points(percentage),
        }
    }
}

mod schema {
    use super::*;
    use cg_pg::*;

    impl Schema for ChallengeGuess {
        fn name() -> &'static str {
            GUESSES
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                GUESSES,
                " (
                    session_id VARCHAR(16) NOT NULL REFERENCES ",
                SESSIONS,
                "(id) ON DELETE CASCADE,
                    car_index  INT NOT NULL,
                    car_id     VARCHAR(100) NOT NULL,
                    guessed    BIGINT NOT NULL,
                    actual     BIGINT NOT NULL,
                    difference BIGINT NOT NULL,
                    percentage DOUBLE PRECISION NOT NULL,
                    points     BIGINT NOT NULL,
                    PRIMARY KEY (session_id, car_index)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_guesses_session ON ",
                GUESSES,
                " (session_id);"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_listings::MockScraper;
    use cg_listings::Scraper;
    use cg_listings::Source;

    #[tokio::test]
    async fn scored_fields_are_consistent() {
        let car = MockScraper::new(Source::Auction)
            .fetch(1)
            .await
            .unwrap()
            .remove(0);
        let guess = ChallengeGuess::score(3, &car, car.price());
        assert_eq!(guess.car_index, 3);
        assert_eq!(guess.car_id, car.id());
        assert_eq!(guess.actual_price, car.price());
        assert_eq!(guess.difference, 0);
        assert_eq!(guess.percentage, 0.0);
        assert_eq!(guess.points, 5000);
    }
}
