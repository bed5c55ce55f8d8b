use cg_core::Pounds;
use std::fmt::Display;
use std::fmt::Formatter;

/// External listing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Auction,
    Dealer,
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auction => write!(f, "auction"),
            Self::Dealer => write!(f, "dealer"),
        }
    }
}

impl std::str::FromStr for Source {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auction" => Ok(Self::Auction),
            "dealer" => Ok(Self::Dealer),
            other => Err(format!("unknown source: {:?}", other)),
        }
    }
}

/// Game difficulty. Selects which source the cars are drawn from:
/// auction lots price erratically, dealership stock predictably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Hard,
}

impl Difficulty {
    pub fn source(self) -> Source {
        match self {
            Self::Easy => Source::Dealer,
            Self::Hard => Source::Auction,
        }
    }
    pub const ALL: [Difficulty; 2] = [Difficulty::Easy, Difficulty::Hard];
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty: {:?}", other)),
        }
    }
}

/// Source-specific listing metadata.
///
/// The two providers expose different shapes; modelling them as a sum
/// type keeps the rest of the pipeline uniform without nullable fields.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "source", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Provenance {
    Auction {
        house: String,
        lot: String,
        sale_date: String,
        estimate: Option<Pounds>,
    },
    Dealer {
        dealer: String,
        location: String,
        mileage: Option<u32>,
    },
}

impl Provenance {
    pub fn source(&self) -> Source {
        match self {
            Self::Auction { .. } => Source::Auction,
            Self::Dealer { .. } => Source::Dealer,
        }
    }
}

/// A single car listing.
///
/// Immutable once published into a corpus snapshot. Prices are whole
/// pounds; the ingest filter guarantees `price > 0` and never the £700
/// parse-failure sentinel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    id: String,
    price: Pounds,
    year: u16,
    make: String,
    model: String,
    title: String,
    description: String,
    images: Vec<String>,
    url: String,
    #[serde(flatten)]
    provenance: Provenance,
}

impl Listing {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        price: Pounds,
        year: u16,
        make: String,
        model: String,
        title: String,
        description: String,
        images: Vec<String>,
        url: String,
        provenance: Provenance,
    ) -> Self {
        Self {
            id,
            price,
            year,
            make,
            model,
            title,
            description,
            images,
            url,
            provenance,
        }
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn price(&self) -> Pounds {
        self.price
    }
    pub fn year(&self) -> u16 {
        self.year
    }
    pub fn make(&self) -> &str {
        &self.make
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn source(&self) -> Source {
        self.provenance.source()
    }
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }
    /// Copy of this listing with the price blanked for public responses.
    pub fn concealed(&self) -> Self {
        Self {
            price: 0,
            ..self.clone()
        }
    }
    /// Listing identifiers are 1-100 chars of `[A-Za-z0-9_-]`.
    pub fn valid_id(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= 100
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Listing {
        Listing::new(
            "lot-42".into(),
            18500,
            1987,
            "Porsche".into(),
            "944".into(),
            "1987 Porsche 944 S".into(),
            "One owner, full history.".into(),
            vec!["https://img.example/lot-42.jpg".into()],
            "https://auctions.example/lot/42".into(),
            Provenance::Auction {
                house: "Example Auctions".into(),
                lot: "42".into(),
                sale_date: "2025-11-02".into(),
                estimate: Some(20000),
            },
        )
    }

    #[test]
    fn difficulty_selects_source() {
        assert_eq!(Difficulty::Easy.source(), Source::Dealer);
        assert_eq!(Difficulty::Hard.source(), Source::Auction);
    }

    #[test]
    fn concealed_blanks_price_only() {
        let listing = sample();
        let hidden = listing.concealed();
        assert_eq!(hidden.price(), 0);
        assert_eq!(hidden.id(), listing.id());
        assert_eq!(hidden.provenance(), listing.provenance());
    }

    #[test]
    fn provenance_tag_is_source() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["source"], "auction");
        assert_eq!(json["saleDate"], "2025-11-02");
        let back: Listing = serde_json::from_value(json).unwrap();
        assert_eq!(back.source(), Source::Auction);
    }

    #[test]
    fn id_shape() {
        assert!(Listing::valid_id("lot-42"));
        assert!(Listing::valid_id("a"));
        assert!(!Listing::valid_id(""));
        assert!(!Listing::valid_id("has space"));
        assert!(!Listing::valid_id(&"x".repeat(101)));
    }
}
