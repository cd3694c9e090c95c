//! Payment instrument adapters

use std::sync::Arc;

use async_trait::async_trait;
use paygate_store::{CardRepository, CardSpec};
use paygate_types::Card;

use crate::error::{CoreError, CoreResult};
use crate::request::CardData;

/// Durable identity of the card instrument plugin.
pub const CARD_INSTRUMENT_ID: i32 = 1;
pub const CARD_INSTRUMENT_KEY: &str = "card";

/// Normalises a payment-instrument payload into a stored instrument row.
#[async_trait]
pub trait PaymentInstrument: Send + Sync {
    async fn from_request(&self, card: &CardData) -> CoreResult<Card>;
}

/// The card instrument: look the card up by PAN, insert it on first
/// sight, return the stored row. The CVV is never written anywhere.
pub struct CardInstrument {
    cards: Arc<dyn CardRepository>,
}

impl CardInstrument {
    pub fn new(cards: Arc<dyn CardRepository>) -> Self {
        Self { cards }
    }
}

#[async_trait]
impl PaymentInstrument for CardInstrument {
    async fn from_request(&self, card: &CardData) -> CoreResult<Card> {
        let (_, existing) = self
            .cards
            .query(&CardSpec::ByPan(card.pan.clone()))
            .await
            .map_err(CoreError::Store)?;

        if let Some(stored) = existing.into_iter().next() {
            return Ok(stored);
        }

        let mut stored = Card {
            id: 0,
            pan: card.pan.clone(),
            exp_date: card.expire,
            holder: card.holder.clone(),
        };
        self.cards.add(&mut stored).await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use paygate_store::memory::MemoryCardRepository;

    fn card_data(pan: &str) -> CardData {
        CardData {
            pan: pan.into(),
            cvv: "123".into(),
            expire: NaiveDate::from_ymd_opt(2027, 12, 1).unwrap(),
            holder: "CARD HOLDER".into(),
        }
    }

    #[tokio::test]
    async fn test_card_is_inserted_once() {
        let repo = Arc::new(MemoryCardRepository::new());
        let instrument = CardInstrument::new(repo.clone());

        let first = instrument
            .from_request(&card_data("4111111111111111"))
            .await
            .unwrap();
        let second = instrument
            .from_request(&card_data("4111111111111111"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let (total, _) = repo.query(&CardSpec::All).await.unwrap();
        assert_eq!(total, 1);
    }
}
