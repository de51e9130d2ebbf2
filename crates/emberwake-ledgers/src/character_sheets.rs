//! Character sheets: stats, level, experience, currency and standing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use emberwake_core::error::DomainError;
use emberwake_core::ledger::{CharacterSheet, CharacterSheets, LevelProgress};
use emberwake_core::record::{RecordKey, RecordStore, encode};
use emberwake_core::rng::DeterministicRng;

/// Record namespace holding character sheets.
pub const NAMESPACE: &str = "characters";

const SHEET_KEY: &str = "sheet";

/// Experience needed per level.
pub const EXPERIENCE_PER_LEVEL: u32 = 100;

/// Stat bounds after a level-up bonus.
pub const STAT_MIN: i32 = 1;
/// Upper stat bound.
pub const STAT_MAX: i32 = 20;

/// Stats a new sheet starts with.
pub const DEFAULT_STATS: [(&str, i32); 10] = [
    ("endurance", 5),
    ("strength", 5),
    ("defense", 5),
    ("speed", 5),
    ("charisma", 5),
    ("empathy", 5),
    ("intimidation", 5),
    ("cunning", 5),
    ("perception", 5),
    ("luck", 5),
];

/// Social stats eligible for the level-up bonus.
pub const LEVEL_UP_STATS: [&str; 4] = [
    "charisma",
    "empathy",
    "intimidation",
    "cunning",
];

/// `CharacterSheets` over the record store, one record per subject.
pub struct StoreCharacterSheets {
    store: Arc<dyn RecordStore>,
    rng: Mutex<Box<dyn DeterministicRng>>,
}

impl StoreCharacterSheets {
    /// Creates the ledger. `rng` picks the stat raised on each level-up.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, rng: Box<dyn DeterministicRng>) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    fn key(subject_id: Uuid) -> RecordKey {
        RecordKey::new(NAMESPACE, subject_id, SHEET_KEY)
    }

    async fn load(&self, subject_id: Uuid) -> Result<Option<(CharacterSheet, i64)>, DomainError> {
        self.store
            .get(&Self::key(subject_id))
            .await?
            .map(|stored| -> Result<(CharacterSheet, i64), DomainError> {
                Ok((stored.decode()?, stored.version))
            })
            .transpose()
    }

    fn level_up_bonus(&self, sheet: &mut CharacterSheet) -> &'static str {
        #[allow(clippy::cast_possible_truncation)]
        let last = (LEVEL_UP_STATS.len() - 1) as u32;
        let roll = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u32_range(0, last);
        let stat = LEVEL_UP_STATS[(roll as usize).min(LEVEL_UP_STATS.len() - 1)];
        let value = sheet.stats.entry(stat.to_owned()).or_insert(STAT_MIN);
        *value = (*value + 1).clamp(STAT_MIN, STAT_MAX);
        stat
    }
}

#[async_trait]
impl CharacterSheets for StoreCharacterSheets {
    async fn sheet(&self, subject_id: Uuid) -> Result<Option<CharacterSheet>, DomainError> {
        Ok(self.load(subject_id).await?.map(|(sheet, _)| sheet))
    }

    async fn create(&self, subject_id: Uuid, name: &str) -> Result<CharacterSheet, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("character name must not be empty".into()));
        }

        let sheet = CharacterSheet {
            subject_id,
            name: name.to_owned(),
            level: 1,
            experience: 0,
            currency: 0,
            standing: 0,
            stats: DEFAULT_STATS
                .iter()
                .map(|(stat, value)| ((*stat).to_owned(), *value))
                .collect::<BTreeMap<_, _>>(),
        };
        match self.store.put(&Self::key(subject_id), encode(&sheet)?, 0).await {
            Ok(_) => {
                info!(%subject_id, name, "character created");
                Ok(sheet)
            }
            Err(DomainError::ConcurrencyConflict { .. }) => Err(DomainError::Validation(format!(
                "subject {subject_id} already has a character"
            ))),
            Err(e) => Err(e),
        }
    }

    async fn grant_experience(
        &self,
        subject_id: Uuid,
        amount: u32,
    ) -> Result<Option<LevelProgress>, DomainError> {
        let Some((mut sheet, version)) = self.load(subject_id).await? else {
            return Ok(None);
        };

        let mut experience = sheet.experience.saturating_add(amount);
        let mut levels_gained = 0;
        while experience >= EXPERIENCE_PER_LEVEL {
            experience -= EXPERIENCE_PER_LEVEL;
            sheet.level += 1;
            levels_gained += 1;
            let stat = self.level_up_bonus(&mut sheet);
            info!(%subject_id, level = sheet.level, stat, "level up");
        }
        sheet.experience = experience;

        self.store
            .put(&Self::key(subject_id), encode(&sheet)?, version)
            .await?;
        Ok(Some(LevelProgress {
            level: sheet.level,
            experience,
            levels_gained,
        }))
    }

    async fn add_currency(
        &self,
        subject_id: Uuid,
        amount: u32,
    ) -> Result<Option<u64>, DomainError> {
        let Some((mut sheet, version)) = self.load(subject_id).await? else {
            return Ok(None);
        };
        sheet.currency = sheet.currency.saturating_add(u64::from(amount));
        self.store
            .put(&Self::key(subject_id), encode(&sheet)?, version)
            .await?;
        Ok(Some(sheet.currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberwake_store::MemoryRecordStore;
    use emberwake_test_support::{MockRng, SequenceRng};

    fn sheets(rng: Box<dyn DeterministicRng>) -> StoreCharacterSheets {
        StoreCharacterSheets::new(Arc::new(MemoryRecordStore::new()), rng)
    }

    #[tokio::test]
    async fn test_create_starts_at_level_one_with_default_stats() {
        let sheets = sheets(Box::new(MockRng));
        let subject = Uuid::new_v4();

        let sheet = sheets.create(subject, "  Mira ").await.unwrap();

        assert_eq!(sheet.name, "Mira");
        assert_eq!(sheet.level, 1);
        assert_eq!(sheet.stats.get("charisma"), Some(&5));
        assert_eq!(sheets.sheet(subject).await.unwrap(), Some(sheet));
    }

    #[tokio::test]
    async fn test_create_twice_is_rejected() {
        let sheets = sheets(Box::new(MockRng));
        let subject = Uuid::new_v4();
        sheets.create(subject, "Mira").await.unwrap();

        let result = sheets.create(subject, "Mira").await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_grant_experience_levels_up_and_raises_a_stat() {
        // Arrange
        let sheets = sheets(Box::new(SequenceRng::new(vec![0, 1])));
        let subject = Uuid::new_v4();
        sheets.create(subject, "Mira").await.unwrap();

        // Act
        let progress = sheets.grant_experience(subject, 250).await.unwrap().unwrap();

        // Assert
        assert_eq!(
            progress,
            LevelProgress {
                level: 3,
                experience: 50,
                levels_gained: 2,
            }
        );
        let sheet = sheets.sheet(subject).await.unwrap().unwrap();
        assert_eq!(sheet.stats.get("charisma"), Some(&6));
        assert_eq!(sheet.stats.get("empathy"), Some(&6));
        assert_eq!(sheet.stats.get("endurance"), Some(&5));
    }

    #[tokio::test]
    async fn test_level_up_only_raises_social_stats() {
        // Arrange
        let sheets = sheets(Box::new(SequenceRng::new(vec![0, 1, 2, 3, 4, 5])));
        let subject = Uuid::new_v4();
        sheets.create(subject, "Mira").await.unwrap();

        // Act
        sheets.grant_experience(subject, 600).await.unwrap();

        // Assert
        let sheet = sheets.sheet(subject).await.unwrap().unwrap();
        assert_eq!(sheet.level, 7);
        assert_eq!(sheet.stats.get("charisma"), Some(&6));
        assert_eq!(sheet.stats.get("empathy"), Some(&6));
        assert_eq!(sheet.stats.get("intimidation"), Some(&6));
        assert_eq!(sheet.stats.get("cunning"), Some(&8));
        assert_eq!(sheet.stats.get("endurance"), Some(&5));
    }

    #[tokio::test]
    async fn test_level_up_bonus_is_clamped() {
        // Arrange
        let store = Arc::new(MemoryRecordStore::new());
        let sheets = StoreCharacterSheets::new(store.clone(), Box::new(MockRng));
        let subject = Uuid::new_v4();
        let mut sheet = sheets.create(subject, "Mira").await.unwrap();
        sheet.stats.insert("charisma".into(), STAT_MAX);
        store
            .put(&StoreCharacterSheets::key(subject), encode(&sheet).unwrap(), 1)
            .await
            .unwrap();

        // Act
        sheets.grant_experience(subject, 100).await.unwrap();

        // Assert
        let sheet = sheets.sheet(subject).await.unwrap().unwrap();
        assert_eq!(sheet.stats.get("charisma"), Some(&STAT_MAX));
        assert_eq!(sheet.level, 2);
    }

    #[tokio::test]
    async fn test_ledger_operations_without_sheet_return_none() {
        let sheets = sheets(Box::new(MockRng));
        let subject = Uuid::new_v4();

        assert_eq!(sheets.grant_experience(subject, 10).await.unwrap(), None);
        assert_eq!(sheets.add_currency(subject, 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_currency_accumulates() {
        let sheets = sheets(Box::new(MockRng));
        let subject = Uuid::new_v4();
        sheets.create(subject, "Mira").await.unwrap();

        sheets.add_currency(subject, 40).await.unwrap();
        let balance = sheets.add_currency(subject, 2).await.unwrap();

        assert_eq!(balance, Some(42));
    }
}
