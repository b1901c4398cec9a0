use crate::core::error::{Result, TrackerError};
use crate::core::models::{
    Category, CategoryDraft, CategoryId, LogDraft, LogEntry, LogId, PricedLog, Settings,
    SettingsUpdate,
};
use crate::core::store::{LOCAL_USER_ID, Session, TrackerStore};
use crate::store::{default_habits, ensure_unique_name, ensure_unreferenced};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

/// Number of days of sample activity in the demo store.
const DEMO_DAYS: u64 = 30;

#[derive(Default)]
struct Tables {
    categories: BTreeMap<CategoryId, Category>,
    logs: BTreeMap<LogId, LogEntry>,
    settings: HashMap<String, Settings>,
    // Highest ids ever handed out; deleted ids are not reused.
    last_category_id: CategoryId,
    last_log_id: LogId,
}

impl Tables {
    fn next_category_id(&mut self) -> CategoryId {
        self.last_category_id += 1;
        self.last_category_id
    }

    fn next_log_id(&mut self) -> LogId {
        self.last_log_id += 1;
        self.last_log_id
    }

    fn owned_log(&self, session: &Session, id: LogId) -> Result<&LogEntry> {
        self.logs
            .get(&id)
            .filter(|l| l.user_id == session.user_id)
            .ok_or_else(|| TrackerError::not_found(format!("activity with id {id}")))
    }
}

/// Volatile store backing demo mode. Data lives as long as the process.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// A store with the default habits and one sample activity per day for the
    /// 30 days ending at `today`.
    pub fn with_demo_data(today: NaiveDate) -> Self {
        let mut tables = Tables::default();
        for draft in default_habits() {
            let id = tables.next_category_id();
            tables.categories.insert(id, draft.into_category(id));
        }

        let categories: Vec<Category> = tables.categories.values().cloned().collect();
        for offset in 0..DEMO_DAYS {
            let Some(date) = today.checked_sub_days(Days::new(DEMO_DAYS - 1 - offset)) else {
                continue;
            };
            // Cycles through 0.5..=8.0 hours in half-hour steps.
            let half_hours = (offset * 7) % 16 + 1;
            let category = &categories[(offset as usize) % categories.len()];
            let draft = LogDraft {
                date,
                hours: Decimal::new(half_hours as i64 * 5, 1),
                category_id: category.id,
                note: Some(format!("Sample activity {}", offset + 1)),
            };
            let id = tables.next_log_id();
            tables
                .logs
                .insert(id, draft.price(category).into_entry(id, LOCAL_USER_ID));
        }
        debug!(
            categories = tables.categories.len(),
            logs = tables.logs.len(),
            "Seeded demo store"
        );

        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackerStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().cloned().collect())
    }

    async fn add_category(&self, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let mut tables = self.tables.write().await;
        ensure_unique_name(tables.categories.values(), &draft, None)?;
        let id = tables.next_category_id();
        let category = draft.into_category(id);
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(TrackerError::not_found(format!("habit with id {id}")));
        }
        ensure_unique_name(tables.categories.values(), &draft, Some(id))?;
        let category = draft.into_category(id);
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(TrackerError::not_found(format!("habit with id {id}")));
        }
        ensure_unreferenced(tables.logs.values(), id)?;
        tables.categories.remove(&id);
        Ok(())
    }

    async fn list_logs(&self, session: &Session) -> Result<Vec<LogEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .logs
            .values()
            .filter(|l| l.user_id == session.user_id)
            .cloned()
            .collect())
    }

    async fn get_log(&self, session: &Session, id: LogId) -> Result<LogEntry> {
        let tables = self.tables.read().await;
        tables.owned_log(session, id).cloned()
    }

    async fn insert_log(&self, session: &Session, log: PricedLog) -> Result<LogEntry> {
        let mut tables = self.tables.write().await;
        let id = tables.next_log_id();
        let entry = log.into_entry(id, &session.user_id);
        tables.logs.insert(id, entry.clone());
        Ok(entry)
    }

    async fn update_log(&self, session: &Session, id: LogId, log: PricedLog) -> Result<LogEntry> {
        let mut tables = self.tables.write().await;
        tables.owned_log(session, id)?;
        let entry = log.into_entry(id, &session.user_id);
        tables.logs.insert(id, entry.clone());
        Ok(entry)
    }

    async fn delete_log(&self, session: &Session, id: LogId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.owned_log(session, id)?;
        tables.logs.remove(&id);
        Ok(())
    }

    async fn get_settings(&self, session: &Session) -> Result<Settings> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .settings
            .entry(session.user_id.clone())
            .or_insert_with(|| Settings::defaults_for(&session.user_id))
            .clone())
    }

    async fn upsert_settings(&self, session: &Session, update: SettingsUpdate) -> Result<Settings> {
        update.validate()?;
        let mut tables = self.tables.write().await;
        let settings = tables
            .settings
            .entry(session.user_id.clone())
            .or_insert_with(|| Settings::defaults_for(&session.user_id));
        settings.apply(&update);
        Ok(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Currency;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn test_demo_data_covers_thirty_days() {
        let store = MemoryStore::with_demo_data(today());
        let session = Session::local();

        let categories = store.list_categories().await.unwrap();
        assert_eq!(categories.len(), 5);
        assert_eq!(categories[0].name, "Work");

        let logs = store.list_logs(&session).await.unwrap();
        assert_eq!(logs.len(), 30);
        assert_eq!(logs.first().unwrap().date, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(logs.last().unwrap().date, today());
        assert!(
            logs.iter()
                .all(|l| l.hours >= dec!(0.5) && l.hours <= dec!(8.0))
        );
        for log in &logs {
            let category = categories.iter().find(|c| c.id == log.category_id).unwrap();
            assert_eq!(log.value, log.hours * category.rate);
        }
    }

    #[tokio::test]
    async fn test_habit_names_are_unique_and_referenced_habits_stay() {
        let store = MemoryStore::with_demo_data(today());

        let err = store
            .add_category(CategoryDraft {
                name: "WORK".to_string(),
                rate: dec!(10),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(_)));

        let err = store.delete_category(1).await.unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(_)));

        let unused = store
            .add_category(CategoryDraft {
                name: "Gardening".to_string(),
                rate: dec!(10),
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(unused.id, 6);
        store.delete_category(unused.id).await.unwrap();
        assert!(matches!(
            store.delete_category(unused.id).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_log_id_is_not_reused() {
        let store = MemoryStore::with_demo_data(today());
        let session = Session::local();
        let work = store.get_category(1).await.unwrap();

        store.delete_log(&session, 30).await.unwrap();
        let entry = store
            .insert_log(
                &session,
                LogDraft {
                    date: today(),
                    hours: dec!(1),
                    category_id: work.id,
                    note: None,
                }
                .price(&work),
            )
            .await
            .unwrap();
        assert_eq!(entry.id, 31);
    }

    #[tokio::test]
    async fn test_logs_are_scoped_to_the_session_user() {
        let store = MemoryStore::with_demo_data(today());
        let other = Session {
            user_id: "someone-else".to_string(),
            ..Session::local()
        };

        assert!(store.list_logs(&other).await.unwrap().is_empty());
        assert!(matches!(
            store.get_log(&other, 1).await,
            Err(TrackerError::NotFound(_))
        ));
        assert!(store.delete_log(&other, 1).await.is_err());
        assert!(store.get_log(&Session::local(), 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_settings_created_lazily_once() {
        let store = MemoryStore::new();
        let session = Session::local();

        let settings = store.get_settings(&session).await.unwrap();
        assert_eq!(settings, Settings::defaults_for(LOCAL_USER_ID));

        store
            .upsert_settings(
                &session,
                SettingsUpdate {
                    currency: Some(Currency::Gbp),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let settings = store.get_settings(&session).await.unwrap();
        assert_eq!(settings.currency, Currency::Gbp);
        assert_eq!(settings.savings_goal, dec!(100000));

        let err = store
            .upsert_settings(
                &session,
                SettingsUpdate {
                    savings_goal: Some(dec!(-1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
    }
}
