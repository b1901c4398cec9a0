//! Write path for activities: validation, pricing at write time and bulk edits.
use crate::core::error::{Result, TrackerError};
use crate::core::models::{
    Category, CategoryId, LogDraft, LogEntry, LogId, MIN_ADJUSTED_HOURS, entry_value,
};
use crate::core::store::{Session, TrackerStore};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Edit applied to every selected entry in a bulk operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    AdjustHours(Decimal),
    ChangeCategory(CategoryId),
    AppendNote(String),
    Delete,
}

#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failures: Vec<(LogId, TrackerError)>,
}

impl BulkOutcome {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failures.len()
    }
}

pub struct Tracker<'a> {
    store: &'a dyn TrackerStore,
    session: &'a Session,
}

impl<'a> Tracker<'a> {
    pub fn new(store: &'a dyn TrackerStore, session: &'a Session) -> Self {
        Self { store, session }
    }

    /// Value an activity would receive if it were logged now.
    pub fn preview_value(hours: Decimal, category: &Category) -> Decimal {
        entry_value(hours, category.rate)
    }

    pub async fn log_activity(&self, draft: LogDraft) -> Result<LogEntry> {
        draft.validate()?;
        let category = self.store.get_category(draft.category_id).await?;
        let priced = draft.price(&category);
        debug!(
            category = %category.name,
            hours = %priced.hours,
            value = %priced.value,
            "Pricing activity"
        );
        let entry = self.store.insert_log(self.session, priced).await?;
        info!(id = entry.id, "Logged activity");
        Ok(entry)
    }

    /// Replaces an entry. The value is recomputed from the habit's current rate.
    pub async fn edit_activity(&self, id: LogId, draft: LogDraft) -> Result<LogEntry> {
        draft.validate()?;
        let category = self.store.get_category(draft.category_id).await?;
        let entry = self
            .store
            .update_log(self.session, id, draft.price(&category))
            .await?;
        info!(id, "Updated activity");
        Ok(entry)
    }

    pub async fn delete_activity(&self, id: LogId) -> Result<()> {
        self.store.delete_log(self.session, id).await?;
        info!(id, "Deleted activity");
        Ok(())
    }

    /// Applies `action` to each entry independently; one failure does not stop the rest.
    pub async fn bulk_apply(&self, ids: &[LogId], action: &BulkAction) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            match self.apply_one(id, action).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    warn!(id, error = %e, "Bulk edit failed for activity");
                    outcome.failures.push((id, e));
                }
            }
        }
        outcome
    }

    async fn apply_one(&self, id: LogId, action: &BulkAction) -> Result<()> {
        let draft = match action {
            BulkAction::Delete => return self.delete_activity(id).await,
            BulkAction::AdjustHours(delta) => {
                let mut draft = self.current_draft(id).await?;
                draft.hours = draft
                    .hours
                    .saturating_add(*delta)
                    .max(MIN_ADJUSTED_HOURS);
                draft
            }
            BulkAction::ChangeCategory(category_id) => LogDraft {
                category_id: *category_id,
                ..self.current_draft(id).await?
            },
            BulkAction::AppendNote(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(TrackerError::invalid("note to append must not be empty"));
                }
                let mut draft = self.current_draft(id).await?;
                draft.note = Some(match draft.note.as_deref().map(str::trim) {
                    Some(existing) if !existing.is_empty() => format!("{existing} {text}"),
                    _ => text.to_string(),
                });
                draft
            }
        };
        self.edit_activity(id, draft).await.map(|_| ())
    }

    async fn current_draft(&self, id: LogId) -> Result<LogDraft> {
        Ok(self.store.get_log(self.session, id).await?.to_draft())
    }
}
