use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, Entity, KitchenId, ReminderId, within_days};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderKind {
    LowStock,
    Expiry,
    Shopping,
    Festival,
    Appliance,
    GasCylinder,
    WaterCan,
    #[default]
    Custom,
}

/// Input for scheduling a reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    #[serde(default)]
    pub kind: ReminderKind,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    /// Free-form cadence such as "weekly"; only meaningful when recurring.
    pub frequency: Option<String>,
}

impl NewReminder {
    pub fn at(kind: ReminderKind, title: impl Into<String>, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
            scheduled_at,
            is_recurring: false,
            frequency: None,
        }
    }

    pub fn recurring(mut self, frequency: impl Into<String>) -> Self {
        self.is_recurring = true;
        self.frequency = Some(frequency.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    id: ReminderId,
    kitchen_id: KitchenId,
    kind: ReminderKind,
    title: String,
    description: Option<String>,
    scheduled_at: DateTime<Utc>,
    is_recurring: bool,
    frequency: Option<String>,
    is_completed: bool,
}

impl Reminder {
    pub fn new(id: ReminderId, kitchen_id: KitchenId, input: NewReminder) -> Result<Self, DomainError> {
        if input.title.trim().is_empty() {
            return Err(DomainError::validation("reminder title cannot be empty"));
        }
        if input.is_recurring && input.frequency.as_deref().is_none_or(|f| f.trim().is_empty()) {
            return Err(DomainError::validation("recurring reminders need a frequency"));
        }

        Ok(Self {
            id,
            kitchen_id,
            kind: input.kind,
            title: input.title,
            description: input.description,
            scheduled_at: input.scheduled_at,
            is_recurring: input.is_recurring,
            frequency: input.frequency,
            is_completed: false,
        })
    }

    pub fn kitchen_id(&self) -> KitchenId {
        self.kitchen_id
    }

    pub fn kind(&self) -> ReminderKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    pub fn is_recurring(&self) -> bool {
        self.is_recurring
    }

    pub fn frequency(&self) -> Option<&str> {
        self.frequency.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.is_completed = completed;
    }

    /// Open and scheduled within `[now, now + days]`.
    pub fn is_upcoming(&self, now: DateTime<Utc>, days: u32) -> bool {
        !self.is_completed && within_days(self.scheduled_at, now, days)
    }
}

impl Entity for Reminder {
    type Id = ReminderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
