use crate::error::{Error, Result};
use crate::models::TimeEntry;
use crate::storage::Storage;

use super::{all, find, remove, upsert};

pub struct TimeEntryRepo<'a> {
    storage: &'a Storage,
}

impl<'a> TimeEntryRepo<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn get_all(&self) -> Vec<TimeEntry> {
        all(self.storage)
    }

    pub fn get(&self, id: &str) -> Option<TimeEntry> {
        find(self.storage, id)
    }

    pub fn by_job_id(&self, job_id: &str) -> Vec<TimeEntry> {
        self.get_all()
            .into_iter()
            .filter(|t| t.job_id == job_id)
            .collect()
    }

    pub fn total_minutes_for_job(&self, job_id: &str) -> i64 {
        self.by_job_id(job_id).iter().map(|t| t.duration).sum()
    }

    pub fn save(&self, entry: TimeEntry) -> Result<TimeEntry> {
        if entry.job_id.trim().is_empty() {
            return Err(Error::validation("time entry needs a job"));
        }
        if entry.duration < 0 {
            return Err(Error::validation("duration cannot be negative"));
        }
        upsert(self.storage, entry)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        remove::<TimeEntry>(self.storage, id)
    }
}
