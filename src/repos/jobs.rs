use crate::error::{Error, Result};
use crate::models::{Job, JobStatus, Photo, TimeEntry, now};
use crate::storage::Storage;
use crate::sync::ClientSync;

use super::{ClientRepo, all, find, remove, remove_where, upsert};

pub struct JobRepo<'a> {
    storage: &'a Storage,
}

impl<'a> JobRepo<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn get_all(&self) -> Vec<Job> {
        all(self.storage)
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        find(self.storage, id)
    }

    pub fn by_status(&self, status: JobStatus) -> Vec<Job> {
        self.get_all()
            .into_iter()
            .filter(|j| j.status == status)
            .collect()
    }

    /// Case-insensitive match on title, client name and address.
    pub fn search(&self, text: &str) -> Vec<Job> {
        let needle = text.to_lowercase();
        self.get_all()
            .into_iter()
            .filter(|j| {
                j.title.to_lowercase().contains(&needle)
                    || j.client_name.to_lowercase().contains(&needle)
                    || j.address.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Most recently updated first.
    pub fn recent(&self, limit: usize) -> Vec<Job> {
        let mut jobs = self.get_all();
        jobs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        jobs.truncate(limit);
        jobs
    }

    /// Insert or replace a job, then bring its client record up to date.
    ///
    /// The client sync is best effort: if it fails the job is still saved and
    /// the failure is only logged.
    pub fn save(&self, mut job: Job) -> Result<Job> {
        validate(&job)?;

        if job.status == JobStatus::Completed && job.completed_at.is_none() {
            // Keep the first completion time if an earlier save already set it.
            job.completed_at = self
                .get(&job.id)
                .and_then(|prev| prev.completed_at)
                .or_else(|| Some(now()));
        }

        let mut saved = upsert(self.storage, job)?;
        log::debug!("Saved job {} ({})", saved.id, saved.title);

        if !saved.client_name.trim().is_empty() {
            match ClientSync::new(self.storage).sync_job(&saved) {
                Ok(client) => saved.client_id = Some(client.id),
                Err(e) => log::warn!("Client sync failed for job {}: {}", saved.id, e),
            }
        }

        Ok(saved)
    }

    /// Change only the status of an existing job.
    pub fn set_status(&self, id: &str, status: JobStatus) -> Result<Job> {
        let mut job = self.get(id).ok_or_else(|| Error::not_found("job", id))?;
        job.status = status;
        self.save(job)
    }

    /// Delete a job together with its time entries and photos.
    pub fn delete(&self, id: &str) -> Result<bool> {
        // Unlinked jobs still count towards the client with their name.
        let client_id = self.get(id).and_then(|j| {
            j.client_id
                .or_else(|| ClientRepo::new(self.storage).by_name(&j.client_name).map(|c| c.id))
        });
        let removed = remove::<Job>(self.storage, id)?;

        let entries = remove_where::<TimeEntry, _>(self.storage, |t| t.job_id == id)?;
        let photos = remove_where::<Photo, _>(self.storage, |p| p.job_id == id)?;
        log::debug!(
            "Deleted job {}: {} time entries, {} photos",
            id,
            entries,
            photos
        );

        if let Some(client_id) = client_id {
            if let Err(e) = ClientSync::new(self.storage).recompute_stats(&client_id) {
                log::warn!("Failed to refresh client {} after job delete: {}", client_id, e);
            }
        }

        Ok(removed)
    }
}

fn validate(job: &Job) -> Result<()> {
    if job.id.trim().is_empty() {
        return Err(Error::validation("job id is required"));
    }
    if job.title.trim().is_empty() {
        return Err(Error::validation("job title is required"));
    }
    if job.client_name.trim().is_empty() {
        return Err(Error::validation("client name is required"));
    }
    if !job.estimated_hours.is_finite() || job.estimated_hours < 0.0 {
        return Err(Error::validation("estimated hours must be zero or more"));
    }
    if !job.hourly_rate.is_finite() || job.hourly_rate < 0.0 {
        return Err(Error::validation("hourly rate must be zero or more"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhotoType;
    use crate::repos::Store;
    use crate::storage::{Collection, MemoryStore};
    use std::sync::Arc;

    fn job(title: &str, client: &str, hours: f64, rate: f64) -> Job {
        Job::new(title, client, "ul. Długa 1", hours, rate)
    }

    #[test]
    fn test_save_then_get_all_has_one_copy() {
        let store = Store::in_memory();
        let j = job("Malowanie", "Anna Nowak", 10.0, 60.0);
        let before = j.updated_at.clone();

        store.jobs().save(j.clone()).unwrap();
        store.jobs().save(j.clone()).unwrap();

        let jobs = store.jobs().get_all();
        let matching: Vec<_> = jobs.iter().filter(|x| x.id == j.id).collect();
        assert_eq!(matching.len(), 1);
        let stored = matching[0];
        assert_eq!(stored.title, j.title);
        assert_eq!(stored.total_cost, 600.0);
        assert!(stored.updated_at >= before);
    }

    #[test]
    fn test_empty_title_is_rejected_without_write() {
        let store = Store::in_memory();
        let err = store.jobs().save(job("  ", "Anna", 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.jobs().get_all().is_empty());
        assert!(store.clients().get_all().is_empty());
    }

    #[test]
    fn test_negative_rate_is_rejected() {
        let store = Store::in_memory();
        assert!(store.jobs().save(job("Tiles", "Anna", 1.0, -5.0)).is_err());
    }

    #[test]
    fn test_completed_at_is_set_once() {
        let store = Store::in_memory();
        let j = store.jobs().save(job("Gutter", "Piotr", 2.0, 90.0)).unwrap();
        assert!(j.completed_at.is_none());

        let done = store.jobs().set_status(&j.id, JobStatus::Completed).unwrap();
        let first = done.completed_at.clone().unwrap();

        let mut edited = store.jobs().get(&j.id).unwrap();
        edited.description = "cleaned downpipe too".into();
        let again = store.jobs().save(edited).unwrap();
        assert_eq!(again.completed_at.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_save_creates_client_with_stats() {
        let store = Store::in_memory();
        let saved = store.jobs().save(job("Kitchen", "Jan", 40.0, 80.0)).unwrap();

        let client = store.clients().by_name("Jan").unwrap();
        assert_eq!(saved.client_id.as_deref(), Some(client.id.as_str()));
        assert_eq!(client.total_jobs, 1);
        assert_eq!(client.total_revenue, 3200.0);
        assert_eq!(client.rating, 5);
    }

    #[test]
    fn test_delete_cascades_only_to_own_children() {
        let store = Store::in_memory();
        let a = store.jobs().save(job("A", "Jan", 1.0, 10.0)).unwrap();
        let b = store.jobs().save(job("B", "Jan", 1.0, 10.0)).unwrap();

        store.time_entries().save(TimeEntry::finished(&a.id, 30, None)).unwrap();
        store.time_entries().save(TimeEntry::finished(&b.id, 45, None)).unwrap();
        store.photos().save(Photo::new(&a.id, PhotoType::Before, "a.jpg")).unwrap();
        store.photos().save(Photo::new(&b.id, PhotoType::After, "b.jpg")).unwrap();

        assert!(store.jobs().delete(&a.id).unwrap());

        assert!(store.jobs().get(&a.id).is_none());
        assert!(store.time_entries().by_job_id(&a.id).is_empty());
        assert!(store.photos().by_job_id(&a.id).is_empty());
        assert_eq!(store.time_entries().by_job_id(&b.id).len(), 1);
        assert_eq!(store.photos().by_job_id(&b.id).len(), 1);

        let client = store.clients().by_name("Jan").unwrap();
        assert_eq!(client.total_jobs, 1);
    }

    #[test]
    fn test_search_and_recent() {
        let store = Store::in_memory();
        store.jobs().save(job("Bathroom tiling", "Jan", 1.0, 1.0)).unwrap();
        store.jobs().save(job("Wiring", "Piotr", 1.0, 1.0)).unwrap();

        assert_eq!(store.jobs().search("TIL").len(), 1);
        assert_eq!(store.jobs().search("piotr").len(), 1);
        assert_eq!(store.jobs().recent(1).len(), 1);
    }

    #[test]
    fn test_delete_unlinked_job_refreshes_client_by_name() {
        let store = Store::in_memory();
        let legacy = vec![job("A", "Ewa", 1.0, 100.0), job("B", "Ewa", 2.0, 100.0)];
        store.storage().store(Collection::Jobs, &legacy).unwrap();
        let ewa = store.sync().ensure_client("Ewa", None, None, None).unwrap();
        assert_eq!(store.sync().recompute_stats(&ewa.id).unwrap().unwrap().total_jobs, 2);

        assert!(store.jobs().delete(&legacy[0].id).unwrap());

        let ewa = store.clients().get(&ewa.id).unwrap();
        assert_eq!(ewa.total_jobs, 1);
        assert_eq!(ewa.total_revenue, 200.0);
    }

    #[test]
    fn test_write_failure_reaches_caller() {
        let store = Store::new(Arc::new(MemoryStore::with_quota(64)));
        let err = store
            .jobs()
            .save(job("Kitchen", "Jan", 40.0, 80.0))
            .unwrap_err();
        assert!(err.is_write_failure());
        assert!(store.jobs().get_all().is_empty());
        assert!(store.clients().get_all().is_empty());
    }
}
