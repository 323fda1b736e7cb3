use crate::error::{Error, Result};
use crate::models::{Client, Communication, Job};
use crate::storage::{Collection, Storage};
use crate::sync::ClientSync;

use super::{all, find, remove, remove_where, upsert};

pub struct ClientRepo<'a> {
    storage: &'a Storage,
}

impl<'a> ClientRepo<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn get_all(&self) -> Vec<Client> {
        all(self.storage)
    }

    pub fn get(&self, id: &str) -> Option<Client> {
        find(self.storage, id)
    }

    /// Exact, case-sensitive name lookup.
    pub fn by_name(&self, name: &str) -> Option<Client> {
        self.get_all().into_iter().find(|c| c.name == name)
    }

    /// Case-insensitive match on name, phone and email.
    pub fn search(&self, text: &str) -> Vec<Client> {
        let needle = text.to_lowercase();
        self.get_all()
            .into_iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.phone.as_deref().is_some_and(|p| p.contains(&needle))
                    || c.email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Insert or replace a client.
    ///
    /// Names are unique. Renaming a client rewrites `clientName` on its
    /// linked jobs so the denormalized name never drifts from the client
    /// record. The stored totals are always recounted from the jobs, so a
    /// stale copy of the client cannot overwrite them.
    pub fn save(&self, client: Client) -> Result<Client> {
        let existing = self.get_all();
        validate(&client, &existing)?;

        let previous_name = existing
            .into_iter()
            .find(|c| c.id == client.id)
            .map(|c| c.name);
        let saved = upsert(self.storage, client)?;

        if let Some(old) = previous_name.filter(|old| *old != saved.name) {
            let renamed = self.storage.update(Collection::Jobs, |jobs: &mut Vec<Job>| {
                let mut n = 0;
                for job in jobs.iter_mut().filter(|j| j.belongs_to(&saved.id, &old)) {
                    job.client_id = Some(saved.id.clone());
                    job.client_name = saved.name.clone();
                    n += 1;
                }
                n
            })?;
            log::debug!(
                "Renamed client {} from '{}' to '{}' on {} jobs",
                saved.id,
                old,
                saved.name,
                renamed
            );
        }

        Ok(ClientSync::new(self.storage)
            .recompute_stats(&saved.id)?
            .unwrap_or(saved))
    }

    pub fn set_rating(&self, id: &str, rating: u8) -> Result<Client> {
        let mut client = self.get(id).ok_or_else(|| Error::not_found("client", id))?;
        client.rating = rating;
        self.save(client)
    }

    /// Delete a client and its communications. Jobs are left as they are.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = remove::<Client>(self.storage, id)?;
        let comms = remove_where::<Communication, _>(self.storage, |c| c.client_id == id)?;
        log::debug!("Deleted client {}: {} communications", id, comms);
        Ok(removed)
    }
}

fn validate(client: &Client, existing: &[Client]) -> Result<()> {
    if client.name.trim().is_empty() {
        return Err(Error::validation("client name is required"));
    }
    if existing
        .iter()
        .any(|c| c.name == client.name && c.id != client.id)
    {
        return Err(Error::validation(format!(
            "a client named '{}' already exists",
            client.name
        )));
    }
    if !(1..=5).contains(&client.rating) {
        return Err(Error::validation("rating must be between 1 and 5"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommunicationType;
    use crate::repos::Store;

    #[test]
    fn test_delete_cascades_to_communications_only() {
        let store = Store::in_memory();
        let job = store
            .jobs()
            .save(Job::new("Roof", "Ewa", "ul. Polna 2", 5.0, 100.0))
            .unwrap();
        let ewa = store.clients().by_name("Ewa").unwrap();
        let other = store.clients().save(Client::new("Adam")).unwrap();

        store
            .communications()
            .save(Communication::new(&ewa.id, CommunicationType::Phone, "quote"))
            .unwrap();
        store
            .communications()
            .save(Communication::new(&other.id, CommunicationType::Sms, "hi"))
            .unwrap();

        assert!(store.clients().delete(&ewa.id).unwrap());

        assert!(store.clients().get(&ewa.id).is_none());
        assert!(store.communications().by_client_id(&ewa.id).is_empty());
        assert_eq!(store.communications().by_client_id(&other.id).len(), 1);
        // Jobs referencing the deleted client are untouched.
        let kept = store.jobs().get(&job.id).unwrap();
        assert_eq!(kept.client_name, "Ewa");
    }

    #[test]
    fn test_rating_out_of_range() {
        let store = Store::in_memory();
        let c = store.clients().save(Client::new("Adam")).unwrap();
        assert!(store.clients().set_rating(&c.id, 0).is_err());
        assert!(store.clients().set_rating(&c.id, 6).is_err());
        assert_eq!(store.clients().set_rating(&c.id, 3).unwrap().rating, 3);
    }

    #[test]
    fn test_rename_keeps_job_stats() {
        let store = Store::in_memory();
        store.jobs().save(Job::new("A", "Jan K", "x", 1.0, 100.0)).unwrap();
        store.jobs().save(Job::new("B", "Jan K", "x", 2.0, 100.0)).unwrap();

        let mut jan = store.clients().by_name("Jan K").unwrap();
        jan.name = "Jan Kowalski".into();
        let renamed = store.clients().save(jan).unwrap();

        assert_eq!(renamed.total_jobs, 2);
        assert_eq!(renamed.total_revenue, 300.0);
        assert!(store.jobs().get_all().iter().all(|j| j.client_name == "Jan Kowalski"));

        // A later job save must not resurrect the old name as a new client.
        let mut job = store.jobs().get_all().remove(0);
        job.description = "extra".into();
        store.jobs().save(job).unwrap();
        assert_eq!(store.clients().get_all().len(), 1);
    }

    #[test]
    fn test_search_matches_email() {
        let store = Store::in_memory();
        let mut c = Client::new("Anna Nowak");
        c.email = Some("Anna@Example.com".into());
        store.clients().save(c).unwrap();
        assert_eq!(store.clients().search("example").len(), 1);
        assert!(store.clients().search("zzz").is_empty());
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let store = Store::in_memory();
        store.clients().save(Client::new("Jan")).unwrap();
        let err = store.clients().save(Client::new("Jan")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.clients().get_all().len(), 1);

        // Renaming onto a taken name fails too and leaves the record as it was.
        let mut adam = store.clients().save(Client::new("Adam")).unwrap();
        adam.name = "Jan".into();
        assert!(matches!(store.clients().save(adam.clone()), Err(Error::Validation(_))));
        assert_eq!(store.clients().get(&adam.id).unwrap().name, "Adam");

        // Re-saving a client under its own name is fine.
        let jan = store.clients().by_name("Jan").unwrap();
        assert!(store.clients().save(jan).is_ok());
    }

    #[test]
    fn test_stale_copy_keeps_current_totals() {
        let store = Store::in_memory();
        store.jobs().save(Job::new("Roof", "Ewa", "", 1.0, 100.0)).unwrap();
        let stale = store.clients().by_name("Ewa").unwrap();
        store.jobs().save(Job::new("Gate", "Ewa", "", 2.0, 100.0)).unwrap();

        let mut edited = stale;
        edited.notes = Some("prefers mornings".into());
        let saved = store.clients().save(edited).unwrap();

        assert_eq!(saved.total_jobs, 2);
        assert_eq!(saved.total_revenue, 300.0);
        let stored = store.clients().by_name("Ewa").unwrap();
        assert_eq!(stored.total_jobs, 2);
        assert_eq!(stored.notes.as_deref(), Some("prefers mornings"));
    }
}
