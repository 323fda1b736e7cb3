use crate::error::{Error, Result};
use crate::models::{Client, Communication, now};
use crate::storage::{Collection, Storage};

use super::{all, find, remove, upsert};

pub struct CommunicationRepo<'a> {
    storage: &'a Storage,
}

impl<'a> CommunicationRepo<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn get_all(&self) -> Vec<Communication> {
        all(self.storage)
    }

    pub fn get(&self, id: &str) -> Option<Communication> {
        find(self.storage, id)
    }

    /// Newest first.
    pub fn by_client_id(&self, client_id: &str) -> Vec<Communication> {
        let mut comms: Vec<_> = self
            .get_all()
            .into_iter()
            .filter(|c| c.client_id == client_id)
            .collect();
        comms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comms
    }

    pub fn pending(&self) -> Vec<Communication> {
        self.get_all()
            .into_iter()
            .filter(|c| !c.is_completed)
            .collect()
    }

    /// Insert or replace. A completed communication also becomes the client's
    /// last contact date.
    pub fn save(&self, communication: Communication) -> Result<Communication> {
        if communication.client_id.trim().is_empty() {
            return Err(Error::validation("communication needs a client"));
        }
        if communication.content.trim().is_empty() {
            return Err(Error::validation("communication content is required"));
        }

        let saved = upsert(self.storage, communication)?;

        if let (true, Some(date)) = (saved.is_completed, saved.completed_date.as_ref()) {
            let found = self.storage.update(Collection::Clients, |clients: &mut Vec<Client>| {
                match clients.iter_mut().find(|c| c.id == saved.client_id) {
                    Some(client) => {
                        client.last_contact_date = Some(date.clone());
                        client.updated_at = now();
                        true
                    }
                    None => false,
                }
            })?;
            if !found {
                log::debug!("Communication {} refers to unknown client {}", saved.id, saved.client_id);
            }
        }

        Ok(saved)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        remove::<Communication>(self.storage, id)
    }
}
