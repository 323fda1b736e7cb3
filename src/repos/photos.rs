use crate::error::{Error, Result};
use crate::models::{Photo, PhotoType};
use crate::storage::Storage;

use super::{all, find, remove, upsert};

pub struct PhotoRepo<'a> {
    storage: &'a Storage,
}

impl<'a> PhotoRepo<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn get_all(&self) -> Vec<Photo> {
        all(self.storage)
    }

    pub fn get(&self, id: &str) -> Option<Photo> {
        find(self.storage, id)
    }

    pub fn by_job_id(&self, job_id: &str) -> Vec<Photo> {
        self.get_all()
            .into_iter()
            .filter(|p| p.job_id == job_id)
            .collect()
    }

    pub fn by_job_and_type(&self, job_id: &str, kind: PhotoType) -> Vec<Photo> {
        self.by_job_id(job_id)
            .into_iter()
            .filter(|p| p.kind == kind)
            .collect()
    }

    pub fn save(&self, photo: Photo) -> Result<Photo> {
        if photo.job_id.trim().is_empty() {
            return Err(Error::validation("photo needs a job"));
        }
        if photo.url.trim().is_empty() {
            return Err(Error::validation("photo url is required"));
        }
        upsert(self.storage, photo)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        remove::<Photo>(self.storage, id)
    }
}
