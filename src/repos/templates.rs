use crate::error::{Error, Result};
use crate::models::{CommunicationType, MessageTemplate};
use crate::placeholders::extract_variables;
use crate::storage::Storage;

use super::{all, find, remove, upsert};

pub struct TemplateRepo<'a> {
    storage: &'a Storage,
}

impl<'a> TemplateRepo<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn get_all(&self) -> Vec<MessageTemplate> {
        all(self.storage)
    }

    pub fn get(&self, id: &str) -> Option<MessageTemplate> {
        find(self.storage, id)
    }

    pub fn by_category(&self, category: &str) -> Vec<MessageTemplate> {
        self.get_all()
            .into_iter()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn by_type(&self, kind: CommunicationType) -> Vec<MessageTemplate> {
        self.get_all()
            .into_iter()
            .filter(|t| t.kind == kind)
            .collect()
    }

    /// Insert or replace. `variables` is always rebuilt from the content.
    pub fn save(&self, mut template: MessageTemplate) -> Result<MessageTemplate> {
        if template.name.trim().is_empty() {
            return Err(Error::validation("template name is required"));
        }
        if template.content.trim().is_empty() {
            return Err(Error::validation("template content is required"));
        }

        template.variables = extract_variables(&template.content);

        upsert(self.storage, template)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        remove::<MessageTemplate>(self.storage, id)
    }
}
