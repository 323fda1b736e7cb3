//! Keeps client records and their cached aggregates in step with the jobs.
//!
//! A job belongs to a client through `clientId`. Jobs saved before they were
//! linked fall back to an exact, case-sensitive `clientName` match.

use strsim::jaro_winkler;

use crate::error::Result;
use crate::models::{Client, Job, now};
use crate::storage::{Collection, Storage};

/// Names at least this similar (but not equal) get a warning on client creation.
const SIMILAR_NAME_THRESHOLD: f64 = 0.92;

impl Job {
    /// Whether this job counts towards the given client.
    pub fn belongs_to(&self, client_id: &str, client_name: &str) -> bool {
        match self.client_id.as_deref() {
            Some(id) => id == client_id,
            None => self.client_name == client_name,
        }
    }
}

/// Aggregates over one client's jobs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JobTotals {
    pub total_jobs: u32,
    pub total_revenue: f64,
    pub average_job_value: f64,
}

impl JobTotals {
    pub fn over<'j>(jobs: impl IntoIterator<Item = &'j Job>) -> Self {
        let (count, revenue) = jobs.into_iter().fold((0u32, 0.0f64), |(n, sum), job| {
            let cost = if job.total_cost.is_finite() { job.total_cost } else { 0.0 };
            (n + 1, sum + cost)
        });
        Self {
            total_jobs: count,
            total_revenue: revenue,
            average_job_value: if count > 0 { revenue / count as f64 } else { 0.0 },
        }
    }
}

pub struct ClientSync<'a> {
    storage: &'a Storage,
}

impl<'a> ClientSync<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Return the client with exactly this name, creating it if needed.
    pub fn ensure_client(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        address: Option<&str>,
    ) -> Result<Client> {
        let existing: Vec<Client> = self.storage.load(Collection::Clients);
        if let Some(client) = existing.into_iter().find(|c| c.name == name) {
            return Ok(client);
        }

        // Check again under the collection lock before inserting.
        self.storage.update(Collection::Clients, |clients: &mut Vec<Client>| {
            if let Some(client) = clients.iter().find(|c| c.name == name) {
                return client.clone();
            }

            if let Some(near) = clients
                .iter()
                .find(|c| jaro_winkler(&c.name, name) >= SIMILAR_NAME_THRESHOLD)
            {
                log::warn!(
                    "Creating client '{}' although '{}' already exists; jobs are matched by exact name",
                    name,
                    near.name
                );
            }

            let mut client = Client::new(name);
            client.phone = phone.map(str::to_string);
            client.email = email.map(str::to_string);
            client.address = address.map(str::to_string);
            clients.push(client.clone());
            log::debug!("Created client {} for '{}'", client.id, name);
            client
        })
    }

    /// Recount a client's jobs and store the totals. `None` if the client is gone.
    pub fn recompute_stats(&self, client_id: &str) -> Result<Option<Client>> {
        let jobs: Vec<Job> = self.storage.load(Collection::Jobs);

        self.storage.update(Collection::Clients, |clients: &mut Vec<Client>| {
            let client = clients.iter_mut().find(|c| c.id == client_id)?;
            let totals = JobTotals::over(jobs.iter().filter(|j| j.belongs_to(&client.id, &client.name)));

            client.total_jobs = totals.total_jobs;
            client.total_revenue = totals.total_revenue;
            client.average_job_value = totals.average_job_value;
            client.updated_at = now();
            Some(client.clone())
        })
    }

    /// Bring back a client for every job whose client is missing, then
    /// recompute every client. Returns how many clients were refreshed.
    pub fn recompute_all(&self) -> Result<usize> {
        let clients: Vec<Client> = self.storage.load(Collection::Clients);
        let orphans: Vec<Job> = self
            .storage
            .load::<Job>(Collection::Jobs)
            .into_iter()
            .filter(|j| !j.client_name.trim().is_empty())
            .filter(|j| !clients.iter().any(|c| j.belongs_to(&c.id, &c.name)))
            .collect();
        for job in &orphans {
            let client = self.sync_job(job)?;
            log::debug!("Restored client {} for job {}", client.id, job.id);
        }

        let jobs: Vec<Job> = self.storage.load(Collection::Jobs);
        self.storage.update(Collection::Clients, |clients: &mut Vec<Client>| {
            let ts = now();
            for client in clients.iter_mut() {
                let totals = JobTotals::over(jobs.iter().filter(|j| j.belongs_to(&client.id, &client.name)));
                client.total_jobs = totals.total_jobs;
                client.total_revenue = totals.total_revenue;
                client.average_job_value = totals.average_job_value;
                client.updated_at = ts.clone();
            }
            clients.len()
        })
    }

    /// Make sure a saved job has a client, link it by id and refresh the
    /// client's totals (and the previous client's, if the job moved).
    pub fn sync_job(&self, job: &Job) -> Result<Client> {
        let linked = job.client_id.as_deref().and_then(|id| {
            let clients: Vec<Client> = self.storage.load(Collection::Clients);
            clients
                .into_iter()
                .find(|c| c.id == id && c.name == job.client_name)
        });

        let client = match linked {
            Some(client) => client,
            None => self.ensure_client(
                &job.client_name,
                job.client_phone.as_deref(),
                job.client_email.as_deref(),
                Some(job.address.as_str()).filter(|a| !a.is_empty()),
            )?,
        };

        if job.client_id.as_deref() != Some(client.id.as_str()) {
            self.storage.update(Collection::Jobs, |jobs: &mut Vec<Job>| {
                if let Some(stored) = jobs.iter_mut().find(|j| j.id == job.id) {
                    stored.client_id = Some(client.id.clone());
                }
            })?;
            if let Some(previous) = job.client_id.as_deref() {
                self.recompute_stats(previous)?;
            }
        }

        Ok(self.recompute_stats(&client.id)?.unwrap_or(client))
    }
}
