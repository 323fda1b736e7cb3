//! Demo records for a fresh install. Each seeder only runs against an empty
//! collection, so calling it on every start is safe.

use chrono::{Duration, Utc};

use crate::error::Result;
use crate::models::{CommunicationType, Job, JobStatus, MessageTemplate, TimeEntry, iso};
use crate::repos::Store;

fn ago(d: Duration) -> String {
    iso(Utc::now() - d)
}

fn tags(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

fn sample_jobs() -> Vec<Job> {
    let mut bathroom = Job::new("Remont łazienki", "Jan Kowalski", "ul. Przykładowa 15, Warszawa", 40.0, 80.0);
    bathroom.id = "1".into();
    bathroom.description = "Kompleksowy remont łazienki - wymiana glazury, armatura, sanitariaty".into();
    bathroom.status = JobStatus::InProgress;
    bathroom.client_phone = Some("+48 123 456 789".into());
    bathroom.client_email = Some("jan@example.com".into());
    bathroom.created_at = ago(Duration::days(5));
    bathroom.category = Some("Hydraulika".into());
    bathroom.tags = tags(&["remont", "łazienka", "glazura"]);

    let mut painting = Job::new("Malowanie mieszkania", "Anna Nowak", "ul. Testowa 8/12, Kraków", 24.0, 60.0);
    painting.id = "2".into();
    painting.description = "Malowanie wszystkich pomieszczeń w mieszkaniu 3-pokojowym".into();
    painting.status = JobStatus::Completed;
    painting.client_phone = Some("+48 987 654 321".into());
    painting.created_at = ago(Duration::days(10));
    painting.updated_at = ago(Duration::days(2));
    painting.completed_at = Some(painting.updated_at.clone());
    painting.category = Some("Malarstwo".into());
    painting.tags = tags(&["malowanie", "mieszkanie"]);

    let mut wiring = Job::new("Naprawa instalacji elektrycznej", "Piotr Wiśniewski", "ul. Elektryczna 3, Gdańsk", 8.0, 100.0);
    wiring.id = "3".into();
    wiring.description = "Wymiana uszkodzonej instalacji elektrycznej w kuchni".into();
    wiring.client_phone = Some("+48 555 123 456".into());
    wiring.category = Some("Elektryka".into());
    wiring.tags = tags(&["naprawa", "instalacja", "kuchnia"]);

    vec![bathroom, painting, wiring]
}

fn sample_time_entries() -> Vec<TimeEntry> {
    let three_days = Utc::now() - Duration::days(3);
    vec![
        TimeEntry {
            id: "1".into(),
            job_id: "1".into(),
            start_time: ago(Duration::hours(4)),
            end_time: Some(ago(Duration::hours(2))),
            duration: 120,
            description: Some("Demontaż starej glazury".into()),
            created_at: ago(Duration::hours(2)),
        },
        TimeEntry {
            id: "2".into(),
            job_id: "2".into(),
            start_time: iso(three_days),
            end_time: Some(iso(three_days + Duration::hours(8))),
            duration: 480,
            description: Some("Malowanie pokoju dziennego".into()),
            created_at: iso(three_days),
        },
    ]
}

fn sample_templates() -> Vec<MessageTemplate> {
    let mut confirm = MessageTemplate::new(
        "Potwierdzenie zlecenia",
        CommunicationType::Email,
        "Potwierdzenia",
        "Dzień dobry {clientName},\n\nDziękuję za zlecenie \"{jobTitle}\". Potwierdzam przyjęcie zlecenia na {scheduledDate}.\n\nSerdecznie pozdrawiam",
    );
    confirm.id = "1".into();
    confirm.subject = Some("Potwierdzenie zlecenia - {jobTitle}".into());

    let mut reminder = MessageTemplate::new(
        "Przypomnienie o terminie",
        CommunicationType::Sms,
        "Przypomnienia",
        "Dzień dobry {clientName}, przypominam o jutrzejszym terminie realizacji zlecenia \"{jobTitle}\". Do zobaczenia!",
    );
    reminder.id = "2".into();

    let mut finished = MessageTemplate::new(
        "Zakończenie prac",
        CommunicationType::Email,
        "Zakończenie",
        "Dzień dobry {clientName},\n\nInformuję o zakończeniu prac \"{jobTitle}\". Łączny koszt wynosi {totalCost} zł.\n\nDziękuję za zaufanie!",
    );
    finished.id = "3".into();
    finished.subject = Some("Zakończenie prac - {jobTitle}".into());

    vec![confirm, reminder, finished]
}

/// Insert the demo jobs and time entries if there are no jobs yet.
/// Returns whether anything was seeded.
pub fn seed_sample_data(store: &Store) -> Result<bool> {
    if !store.jobs().get_all().is_empty() {
        return Ok(false);
    }

    let jobs = sample_jobs();
    let count = jobs.len();
    for job in jobs {
        store.jobs().save(job)?;
    }
    for entry in sample_time_entries() {
        store.time_entries().save(entry)?;
    }
    log::info!("Seeded {} sample jobs", count);
    Ok(true)
}

/// Insert the demo message templates if there are none yet.
pub fn seed_sample_templates(store: &Store) -> Result<bool> {
    if !store.templates().get_all().is_empty() {
        return Ok(false);
    }

    for template in sample_templates() {
        store.templates().save(template)?;
    }
    log::info!("Seeded sample message templates");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeding_twice_gives_one_copy() {
        let store = Store::in_memory();
        assert!(seed_sample_data(&store).unwrap());
        assert!(!seed_sample_data(&store).unwrap());

        assert_eq!(store.jobs().get_all().len(), 3);
        assert_eq!(store.time_entries().get_all().len(), 2);
        assert_eq!(store.clients().get_all().len(), 3);

        let jan = store.clients().by_name("Jan Kowalski").unwrap();
        assert_eq!(jan.total_revenue, 3200.0);
        assert_eq!(jan.email.as_deref(), Some("jan@example.com"));
    }

    #[test]
    fn test_no_seed_when_jobs_exist() {
        let store = Store::in_memory();
        store
            .jobs()
            .save(Job::new("Own job", "Someone", "", 1.0, 1.0))
            .unwrap();
        assert!(!seed_sample_data(&store).unwrap());
        assert_eq!(store.jobs().get_all().len(), 1);
        assert!(store.time_entries().get_all().is_empty());
    }

    #[test]
    fn test_template_seeding_is_idempotent() {
        let store = Store::in_memory();
        seed_sample_templates(&store).unwrap();
        seed_sample_templates(&store).unwrap();

        let templates = store.templates().get_all();
        assert_eq!(templates.len(), 3);
        let confirm = store.templates().get("1").unwrap();
        assert_eq!(confirm.variables, ["clientName", "jobTitle", "scheduledDate"]);
    }
}
