use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use fachowiec::config::Config;
use fachowiec::db::Database;
use fachowiec::models::{
    Client, Communication, CommunicationType, Job, JobStatus, Photo, PhotoType, TimeEntry,
};
use fachowiec::placeholders::render;
use fachowiec::seed::{seed_sample_data, seed_sample_templates};
use fachowiec::stats::{self, DurationSource};
use fachowiec::Store;

#[derive(Parser)]
#[command(name = "fachowiec")]
#[command(about = "Jobs, clients, time and photos for independent tradespeople")]
struct Cli {
    /// Database file (defaults to $FACHOWIEC_DB, then the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and load sample data
    Init {
        /// Skip the sample jobs and templates
        #[arg(long)]
        no_samples: bool,
    },

    /// Manage jobs
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Track time spent on jobs
    Time {
        #[command(subcommand)]
        command: TimeCommands,
    },

    /// Photo documentation
    Photos {
        #[command(subcommand)]
        command: PhotoCommands,
    },

    /// Manage clients
    Clients {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Client communication log
    Comms {
        #[command(subcommand)]
        command: CommCommands,
    },

    /// Message templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Show dashboard numbers
    Stats {
        /// Where average job hours come from
        #[arg(long, value_enum, default_value = "time-entries")]
        durations: Durations,
    },

    /// List jobs whose stored total no longer matches hours x rate
    Drift {
        #[arg(long, default_value = "0.01")]
        tolerance: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Durations {
    TimeEntries,
    Estimates,
}

#[derive(Subcommand)]
enum JobCommands {
    /// List jobs
    List {
        /// Filter by status (pending, in-progress, completed, cancelled)
        #[arg(short, long)]
        status: Option<JobStatus>,

        /// Match title, client or address
        #[arg(long)]
        search: Option<String>,
    },

    /// Show job details
    Show { id: String },

    /// Add a job
    Add {
        title: String,
        /// Client name
        client: String,
        #[arg(short, long, default_value = "")]
        address: String,
        #[arg(long, default_value = "0")]
        hours: f64,
        #[arg(long, default_value = "0")]
        rate: f64,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Scheduled date (RFC 3339)
        #[arg(long)]
        scheduled: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Change job status
    Status { id: String, status: JobStatus },

    /// Delete a job with its time entries and photos
    Delete { id: String },
}

#[derive(Subcommand)]
enum TimeCommands {
    /// Log finished work on a job
    Log {
        job_id: String,
        minutes: i64,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List time entries
    List {
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Delete a time entry
    Delete { id: String },
}

#[derive(Subcommand)]
enum PhotoCommands {
    /// Attach a photo to a job
    Add {
        job_id: String,
        /// before, progress, after, issue, solution
        kind: PhotoType,
        url: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List a job's photos
    List { job_id: String },

    /// Delete a photo
    Delete { id: String },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// List clients
    List {
        #[arg(long)]
        search: Option<String>,
    },

    /// Show client details
    Show {
        /// Client name or ID
        name: String,
    },

    /// Set client rating (1-5)
    Rate { id: String, rating: u8 },

    /// Delete a client and its communications
    Delete { id: String },

    /// Recompute job totals for every client
    Resync,
}

#[derive(Subcommand)]
enum CommCommands {
    /// Record a communication
    Log {
        client_id: String,
        /// phone, email, sms, meeting, other
        kind: CommunicationType,
        content: String,
        #[arg(long)]
        subject: Option<String>,
        /// Mark as already done
        #[arg(long)]
        done: bool,
    },

    /// List a client's communications
    List { client_id: String },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List templates
    List,

    /// Show a template
    Show { id: String },

    /// Fill a template's placeholders
    Render {
        id: String,
        /// key=value pairs
        values: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.db.clone(), cli.verbose);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let db = Database::open_at(&config.db_path)?;

    if let Commands::Init { no_samples } = cli.command {
        db.init()?;
        let path = db.path().clone();
        let store = Store::new(Arc::new(db));
        if !no_samples {
            let jobs = seed_sample_data(&store).context("Failed to seed sample jobs")?;
            let templates = seed_sample_templates(&store).context("Failed to seed templates")?;
            if jobs || templates {
                println!("Loaded sample data.");
            }
        }
        println!("Database initialized at {}", path.display());
        return Ok(());
    }

    db.ensure_initialized()?;
    let store = Store::new(Arc::new(db));

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Jobs { command } => run_jobs(&store, command)?,
        Commands::Time { command } => run_time(&store, command)?,
        Commands::Photos { command } => run_photos(&store, command)?,
        Commands::Clients { command } => run_clients(&store, command)?,
        Commands::Comms { command } => run_comms(&store, command)?,
        Commands::Templates { command } => run_templates(&store, command)?,

        Commands::Stats { durations } => {
            let source = match durations {
                Durations::TimeEntries => DurationSource::TimeEntries,
                Durations::Estimates => DurationSource::JobEstimates,
            };
            let jobs = store.jobs().get_all();
            let entries = store.time_entries().get_all();
            let kpis = stats::dashboard_kpis(&jobs, &entries, source);
            let overview =
                stats::client_overview(&store.clients().get_all(), &store.communications().get_all());

            println!("Completed jobs:    {}", kpis.completed_jobs);
            println!("Active jobs:       {}", kpis.active_jobs);
            println!("Revenue:           {:.2} zł", kpis.total_revenue);
            println!("Avg job hours:     {:.1}h", kpis.average_job_hours);
            println!("Clients:           {}", overview.total_clients);
            println!("Avg rating:        {:.1}", overview.average_rating);
            if !overview.top_clients.is_empty() {
                println!("\nTop clients:");
                for client in &overview.top_clients {
                    println!("  {:<30} {:>12.2} zł", truncate(&client.name, 28), client.total_revenue);
                }
            }

            println!("\nRecent jobs:");
            for job in store.jobs().recent(5) {
                println!("  {:<12} {}", job.status, truncate(&job.title, 50));
            }
        }

        Commands::Drift { tolerance } => {
            let drift = stats::cost_drift(&store.jobs().get_all(), tolerance);
            if drift.is_empty() {
                println!("All job totals match hours x rate.");
            } else {
                println!("{:<38} {:<25} {:>10} {:>10}", "ID", "TITLE", "STORED", "EXPECTED");
                println!("{}", "-".repeat(86));
                for d in drift {
                    println!(
                        "{:<38} {:<25} {:>10.2} {:>10.2}",
                        d.job_id,
                        truncate(&d.title, 23),
                        d.stored,
                        d.expected
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_jobs(store: &Store, command: JobCommands) -> Result<()> {
    match command {
        JobCommands::List { status, search } => {
            let mut jobs = match &search {
                Some(text) => store.jobs().search(text),
                None => store.jobs().get_all(),
            };
            if let Some(status) = status {
                jobs.retain(|j| j.status == status);
            }
            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!("{:<38} {:<12} {:<28} {:<20} {:>10}", "ID", "STATUS", "TITLE", "CLIENT", "COST");
                println!("{}", "-".repeat(112));
                for job in jobs {
                    println!(
                        "{:<38} {:<12} {:<28} {:<20} {:>10.2}",
                        job.id,
                        job.status,
                        truncate(&job.title, 26),
                        truncate(&job.client_name, 18),
                        job.total_cost
                    );
                }
            }
        }

        JobCommands::Show { id } => match store.jobs().get(&id) {
            Some(job) => print_job(store, &job),
            None => println!("Job {} not found.", id),
        },

        JobCommands::Add {
            title,
            client,
            address,
            hours,
            rate,
            phone,
            email,
            description,
            scheduled,
            category,
            tags,
        } => {
            let mut job = Job::new(&title, &client, &address, hours, rate);
            job.client_phone = phone;
            job.client_email = email;
            job.description = description.unwrap_or_default();
            job.scheduled_date = scheduled;
            job.category = category;
            if !tags.is_empty() {
                job.tags = Some(tags);
            }
            let job = store.jobs().save(job)?;
            println!("Added job {} ({:.2} zł)", job.id, job.total_cost);
        }

        JobCommands::Status { id, status } => {
            let job = store.jobs().set_status(&id, status)?;
            println!("Job {} is now {}.", job.id, job.status);
        }

        JobCommands::Delete { id } => {
            if store.jobs().delete(&id)? {
                println!("Deleted job {}.", id);
            } else {
                println!("Job {} not found.", id);
            }
        }
    }
    Ok(())
}

fn print_job(store: &Store, job: &Job) {
    println!("Job {}", job.id);
    println!("Title: {}", job.title);
    println!("Status: {}", job.status);
    println!("Client: {}", job.client_name);
    if let Some(phone) = &job.client_phone {
        println!("Phone: {}", phone);
    }
    if let Some(email) = &job.client_email {
        println!("Email: {}", email);
    }
    if !job.address.is_empty() {
        println!("Address: {}", job.address);
    }
    println!(
        "Estimate: {}h x {:.2} zł = {:.2} zł",
        job.estimated_hours, job.hourly_rate, job.total_cost
    );
    if let Some(date) = &job.scheduled_date {
        println!("Scheduled: {}", date);
    }
    if let Some(category) = &job.category {
        println!("Category: {}", category);
    }
    if let Some(tags) = job.tags.as_ref().filter(|t| !t.is_empty()) {
        println!("Tags: {}", tags.join(", "));
    }
    println!("Created: {}", job.created_at);
    if let Some(done) = &job.completed_at {
        println!("Completed: {}", done);
    }

    let minutes = store.time_entries().total_minutes_for_job(&job.id);
    println!("Logged time: {}", format_minutes(minutes));
    let photos = store.photos().by_job_id(&job.id);
    if !photos.is_empty() {
        println!("Photos: {}", photos.len());
    }

    if !job.description.is_empty() {
        println!("\n{}", textwrap::fill(&job.description, 70));
    }
}

fn run_time(store: &Store, command: TimeCommands) -> Result<()> {
    match command {
        TimeCommands::Log {
            job_id,
            minutes,
            description,
        } => {
            store
                .jobs()
                .get(&job_id)
                .ok_or_else(|| anyhow!("Job {} not found", job_id))?;
            let entry = store
                .time_entries()
                .save(TimeEntry::finished(&job_id, minutes, description))?;
            println!("Logged {} on job {} (entry {}).", format_minutes(minutes), job_id, entry.id);
        }

        TimeCommands::List { job } => {
            let entries = match &job {
                Some(id) => store.time_entries().by_job_id(id),
                None => store.time_entries().get_all(),
            };
            if entries.is_empty() {
                println!("No time entries found.");
            } else {
                let jobs = store.jobs().get_all();
                println!("{:<38} {:<28} {:>8} {:<30}", "ID", "JOB", "TIME", "NOTE");
                println!("{}", "-".repeat(106));
                for entry in entries {
                    let title = jobs
                        .iter()
                        .find(|j| j.id == entry.job_id)
                        .map(|j| j.title.as_str())
                        .unwrap_or("(unknown job)");
                    println!(
                        "{:<38} {:<28} {:>8} {:<30}",
                        entry.id,
                        truncate(title, 26),
                        format_minutes(entry.duration),
                        truncate(entry.description.as_deref().unwrap_or(""), 28)
                    );
                }
            }
        }

        TimeCommands::Delete { id } => {
            if store.time_entries().delete(&id)? {
                println!("Deleted time entry {}.", id);
            } else {
                println!("Time entry {} not found.", id);
            }
        }
    }
    Ok(())
}

fn run_photos(store: &Store, command: PhotoCommands) -> Result<()> {
    match command {
        PhotoCommands::Add {
            job_id,
            kind,
            url,
            description,
        } => {
            let mut photo = Photo::new(&job_id, kind, &url);
            photo.description = description;
            let photo = store.photos().save(photo)?;
            println!("Added {} photo {} to job {}.", kind.as_str(), photo.id, job_id);
        }

        PhotoCommands::List { job_id } => {
            let photos = store.photos().by_job_id(&job_id);
            if photos.is_empty() {
                println!("No photos for job {}.", job_id);
            } else {
                for photo in photos {
                    println!(
                        "{:<38} {:<9} {}",
                        photo.id,
                        photo.kind.as_str(),
                        truncate(&photo.url, 60)
                    );
                }
            }
        }

        PhotoCommands::Delete { id } => {
            if store.photos().delete(&id)? {
                println!("Deleted photo {}.", id);
            } else {
                println!("Photo {} not found.", id);
            }
        }
    }
    Ok(())
}

fn run_clients(store: &Store, command: ClientCommands) -> Result<()> {
    match command {
        ClientCommands::List { search } => {
            let clients = match &search {
                Some(text) => store.clients().search(text),
                None => store.clients().get_all(),
            };
            if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!("{:<38} {:<26} {:>6} {:>5} {:>12}", "ID", "NAME", "JOBS", "★", "REVENUE");
                println!("{}", "-".repeat(91));
                for client in clients {
                    println!(
                        "{:<38} {:<26} {:>6} {:>5} {:>12.2}",
                        client.id,
                        truncate(&client.name, 24),
                        client.total_jobs,
                        client.rating,
                        client.total_revenue
                    );
                }
            }
        }

        ClientCommands::Show { name } => {
            let client = store
                .clients()
                .get(&name)
                .or_else(|| store.clients().by_name(&name));
            match client {
                Some(client) => print_client(store, &client),
                None => println!("Client '{}' not found.", name),
            }
        }

        ClientCommands::Rate { id, rating } => {
            let client = store.clients().set_rating(&id, rating)?;
            println!("Rated '{}' {}/5.", client.name, client.rating);
        }

        ClientCommands::Delete { id } => {
            if store.clients().delete(&id)? {
                println!("Deleted client {}.", id);
            } else {
                println!("Client {} not found.", id);
            }
        }

        ClientCommands::Resync => {
            let count = store.sync().recompute_all()?;
            println!("Recomputed totals for {} client(s).", count);
        }
    }
    Ok(())
}

fn print_client(store: &Store, client: &Client) {
    println!("Client {}", client.id);
    println!("Name: {}", client.name);
    println!("Rating: {}/5", client.rating);
    if let Some(phone) = &client.phone {
        println!("Phone: {}", phone);
    }
    if let Some(email) = &client.email {
        println!("Email: {}", email);
    }
    if let Some(address) = &client.address {
        println!("Address: {}", address);
    }
    if let Some(last) = &client.last_contact_date {
        println!("Last contact: {}", last);
    }
    if !client.tags.is_empty() {
        println!("Tags: {}", client.tags.join(", "));
    }
    println!(
        "Jobs: {}  Revenue: {:.2} zł  Avg: {:.2} zł",
        client.total_jobs, client.total_revenue, client.average_job_value
    );

    let jobs: Vec<Job> = store
        .jobs()
        .get_all()
        .into_iter()
        .filter(|j| j.belongs_to(&client.id, &client.name))
        .collect();
    let comms = store.communications().by_client_id(&client.id);
    let detail = stats::client_detail(&jobs, &comms, chrono::Utc::now());
    println!(
        "Completed: {}  Active: {}  Cancelled: {}  Completion: {:.0}%",
        detail.completed_jobs, detail.active_jobs, detail.cancelled_jobs, detail.completion_rate
    );
    println!("Last 6 months: {:.2} zł", detail.recent_revenue);
    for month in &detail.monthly_revenue {
        println!("  {}  {:>12.2} zł", month.month, month.revenue);
    }

    if !jobs.is_empty() {
        println!("\nJobs ({}):", jobs.len());
        for job in &jobs {
            println!("  {} - {} ({})", job.id, job.title, job.status);
        }
    }
    if let Some(notes) = &client.notes {
        println!("\n{}", textwrap::fill(notes, 70));
    }
}

fn run_comms(store: &Store, command: CommCommands) -> Result<()> {
    match command {
        CommCommands::Log {
            client_id,
            kind,
            content,
            subject,
            done,
        } => {
            store
                .clients()
                .get(&client_id)
                .ok_or_else(|| anyhow!("Client {} not found", client_id))?;
            let mut comm = Communication::new(&client_id, kind, &content);
            comm.subject = subject;
            if done {
                comm = comm.complete();
            }
            let comm = store.communications().save(comm)?;
            println!("Logged {} {}.", kind.as_str(), comm.id);
        }

        CommCommands::List { client_id } => {
            let comms = store.communications().by_client_id(&client_id);
            if comms.is_empty() {
                println!("No communications found.");
            }
            for comm in comms {
                let mark = if comm.is_completed { "x" } else { " " };
                println!(
                    "[{}] {} {} {}",
                    mark,
                    truncate(&comm.created_at, 19),
                    comm.kind.as_str(),
                    comm.subject.as_deref().unwrap_or("")
                );
                for line in textwrap::fill(&comm.content, 66).lines() {
                    println!("    {}", line);
                }
            }
        }
    }
    Ok(())
}

fn run_templates(store: &Store, command: TemplateCommands) -> Result<()> {
    match command {
        TemplateCommands::List => {
            let templates = store.templates().get_all();
            if templates.is_empty() {
                println!("No templates found.");
            } else {
                println!("{:<38} {:<28} {:<7} {:<20}", "ID", "NAME", "TYPE", "CATEGORY");
                println!("{}", "-".repeat(96));
                for t in templates {
                    println!(
                        "{:<38} {:<28} {:<7} {:<20}",
                        t.id,
                        truncate(&t.name, 26),
                        t.kind.as_str(),
                        truncate(&t.category, 18)
                    );
                }
            }
        }

        TemplateCommands::Show { id } => {
            let t = store
                .templates()
                .get(&id)
                .ok_or_else(|| anyhow!("Template {} not found", id))?;
            println!("{} ({}, {})", t.name, t.kind.as_str(), t.category);
            if let Some(subject) = &t.subject {
                println!("Subject: {}", subject);
            }
            println!("Variables: {}", t.variables.join(", "));
            println!("\n{}", t.content);
        }

        TemplateCommands::Render { id, values } => {
            let t = store
                .templates()
                .get(&id)
                .ok_or_else(|| anyhow!("Template {} not found", id))?;
            let values = parse_values(&values)?;
            if let Some(subject) = &t.subject {
                println!("Subject: {}\n", render(subject, &values));
            }
            println!("{}", render(&t.content, &values));
        }
    }
    Ok(())
}

fn parse_values(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("Expected key=value, got '{}'", pair))
        })
        .collect()
}

fn format_minutes(minutes: i64) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
