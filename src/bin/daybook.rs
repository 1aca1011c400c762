//! A command-line front-end to a daybook server
//!
//! Set the RUST_LOG environment variable to display more info about what is going on.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};

use daybook::client::Client;
use daybook::export::DirectorySaver;
use daybook::guard::Access;
use daybook::storage::FileStorage;
use daybook::token_store::TokenStore;
use daybook::transport::ReqwestTransport;
use daybook::{Priority, Provider, Session, Task, TaskId, TaskPatch};

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Manage the to-do list of a day", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the API (or set DAYBOOK_API_URL env var)
    #[arg(long, env = "DAYBOOK_API_URL")]
    api_url: Option<String>,

    /// Where the session is persisted between runs
    #[arg(long, env = "DAYBOOK_STORAGE", default_value = "daybook-session.json")]
    storage: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with an identity token from an identity provider
    Login {
        assertion: String,
        #[arg(long, default_value = daybook::config::DEFAULT_IDENTITY_PROVIDER)]
        provider: String,
    },
    /// Forget the current session
    Logout,
    /// Tell who is logged in
    Whoami,
    /// List the tasks of a day
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Add a task
    Add {
        title: String,
        #[arg(long, default_value = "B")]
        priority: Priority,
        /// Time of day (HH:MM)
        #[arg(long, value_parser = parse_time_arg)]
        at: Option<NaiveTime>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark a task as done, or as not done
    Toggle {
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Change a task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_time_arg)]
        at: Option<NaiveTime>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a task
    Rm {
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Download the list of a day as a document
    Export {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Folder to save the document into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn parse_time_arg(text: &str) -> Result<NaiveTime, String> {
    daybook::task::parse_time(text)
}

type CliSession = Session<ReqwestTransport>;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(url) = &cli.api_url {
        daybook::config::set_api_url(url);
    }
    let transport = ReqwestTransport::from_config()?;
    log::debug!("Using API at {}", transport.api_url());
    let tokens = TokenStore::new(FileStorage::open(&cli.storage));
    let session = Arc::new(Session::new(Arc::new(Client::new(transport, tokens))));

    match cli.command {
        Commands::Login{ assertion, provider } => {
            let user = session.login(&provider, &assertion).await?;
            println!("Logged in as {}", user.username());
            Ok(())
        },
        Commands::Logout => {
            session.logout();
            println!("Logged out.");
            Ok(())
        },
        Commands::Whoami => {
            session.restore().await;
            match session.user() {
                Some(user) => println!("{}", user.username()),
                None => println!("Not logged in."),
            }
            Ok(())
        },
        task_command => run_task_command(session, task_command).await,
    }
}

async fn run_task_command(session: Arc<CliSession>, command: Commands) -> Result<(), Box<dyn Error>> {
    session.restore().await;

    let date = match &command {
        Commands::List{ date } | Commands::Add{ date, .. } | Commands::Toggle{ date, .. }
        | Commands::Edit{ date, .. } | Commands::Rm{ date, .. } | Commands::Export{ date, .. } => date.unwrap_or_else(today),
        _ => today(),
    };
    let destination = format!("/logs/{}", daybook::resource::format_date(date));
    if let Access::RedirectToLogin{ return_to } = session.check_access(&destination) {
        return Err(format!("Not logged in. Run `daybook login <token>` first, then go back to {}", return_to).into());
    }

    let out = match &command {
        Commands::Export{ out, .. } => out.clone(),
        _ => PathBuf::from("."),
    };
    let provider = Provider::with_date(session, DirectorySaver::new(&out), date);
    provider.refresh().await?;

    match command {
        Commands::List{ .. } => {
            print_list(date, &provider.tasks());
        },
        Commands::Add{ title, priority, at, .. } => {
            let task = provider.create(&title, priority, at).await?;
            println!("Added {}", task.id());
        },
        Commands::Toggle{ id, .. } => {
            let task = find(&provider, &id)?;
            let task = provider.toggle_done(&task).await?;
            print_task(&task);
        },
        Commands::Edit{ id, title, priority, at, .. } => {
            let patch = TaskPatch { title, done: None, priority, scheduled_time: at };
            let task = provider.update(&TaskId::from(id), patch).await?;
            print_task(&task);
        },
        Commands::Rm{ id, .. } => {
            provider.remove(&TaskId::from(id.as_str())).await?;
            println!("Deleted {}", id);
        },
        Commands::Export{ .. } => {
            let path = provider.export(date).await?;
            println!("Saved {}", path.display());
        },
        Commands::Login{ .. } | Commands::Logout | Commands::Whoami => (),
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn find<T: daybook::traits::Transport>(provider: &Provider<T>, id: &str) -> Result<Task, Box<dyn Error>> {
    provider.task(&TaskId::from(id))
        .ok_or_else(|| format!("No task {} on {}", id, provider.selected_date()).into())
}

fn print_list(date: NaiveDate, tasks: &[Task]) {
    println!("THINGS TO DO ON {}", date.format("%A %d %B %Y"));
    if tasks.is_empty() {
        println!("    No tasks yet.");
    }
    for task in tasks {
        print_task(task);
    }
}

fn print_task(task: &Task) {
    let completion = if task.done() { "✓" } else { " " };
    let time = task.scheduled_time()
        .map(daybook::task::format_time)
        .unwrap_or_else(|| "     ".to_string());
    println!("    {} [{}] {} {}\t{}", completion, task.priority(), time, task.title(), task.id());
}
