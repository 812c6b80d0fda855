// Command-line entry point.
// Lists one page of a todo-list's tasks; `add <title>` creates a task first.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use taskdeck::api::TaskStatus;
use taskdeck::{Result, TasksApi, TodoClient};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(todolist_id) = args.next() else {
        eprintln!("usage: taskdeck <todolist-id> [page | add <title>]");
        return Ok(());
    };

    let api = TasksApi::new(Arc::new(TodoClient::from_env()?));

    match args.next().as_deref() {
        Some("add") => {
            let title = args.collect::<Vec<_>>().join(" ");
            if title.is_empty() {
                eprintln!("usage: taskdeck <todolist-id> add <title>");
                return Ok(());
            }
            let created = api.add_task(&todolist_id, &title).await?;
            println!("added \"{}\" ({})", created.title, created.id);
            print_page(&api, &todolist_id, 1).await
        }
        Some(page) => print_page(&api, &todolist_id, page.parse().unwrap_or(1)).await,
        None => print_page(&api, &todolist_id, 1).await,
    }
}

async fn print_page(api: &TasksApi, todolist_id: &str, page: u32) -> Result<()> {
    let tasks = api.get_tasks_page(todolist_id, page).await?;
    println!("{} task(s) in {}, page {}", tasks.total_count, todolist_id, page);
    for task in &tasks.items {
        let mark = match task.status {
            TaskStatus::Completed => "x",
            _ => " ",
        };
        println!("[{}] {} ({})", mark, task.title, task.id);
    }
    Ok(())
}
