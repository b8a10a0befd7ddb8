use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueHint};

use tasklite::engine::{DEFAULT_UPCOMING_DAYS, DueWindow, NewTask, Stats, TaskFilter};
use tasklite::export::ExportFormat;
use tasklite::model::{Priority, Task, TaskPatch, parse_due_date};
use tasklite::storage::Store;

#[derive(Parser, Debug)]
#[command(author, version, about = "A tiny task tracker for the terminal")]
struct Cli {
    /// Main verb. If omitted, `list` is the default action.
    #[command(subcommand)]
    verb: Option<Verb>,

    /// Data directory (default ~/.tasklite)
    #[arg(long, value_hint = ValueHint::DirPath)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Verb {
    /// Add a new task
    Add {
        title: String,

        /// Tag the task; repeat for more tags
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Due date, YYYY-MM-DD
        #[arg(short, long)]
        due: Option<String>,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List tasks with optional filters
    List {
        /// Show completed tasks too
        #[arg(short, long)]
        all: bool,

        /// Only tasks carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Only tasks with this priority
        #[arg(short, long)]
        priority: Option<Priority>,

        /// overdue, today or upcoming
        #[arg(short, long)]
        due: Option<DueWindow>,

        /// Days ahead that still count as upcoming
        #[arg(long, default_value_t = DEFAULT_UPCOMING_DAYS)]
        horizon: u16,
    },

    /// Mark a task as completed
    Done { id: u64 },

    /// Reopen a completed task
    Undone { id: u64 },

    /// Change fields of an existing task
    Edit {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,

        /// Replace the tag set; repeat for more tags
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,

        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a task permanently
    Delete {
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Replace a task's tags (no tags clears them)
    Tag { id: u64, tags: Vec<String> },

    /// Find tasks by keyword in title or note
    Search {
        keyword: String,

        /// Search completed tasks too
        #[arg(short, long)]
        all: bool,
    },

    /// Move completed tasks into the archive file
    Archive,

    /// Remove tasks (all of them, or completed only)
    Clear {
        /// Only completed tasks
        #[arg(short, long)]
        done: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show collection statistics
    Stats,

    /// Export tasks as json or csv
    Export {
        /// json or csv
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
    },

    /// Refuse data commands until `enable` is run
    Disable {
        /// Stored in the marker file for later reference
        #[arg(long)]
        reason: Option<String>,
    },

    /// Lift a previous `disable`
    Enable,

    /// Delete the data directory and everything in it
    Uninstall {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Verb {
    /// Lifecycle verbs must keep working while the tool is disabled.
    fn gated(&self) -> bool {
        !matches!(self, Verb::Enable | Verb::Disable { .. } | Verb::Uninstall { .. })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = match cli.dir {
        Some(dir) => Store::new(dir),
        None => Store::new(Store::default_dir()?),
    };

    let verb = cli.verb.unwrap_or(Verb::List {
        all: false,
        tag: None,
        priority: None,
        due: None,
        horizon: DEFAULT_UPCOMING_DAYS,
    });

    if verb.gated() && store.is_disabled() {
        bail!(
            "tasklite is disabled for {}; run `tasklite enable` first",
            store.dir().display()
        );
    }

    match verb {
        Verb::Add {
            title,
            tags,
            priority,
            due,
            note,
        } => {
            let due_date = due.as_deref().map(parse_due_date).transpose()?;
            let task = tasklite::add_task(
                &store,
                NewTask {
                    title,
                    tags,
                    priority,
                    due_date,
                    note,
                },
            )?;
            println!("added task {}", task.id);
            print_task(&task);
        }

        Verb::List {
            all,
            tag,
            priority,
            due,
            horizon,
        } => {
            let filter = TaskFilter {
                tag,
                priority,
                due,
                include_done: all,
                upcoming_days: horizon,
            };
            let tasks = tasklite::list_tasks(&store, &filter)?;
            if tasks.is_empty() {
                println!("no tasks found");
                if !all {
                    println!("(use --all to include completed tasks)");
                }
            } else {
                print_table(&tasks);
            }
        }

        Verb::Done { id } => {
            let task = tasklite::set_task_done(&store, id, true)?;
            println!("task {} done: {}", task.id, task.title);
        }

        Verb::Undone { id } => {
            let task = tasklite::set_task_done(&store, id, false)?;
            println!("task {} reopened: {}", task.id, task.title);
        }

        Verb::Edit {
            id,
            title,
            priority,
            tags,
            due,
            note,
        } => {
            let due_date = due.as_deref().map(parse_due_date).transpose()?;
            let patch = TaskPatch {
                title,
                priority,
                tags,
                due_date,
                note,
            };
            if patch.is_empty() {
                bail!("nothing to change; pass at least one of --title, --priority, --tag, --due, --note");
            }
            let task = tasklite::edit_task(&store, id, patch)?;
            println!("updated task {}", task.id);
            print_task(&task);
        }

        Verb::Delete { id, force } => {
            if !force && !confirm(&format!("delete task {id}?"))? {
                println!("cancelled");
                return Ok(());
            }
            let task = tasklite::delete_task(&store, id)?;
            println!("deleted task {}: {}", task.id, task.title);
        }

        Verb::Tag { id, tags } => {
            let task = tasklite::set_task_tags(&store, id, tags)?;
            if task.tags.is_empty() {
                println!("cleared tags on task {}", task.id);
            } else {
                println!("task {} tagged {}", task.id, format_tags(&task.tags));
            }
        }

        Verb::Search { keyword, all } => {
            let tasks = tasklite::search_tasks(&store, &keyword, all)?;
            if tasks.is_empty() {
                println!("no tasks matching {keyword:?}");
            } else {
                print_table(&tasks);
            }
        }

        Verb::Archive => {
            let count = tasklite::archive_done(&store)?;
            if count == 0 {
                println!("nothing to archive");
            } else {
                println!("archived {count} completed task(s)");
            }
        }

        Verb::Clear { done, force } => {
            let what = if done { "completed tasks" } else { "ALL tasks" };
            if !force && !confirm(&format!("remove {what}?"))? {
                println!("cancelled");
                return Ok(());
            }
            let removed = tasklite::clear_tasks(&store, done)?;
            println!("cleared {removed} task(s)");
        }

        Verb::Stats => {
            print_stats(&tasklite::task_stats(&store)?);
        }

        Verb::Export {
            format,
            output,
            all,
        } => {
            let filter = TaskFilter {
                include_done: all,
                ..TaskFilter::default()
            };
            let tasks = tasklite::list_tasks(&store, &filter)?;
            let rendered = tasklite::export::render(&tasks, format)?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("exported {} task(s) to {}", tasks.len(), path.display());
                }
                None => print!("{rendered}"),
            }
        }

        Verb::Disable { reason } => {
            store.disable(reason.as_deref())?;
            println!("tasklite disabled; run `tasklite enable` to resume");
        }

        Verb::Enable => {
            store.enable()?;
            println!("tasklite enabled");
        }

        Verb::Uninstall { force } => {
            let prompt = format!("remove {} and all task data?", store.dir().display());
            if !force && !confirm(&prompt)? {
                println!("cancelled");
                return Ok(());
            }
            store.uninstall()?;
            println!("removed {}", store.dir().display());
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_table(tasks: &[Task]) {
    println!("ID   | Done | Pri    | Due        | Title");
    println!("-----+------+--------+------------+----------------");
    for task in tasks {
        println!(
            "{:<4} | {:<4} | {:<6} | {:<10} | {}{}",
            task.id,
            if task.done { "x" } else { "" },
            task.priority.to_string(),
            task.due_date.map(|d| d.to_string()).unwrap_or_default(),
            task.title,
            if task.tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", format_tags(&task.tags))
            },
        );
    }
}

fn print_task(task: &Task) {
    println!("  id:       {}", task.id);
    println!("  title:    {}", task.title);
    println!(
        "  status:   {}",
        if task.done { "done" } else { "pending" }
    );
    println!("  priority: {}", task.priority);
    if let Some(due) = task.due_date {
        println!("  due:      {due}");
    }
    if !task.tags.is_empty() {
        println!("  tags:     {}", format_tags(&task.tags));
    }
    if let Some(note) = &task.note {
        println!("  note:     {note}");
    }
}

fn print_stats(stats: &Stats) {
    println!("total:   {}", stats.total);
    println!("done:    {} ({:.1}%)", stats.done, stats.completion_pct);
    println!("pending: {}", stats.pending);
    println!();
    println!("pending by priority:");
    println!("  high:   {}", stats.pending_by_priority.high);
    println!("  medium: {}", stats.pending_by_priority.medium);
    println!("  low:    {}", stats.pending_by_priority.low);
    println!();
    println!(
        "due: {} overdue, {} today, {} upcoming",
        stats.overdue, stats.due_today, stats.upcoming
    );
    if !stats.tags.is_empty() {
        println!("tags: {}", format_tags(&stats.tags));
    }
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ")
}
