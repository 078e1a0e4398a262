//! splitter - タスクを sub-agent に分けて並列実行する CLI
//!
//! ```text
//! splitter run --type review -n 3 --project core
//! splitter split -n 2
//! splitter tasks "write docs" "add tests"
//! splitter todo add "fix flaky test"
//! ```

mod config;
mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use splitter_core::app::CapabilitySet;
use splitter_core::impls::{
    Backlog, BacklogSource, CatalogSource, CodeStats, EchoBackend, ListSource, ModelWorker,
    TaskKind,
};
use splitter_core::ports::{SourceContext, TaskSource};
use splitter_core::{BatchReport, Dispatcher, TaskDescriptor};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::report::{ResultsFile, render};

#[derive(Debug, Parser)]
#[command(name = "splitter", version, about = "Fan tasks out to parallel sub-agents")]
struct Cli {
    /// Config file (default: ./splitter.toml if present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Concurrency budget, overrides the config file
    #[arg(short = 'c', long, global = true, value_name = "N")]
    concurrency: Option<usize>,

    /// Where to write the JSON results
    #[arg(long, global = true, value_name = "PATH")]
    results: Option<PathBuf>,

    /// Debug logging (SPLITTER_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run tasks from a built-in catalog
    Run {
        #[arg(long = "type", value_name = "KIND")]
        kind: TaskKind,

        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,

        #[arg(long)]
        project: Option<String>,
    },

    /// Run the next open items of the todo backlog
    Split {
        #[arg(short = 'n', long)]
        count: usize,

        #[arg(long, value_name = "PATH")]
        todos: Option<PathBuf>,
    },

    /// Run the given tasks as-is
    Tasks {
        #[arg(required = true)]
        tasks: Vec<String>,
    },

    /// Manage the todo backlog
    Todo {
        #[arg(long, value_name = "PATH")]
        todos: Option<PathBuf>,

        #[command(subcommand)]
        action: TodoAction,
    },
}

#[derive(Debug, Subcommand)]
enum TodoAction {
    List,
    Add { text: String },
    /// Mark item N (1-based, as shown by `list`) done
    Done { number: usize },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env("SPLITTER_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.override_concurrency(cli.concurrency)?;
    if let Some(path) = cli.results {
        config.results_path = path;
    }

    let cancel = cancel_on_ctrl_c();
    match cli.command {
        Command::Run {
            kind,
            count,
            project,
        } => {
            let mut source = CatalogSource::new(kind);
            if !config.projects.is_empty() {
                source = source.with_known_projects(config.projects.clone());
            }
            let ctx = project.map(SourceContext::for_project).unwrap_or_default();
            let descriptors = source.next_batch(count, &ctx)?;
            dispatch_and_report(&config, descriptors, cancel).await?;
        }
        Command::Split { count, todos } => {
            let path = todos.unwrap_or_else(|| config.todo_path.clone());
            split(&config, &path, count, cancel).await?;
        }
        Command::Tasks { tasks } => {
            let source = ListSource::new(tasks);
            let descriptors = source.next_batch(source.len(), &SourceContext::default())?;
            dispatch_and_report(&config, descriptors, cancel).await?;
        }
        Command::Todo { todos, action } => {
            let path = todos.unwrap_or_else(|| config.todo_path.clone());
            todo(&path, action)?;
        }
    }
    Ok(())
}

/// Ctrl-C で cancel される token
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling batch");
                cancel.cancel();
            }
        }
    });
    cancel
}

/// backlog の先頭 `count` 件を実行する。cancel されたものは未完了のまま残す。
async fn split(
    config: &CliConfig,
    path: &Path,
    count: usize,
    cancel: CancellationToken,
) -> Result<usize> {
    let mut backlog = Backlog::load(path)?;
    let descriptors = BacklogSource::new(&backlog).next_batch(count, &SourceContext::default())?;
    let report = dispatch_and_report(config, descriptors, cancel).await?;

    let marked = backlog.mark_settled(&report.outcomes);
    backlog
        .save(path)
        .with_context(|| format!("save todos {}", path.display()))?;
    info!(
        marked,
        left_open = report.summary.cancelled,
        path = %path.display(),
        "backlog updated"
    );
    Ok(marked)
}

/// 失敗したタスクがあっても exit code は 0。結果はファイルで確認する。
async fn dispatch_and_report(
    config: &CliConfig,
    descriptors: Vec<TaskDescriptor<String>>,
    cancel: CancellationToken,
) -> Result<BatchReport<String>> {
    let capabilities = CapabilitySet::builder()
        .register(Arc::new(CodeStats))?
        .build();
    let dispatcher =
        Dispatcher::new(config.dispatch.clone())?.with_capabilities(Arc::new(capabilities));

    let mut worker = ModelWorker::new(Arc::new(EchoBackend));
    if let Some(prompt) = &config.system_prompt {
        worker = worker.with_system_prompt(prompt.clone());
    }

    let report = dispatcher
        .run_until(descriptors, Arc::new(worker), cancel)
        .await?;
    for line in render(&report) {
        println!("{line}");
    }
    ResultsFile::from_report(&report).write(&config.results_path)?;
    info!(path = %config.results_path.display(), "results written");
    Ok(report)
}

fn todo(path: &Path, action: TodoAction) -> Result<()> {
    let mut backlog = Backlog::load(path)?;
    match action {
        TodoAction::List => {
            if backlog.items().is_empty() {
                println!("no todos");
            }
            for (i, item) in backlog.items().iter().enumerate() {
                let mark = if item.done { "x" } else { " " };
                println!("{:>3}. [{mark}] {}", i + 1, item.text);
            }
            return Ok(());
        }
        TodoAction::Add { text } => backlog.add(text),
        TodoAction::Done { number } => {
            if number == 0 || !backlog.mark_done(number - 1) {
                bail!("no todo #{number}");
            }
        }
    }
    backlog
        .save(path)
        .with_context(|| format!("save todos {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["splitter", "run", "--type", "review", "-n", "2"], 2)]
    #[case(&["splitter", "run", "--type", "doc"], 3)]
    fn parses_run(#[case] args: &[&str], #[case] expected: usize) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Run { count, .. } => assert_eq!(count, expected),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_task_type_is_a_usage_error() {
        assert!(Cli::try_parse_from(["splitter", "run", "--type", "dance"]).is_err());
    }

    #[test]
    fn global_flags_apply_to_subcommands() {
        let cli = Cli::try_parse_from(["splitter", "tasks", "a", "b", "-c", "2", "-v"]).unwrap();
        assert_eq!(cli.concurrency, Some(2));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Tasks { ref tasks } if tasks.len() == 2));
    }

    #[test]
    fn tasks_requires_at_least_one() {
        assert!(Cli::try_parse_from(["splitter", "tasks"]).is_err());
    }

    #[test]
    fn todo_commands_edit_the_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");

        todo(&path, TodoAction::Add { text: "a".into() }).unwrap();
        todo(&path, TodoAction::Add { text: "b".into() }).unwrap();
        todo(&path, TodoAction::Done { number: 1 }).unwrap();
        assert!(todo(&path, TodoAction::Done { number: 0 }).is_err());

        let backlog = Backlog::load(&path).unwrap();
        let texts: Vec<&str> = backlog.pending().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["b"]);
    }

    fn split_fixture(dir: &Path) -> (CliConfig, PathBuf) {
        let path = dir.join("todos.json");
        let mut backlog = Backlog::default();
        for text in ["a", "b", "c"] {
            backlog.add(text);
        }
        backlog.save(&path).unwrap();

        let config = CliConfig {
            results_path: dir.join("results.json"),
            ..CliConfig::default()
        };
        (config, path)
    }

    #[tokio::test]
    async fn split_marks_finished_items_done() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = split_fixture(dir.path());

        // 4 件目は padding なので backlog には対応する項目がない
        let marked = split(&config, &path, 4, CancellationToken::new()).await.unwrap();
        assert_eq!(marked, 3);
        assert_eq!(Backlog::load(&path).unwrap().pending().count(), 0);
    }

    #[tokio::test]
    async fn cancelled_split_keeps_items_open() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = split_fixture(dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let marked = split(&config, &path, 3, cancel).await.unwrap();
        assert_eq!(marked, 0);

        let backlog = Backlog::load(&path).unwrap();
        let open: Vec<&str> = backlog.pending().map(|i| i.text.as_str()).collect();
        assert_eq!(open, vec!["a", "b", "c"]);

        let results: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&config.results_path).unwrap())
                .unwrap();
        assert_eq!(results["summary"]["cancelled"], 3);
    }

    #[tokio::test]
    async fn dispatch_and_report_returns_ordered_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            results_path: dir.path().join("results.json"),
            ..CliConfig::default()
        };
        let descriptors = TaskDescriptor::batch(["x".to_string(), "y".to_string()]);

        let report = dispatch_and_report(&config, descriptors, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(
            report.outcomes[1].value().map(String::as_str),
            Some("SubAgent completed task: y")
        );
        assert!(config.results_path.exists());
    }
}
