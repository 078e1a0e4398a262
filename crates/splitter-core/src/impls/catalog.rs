//! CatalogSource - canonical task lists per task kind
//!
//! Each `TaskKind` resolves to a pure generator over a fixed catalog. The
//! kind is parsed once at the source boundary; the dispatcher only ever
//! sees the resulting descriptors.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::TaskDescriptor;
use crate::ports::{ShortfallPolicy, SourceContext, SourceError, TaskSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    CodeReview,
    Refactor,
    Test,
    Document,
    Debug,
}

type Generator = fn(&SourceContext) -> Vec<String>;

const REVIEW_TASKS: [&str; 5] = [
    "Review code style and conventions for lint compliance",
    "Analyze performance bottlenecks and propose optimizations",
    "Identify potential security vulnerabilities and risk points",
    "Assess readability and maintainability",
    "Check error handling and edge-case coverage",
];

const REFACTOR_TASKS: [&str; 5] = [
    "Restructure functions and types to improve reuse",
    "Improve variable and function naming for readability",
    "Simplify complex logic and split large functions",
    "Remove duplicated code and extract shared helpers",
    "Tidy module imports and break dependency cycles",
];

const TEST_TASKS: [&str; 5] = [
    "Write unit tests covering core functionality",
    "Design integration tests for module interactions",
    "Add boundary-condition and failure-path test cases",
    "Implement performance tests and establish baselines",
    "Produce a test report with coverage analysis",
];

const DOCUMENT_TASKS: [&str; 5] = [
    "Write API documentation for public functions and types",
    "Create a project README describing overall functionality",
    "Write a developer guide for environment setup and workflow",
    "Write a user manual describing how to use the system",
    "Document the architecture and system structure",
];

const DEBUG_TASKS: [&str; 5] = [
    "Locate runtime errors and analyze stack traces",
    "Track down logic errors and verify algorithm correctness",
    "Check data handling errors and validate inputs and outputs",
    "Analyze performance problems and identify hot spots",
    "Verify thread safety under concurrent scenarios",
];

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::CodeReview,
        TaskKind::Refactor,
        TaskKind::Test,
        TaskKind::Document,
        TaskKind::Debug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::CodeReview => "code_review",
            TaskKind::Refactor => "refactor",
            TaskKind::Test => "test",
            TaskKind::Document => "document",
            TaskKind::Debug => "debug",
        }
    }

    pub fn catalog(self) -> &'static [&'static str] {
        match self {
            TaskKind::CodeReview => &REVIEW_TASKS,
            TaskKind::Refactor => &REFACTOR_TASKS,
            TaskKind::Test => &TEST_TASKS,
            TaskKind::Document => &DOCUMENT_TASKS,
            TaskKind::Debug => &DEBUG_TASKS,
        }
    }

    fn generator(self) -> Generator {
        match self {
            TaskKind::CodeReview => |ctx| scoped(&REVIEW_TASKS, ctx),
            TaskKind::Refactor => |ctx| scoped(&REFACTOR_TASKS, ctx),
            TaskKind::Test => |ctx| scoped(&TEST_TASKS, ctx),
            TaskKind::Document => |ctx| scoped(&DOCUMENT_TASKS, ctx),
            TaskKind::Debug => |ctx| scoped(&DEBUG_TASKS, ctx),
        }
    }

    /// The full task list for this kind, scoped to the context's project.
    pub fn generate(self, ctx: &SourceContext) -> Vec<String> {
        (self.generator())(ctx)
    }
}

fn scoped(catalog: &[&str], ctx: &SourceContext) -> Vec<String> {
    catalog
        .iter()
        .map(|task| match &ctx.project {
            Some(project) => format!("[{project}] {task}"),
            None => (*task).to_string(),
        })
        .collect()
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "review" | "code_review" => Ok(TaskKind::CodeReview),
            "refactor" => Ok(TaskKind::Refactor),
            "test" => Ok(TaskKind::Test),
            "document" | "doc" => Ok(TaskKind::Document),
            "debug" => Ok(TaskKind::Debug),
            _ => Err(SourceError::UnknownTaskType(s.to_string())),
        }
    }
}

/// Task source backed by a `TaskKind` catalog.
///
/// Default shortfall policy is `Truncate`: asking for more tasks than the
/// catalog holds yields the whole catalog and nothing more.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    kind: TaskKind,
    policy: ShortfallPolicy,
    known_projects: Option<HashSet<String>>,
}

impl CatalogSource {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            policy: ShortfallPolicy::Truncate,
            known_projects: None,
        }
    }

    pub fn with_policy(mut self, policy: ShortfallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reject contexts naming a project outside this set.
    pub fn with_known_projects(mut self, projects: impl IntoIterator<Item = String>) -> Self {
        self.known_projects = Some(projects.into_iter().collect());
        self
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }
}

impl TaskSource for CatalogSource {
    fn next_batch(
        &self,
        count: usize,
        ctx: &SourceContext,
    ) -> Result<Vec<TaskDescriptor<String>>, SourceError> {
        if let (Some(known), Some(project)) = (&self.known_projects, &ctx.project)
            && !known.contains(project)
        {
            return Err(SourceError::UnknownProject(project.clone()));
        }
        let tasks = self.policy.apply(self.kind.generate(ctx), count);
        tracing::debug!(
            kind = %self.kind,
            requested = count,
            produced = tasks.len(),
            "catalog batch"
        );
        Ok(TaskDescriptor::batch(tasks))
    }
}
