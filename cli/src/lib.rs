//! Argument parsing, configuration layering and command execution for the
//! `registrar` binary.
//!
//! Kept in a library so the commands can be driven against an in-memory
//! store in tests.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use registrar_store::StoreConfig;
use registrar_sync::table::PAGE_SIZE_OPTIONS;
use registrar_sync::{Intent, Outcome, RelationshipSynchronizer, Row, TableView};
use registrar_types::{Entity, EntityId, EntityKind, Record};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "registrar")]
#[command(about = "Manage students, classes, professors and departments")]
pub struct Args {
    /// TOML file with store settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the record API
    #[arg(long, env = "REGISTRAR_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Request timeout in seconds (0 disables it)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List records of a kind as a table
    List {
        kind: EntityKind,
        /// Case-insensitive text to search for in any column
        #[arg(short, long, default_value = "")]
        query: String,
        /// Zero-based page index
        #[arg(short, long, default_value_t = 0)]
        page: usize,
        /// Rows per page (10, 25 or 100)
        #[arg(long, default_value_t = registrar_sync::table::DEFAULT_PAGE_SIZE, value_parser = page_size)]
        page_size: usize,
    },
    /// Print one record as JSON
    Show { kind: EntityKind, id: EntityId },
    /// Create a record from a JSON object
    Create { kind: EntityKind, json: String },
    /// Replace a record with a JSON object
    Update {
        kind: EntityKind,
        id: EntityId,
        json: String,
    },
    /// Delete a record
    Delete { kind: EntityKind, id: EntityId },
    /// Enroll a student in a class
    Enroll { class: EntityId, student: EntityId },
    /// Remove a student from a class
    Unenroll { class: EntityId, student: EntityId },
    /// Move a class into a department
    SetDepartment { class: EntityId, department: EntityId },
    /// Remove a class from its department
    ClearDepartment { class: EntityId },
    /// Assign a professor to a class
    SetProfessor { class: EntityId, professor: EntityId },
    /// Remove the professor from a class
    ClearProfessor { class: EntityId },
    /// Make a professor head of a department
    SetHead {
        department: EntityId,
        professor: EntityId,
    },
    /// Remove the head of a department
    ClearHead { department: EntityId },
    /// Students enrolled in a class
    Roster { class: EntityId },
    /// Classes in a department
    DepartmentClasses { department: EntityId },
    /// Classes a student is enrolled in
    Schedule { student: EntityId },
    /// Classes taught by and departments headed by a professor
    Teaching { professor: EntityId },
}

fn page_size(raw: &str) -> std::result::Result<usize, String> {
    let size: usize = raw.parse().map_err(|e| format!("{e}"))?;
    if PAGE_SIZE_OPTIONS.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {PAGE_SIZE_OPTIONS:?}"))
    }
}

impl Args {
    /// Resolves store settings: defaults, then `--config`, then the
    /// environment and flags.
    pub fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => StoreConfig::default(),
        };
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        config.validate().context("invalid store configuration")?;
        Ok(config)
    }
}

impl Command {
    /// The mutation this command requests, if it is one.
    pub fn intent(&self) -> Result<Option<Intent>> {
        Ok(Some(match self.clone() {
            Command::Create { kind, json } => Intent::Create(parse_record(kind, &json, None)?),
            Command::Update { kind, id, json } => Intent::Update {
                record: parse_record(kind, &json, Some(&id))?,
                id,
            },
            Command::Delete { kind, id } => Intent::Delete { kind, id },
            Command::Enroll { class, student } => Intent::AddStudent { class, student },
            Command::Unenroll { class, student } => Intent::RemoveStudent { class, student },
            Command::SetDepartment { class, department } => {
                Intent::SetDepartment { class, department }
            }
            Command::ClearDepartment { class } => Intent::ClearDepartment { class },
            Command::SetProfessor { class, professor } => {
                Intent::SetProfessor { class, professor }
            }
            Command::ClearProfessor { class } => Intent::ClearProfessor { class },
            Command::SetHead {
                department,
                professor,
            } => Intent::SetHead {
                department,
                professor,
            },
            Command::ClearHead { department } => Intent::ClearHead { department },
            Command::List { .. }
            | Command::Show { .. }
            | Command::Roster { .. }
            | Command::DepartmentClasses { .. }
            | Command::Schedule { .. }
            | Command::Teaching { .. } => return Ok(None),
        }))
    }
}

/// Decodes a JSON object as a record of `kind`. On update the id in the
/// path wins over any id in the body.
fn parse_record(kind: EntityKind, json: &str, id: Option<&EntityId>) -> Result<Record> {
    let value: serde_json::Value =
        serde_json::from_str(json).with_context(|| format!("invalid {kind} JSON"))?;
    let mut record =
        Record::from_value(kind, value).with_context(|| format!("not a valid {kind} record"))?;
    record.set_id(id.cloned());
    Ok(record)
}

/// Runs one command and writes its output.
pub async fn run(sync: &RelationshipSynchronizer, command: Command, out: &mut impl Write) -> Result<()> {
    if let Some(intent) = command.intent()? {
        let label = intent.to_string();
        debug!("running {label}");
        let outcome = sync.apply(intent).await.with_context(|| format!("{label} failed"))?;
        return match outcome {
            Outcome::Record(record) => print_json(out, &record),
            Outcome::Deleted { kind, id } => Ok(writeln!(out, "deleted {kind} {id}")?),
        };
    }

    match command {
        Command::List {
            kind,
            query,
            page,
            page_size,
        } => {
            let rows = sync.rows(kind).await.with_context(|| format!("failed to list {kind}"))?;
            let mut view = TableView::new();
            view.set_page_size(page_size);
            view.set_query(query);
            view.set_page(page);
            print_table(out, kind, &rows, &view)
        }
        Command::Show { kind, id } => {
            let record = sync
                .get_record(kind, &id)
                .await
                .with_context(|| format!("failed to load {kind} {id}"))?;
            print_json(out, &record)
        }
        Command::Roster { class } => {
            let students = sync.class_students(&class).await?;
            print_related(sync, out, students).await
        }
        Command::DepartmentClasses { department } => {
            let classes = sync.department_classes(&department).await?;
            print_related(sync, out, classes).await
        }
        Command::Schedule { student } => {
            let classes = sync.student_classes(&student).await?;
            print_related(sync, out, classes).await
        }
        Command::Teaching { professor } => {
            let classes = sync.professor_classes(&professor).await?;
            let departments = sync.headed_departments(&professor).await?;
            writeln!(out, "classes:")?;
            print_related(sync, out, classes).await?;
            writeln!(out, "heads:")?;
            print_related(sync, out, departments).await
        }
        other => bail!("unhandled command {other:?}"),
    }
}

fn print_json(out: &mut impl Write, record: &Record) -> Result<()> {
    let json = serde_json::to_string_pretty(&record.to_value()?)?;
    writeln!(out, "{json}")?;
    Ok(())
}

async fn print_related<T: Entity>(
    sync: &RelationshipSynchronizer,
    out: &mut impl Write,
    items: Vec<T>,
) -> Result<()> {
    let records: Vec<Record> = items.into_iter().map(Entity::into_record).collect();
    for row in sync.project_records(&records).await {
        write_row(out, &row)?;
    }
    Ok(())
}

fn print_table(out: &mut impl Write, kind: EntityKind, rows: &[Row], view: &TableView) -> Result<()> {
    let columns = registrar_sync::projector::columns(kind);
    writeln!(out, "id\t{}", columns.join("\t"))?;
    let page = view.apply(rows);
    for row in &page.items {
        write_row(out, row)?;
    }
    writeln!(
        out,
        "page {} of {} ({} matching)",
        page.page + 1,
        page.page_count,
        page.total
    )?;
    Ok(())
}

fn write_row(out: &mut impl Write, row: &Row) -> Result<()> {
    let id = row.id.as_ref().map(EntityId::as_str).unwrap_or_default();
    let cells: Vec<&str> = row.cells.iter().map(|c| c.value.as_str()).collect();
    writeln!(out, "{id}\t{}", cells.join("\t"))?;
    Ok(())
}
