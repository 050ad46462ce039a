//! Output rendering for command results.
//!
//! Every command result goes through [`OutputWriter`], which prints either
//! human-readable lines or pretty-printed JSON depending on `--output`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};

use crate::models::{
    AssociatedWorkItem, Build, BuildArtifact, BuildDefinitionReference, Change, Changeset,
    IdentityRef, OutputFormat, ShelvesetReference, TeamProjectReference, TestPlan, TestRun,
    TestSuite, WebApiTeam, WorkItem,
};
use crate::wait::{PollOutcome, WaitEvent, WaitSummary};

/// Text form of a result record.
pub trait TextRender {
    fn render_text(&self) -> String;
}

/// Writer that formats results according to the selected format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes a single value such as a status or a title.
    ///
    /// `None` prints an empty line in text mode and `null` in JSON mode.
    pub fn write_scalar<T>(&mut self, value: Option<&T>) -> io::Result<()>
    where
        T: Serialize + ToString + ?Sized,
    {
        match self.format {
            OutputFormat::Text => {
                let text = value.map(ToString::to_string).unwrap_or_default();
                writeln!(self.writer, "{}", text)
            }
            OutputFormat::Json => self.write_json(&value),
        }
    }

    pub fn write_record<T: Serialize + TextRender>(&mut self, record: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "{}", record.render_text()),
            OutputFormat::Json => self.write_json(record),
        }
    }

    /// Writes one line per item, or a JSON array.
    pub fn write_list<T: Serialize + TextRender>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                for item in items {
                    writeln!(self.writer, "{}", item.render_text())?;
                }
                Ok(())
            }
            OutputFormat::Json => self.write_json(&items),
        }
    }

    /// Progress lines in text mode; only the final report in JSON mode.
    pub fn write_wait_event(&mut self, event: &WaitEvent<'_>) -> io::Result<()> {
        match (self.format, event) {
            (OutputFormat::Text, _) => writeln!(self.writer, "{}", event),
            (OutputFormat::Json, WaitEvent::StillRunning { .. }) => Ok(()),
            (OutputFormat::Json, WaitEvent::Finished { id, summary }) => {
                self.write_json(&WaitReport::new(id, summary))
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        writeln!(self.writer, "{}", json)
    }
}

/// JSON shape of a finished wait.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WaitReport<'a> {
    id: &'a str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    polls: u32,
    elapsed_seconds: u64,
}

impl<'a> WaitReport<'a> {
    fn new(id: &'a str, summary: &'a WaitSummary) -> Self {
        let (outcome, status, reason) = match &summary.outcome {
            PollOutcome::Succeeded { status } => ("succeeded", Some(status.as_str()), None),
            PollOutcome::TimedOut => ("timedOut", None, None),
            PollOutcome::Failed { reason } => ("failed", None, Some(reason.as_str())),
        };
        Self {
            id,
            outcome,
            status,
            reason,
            polls: summary.polls,
            elapsed_seconds: summary.elapsed.as_secs(),
        }
    }
}

/// Shortens a server timestamp to `YYYY-MM-DD HH:MM` (UTC). Unparseable
/// values are shown as-is.
fn short_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn identity_name(identity: Option<&IdentityRef>) -> &str {
    identity.map(IdentityRef::name).unwrap_or("-")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

impl TextRender for Build {
    fn render_text(&self) -> String {
        let mut lines = vec![
            format!("Build:      {}", self.id),
            format!("Number:     {}", or_dash(self.build_number.as_deref())),
            format!("Status:     {}", or_dash(self.status.as_deref())),
            format!("Result:     {}", or_dash(self.result.as_deref())),
        ];
        if let Some(definition) = &self.definition {
            lines.push(format!(
                "Definition: {} ({})",
                or_dash(definition.name.as_deref()),
                definition.id
            ));
        }
        if let Some(branch) = &self.source_branch {
            lines.push(format!("Branch:     {}", branch));
        }
        if let Some(version) = &self.source_version {
            lines.push(format!("Version:    {}", version));
        }
        lines.push(format!(
            "Requested:  {}",
            identity_name(self.requested_for.as_ref())
        ));
        if let Some(finished) = &self.finish_time {
            lines.push(format!("Finished:   {}", short_date(finished)));
        }
        lines.join("\n")
    }
}

impl TextRender for BuildDefinitionReference {
    fn render_text(&self) -> String {
        match &self.path {
            Some(path) => format!("{}\t{}\t{}", self.id, or_dash(self.name.as_deref()), path),
            None => format!("{}\t{}", self.id, or_dash(self.name.as_deref())),
        }
    }
}

impl TextRender for BuildArtifact {
    fn render_text(&self) -> String {
        let resource = self.resource.as_ref();
        format!(
            "{}\t{}\t{}",
            self.name,
            or_dash(resource.and_then(|r| r.resource_type.as_deref())),
            or_dash(resource.and_then(|r| r.download_url.as_deref().or(r.data.as_deref())))
        )
    }
}

impl TextRender for Changeset {
    fn render_text(&self) -> String {
        let author = self.author.as_ref().or(self.checked_in_by.as_ref());
        format!(
            "C{}\t{}\t{}\t{}",
            self.changeset_id,
            identity_name(author),
            self.created_date
                .as_deref()
                .map(short_date)
                .unwrap_or_else(|| "-".to_string()),
            first_line(self.comment.as_deref().unwrap_or(""))
        )
    }
}

impl TextRender for Change {
    fn render_text(&self) -> String {
        format!(
            "{}\t{}",
            or_dash(self.change_type.as_deref()),
            or_dash(self.item.path.as_deref())
        )
    }
}

impl TextRender for AssociatedWorkItem {
    fn render_text(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.id,
            or_dash(self.work_item_type.as_deref()),
            or_dash(self.state.as_deref()),
            or_dash(self.title.as_deref())
        )
    }
}

impl TextRender for ShelvesetReference {
    fn render_text(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.name,
            identity_name(self.owner.as_ref()),
            self.created_date
                .as_deref()
                .map(short_date)
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

impl TextRender for WorkItem {
    fn render_text(&self) -> String {
        let mut lines = vec![format!("Work item {}", self.id)];
        for (name, value) in &self.fields {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("  {}: {}", name, value));
        }
        lines.join("\n")
    }
}

impl TextRender for TeamProjectReference {
    fn render_text(&self) -> String {
        format!("{}\t{}", self.name, self.id)
    }
}

impl TextRender for WebApiTeam {
    fn render_text(&self) -> String {
        format!("{}\t{}", self.name, self.id)
    }
}

impl TextRender for IdentityRef {
    fn render_text(&self) -> String {
        match &self.unique_name {
            Some(unique) => format!("{}\t{}", self.name(), unique),
            None => self.name().to_string(),
        }
    }
}

impl TextRender for TestPlan {
    fn render_text(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.id,
            self.name,
            or_dash(self.state.as_deref())
        )
    }
}

impl TextRender for TestSuite {
    fn render_text(&self) -> String {
        format!(
            "{}\t{}\t{} test case(s)",
            self.id,
            self.name,
            self.test_case_count.unwrap_or(0)
        )
    }
}

impl TextRender for TestRun {
    fn render_text(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}/{} passed",
            self.id,
            self.name,
            or_dash(self.state.as_deref()),
            self.passed_tests.unwrap_or(0),
            self.total_tests.unwrap_or(0)
        )
    }
}

impl TextRender for i32 {
    fn render_text(&self) -> String {
        self.to_string()
    }
}
