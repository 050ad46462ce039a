use crate::{
    config::{Config, ResolvedConfig},
    parsed_property::ParsedProperty,
};
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// CLI Arguments
// ============================================================================

/// Connection and output arguments accepted by every command.
#[derive(ClapArgs, Clone, Default, Debug)]
pub struct SharedArgs {
    // TFS Connection
    /// Collection base address, e.g. https://tfs.example.com/tfs/DefaultCollection
    #[arg(short = 'c', long, global = true, help_heading = "TFS Connection")]
    pub collection_url: Option<String>,

    /// Team project name
    #[arg(short, long, global = true, help_heading = "TFS Connection")]
    pub project: Option<String>,

    /// Personal Access Token (or user:password) for Basic authentication
    #[arg(short = 't', long, global = true, help_heading = "TFS Connection")]
    pub pat: Option<String>,

    /// REST api-version query parameter [default: 4.1]
    #[arg(long, global = true, help_heading = "TFS Connection")]
    pub api_version: Option<String>,

    // Output Options
    /// Output format: text, json
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text, help_heading = "Output Options")]
    pub output: OutputFormat,

    // Logging (read before full parsing, declared here so clap accepts them)
    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_file: Option<String>,

    /// Log format: text, json
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_format: Option<String>,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Arguments for the build waiter.
#[derive(ClapArgs, Clone, Debug)]
pub struct WaitArgs {
    /// Build id to wait for
    pub build_id: String,

    /// Give up after this many minutes; zero or negative never polls [default: 5]
    #[arg(long, allow_negative_numbers = true, help_heading = "Wait Options")]
    pub timeout_minutes: Option<i64>,

    /// Seconds between status checks; zero is raised to one [default: 5]
    #[arg(long, help_heading = "Wait Options")]
    pub poll_interval_seconds: Option<u64>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum BuildCommand {
    /// Show a build
    Get { id: String },
    /// Print the build status (inProgress, completed, ...)
    Status { id: String },
    /// Print the build result (succeeded, failed, ...)
    Result { id: String },
    /// Print the build number
    Number { id: String },
    /// Show the most recently finished build of a definition
    Latest { definition_id: i32 },
    /// Queue a build of a definition
    Queue {
        definition_id: i32,
        /// Source branch, e.g. refs/heads/main or $/Project/Main
        #[arg(long)]
        source_branch: Option<String>,
        /// Build parameter as name=value (repeatable)
        #[arg(long = "parameter", value_parser = parse_key_value)]
        parameters: Vec<(String, String)>,
    },
    /// List published artifacts of a build
    Artifacts { id: String },
    /// List work item ids associated with a build
    WorkItems { id: String },
}

#[derive(Subcommand, Clone, Debug)]
pub enum DefinitionCommand {
    /// List build definitions in the project
    List,
    /// Print the id of the definition with this name
    Id { name: String },
}

#[derive(Subcommand, Clone, Debug)]
pub enum ChangesetCommand {
    /// Show a changeset
    Get { id: i32 },
    /// Print the changeset comment
    Comment { id: i32 },
    /// List changed items
    Changes { id: i32 },
    /// List associated work items
    WorkItems { id: i32 },
    /// Show the latest changeset touching a server path
    Latest { item_path: String },
}

#[derive(Subcommand, Clone, Debug)]
pub enum ShelvesetCommand {
    /// List shelvesets, optionally for one owner
    List {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one shelveset
    Get { name: String, owner: String },
    /// List pending changes in a shelveset
    Changes { name: String, owner: String },
}

#[derive(Subcommand, Clone, Debug)]
pub enum WorkItemCommand {
    /// Show a work item
    Get { id: i32 },
    /// Print the work item title
    Title { id: i32 },
    /// Print the work item state
    State { id: i32 },
    /// Set System.State
    SetState { id: i32, state: String },
    /// Set an arbitrary field, e.g. System.History
    SetField {
        id: i32,
        field: String,
        /// Sent as JSON when it parses as JSON (e.g. 2, true), else as a string
        value: String,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum TestCommand {
    /// List test plans in the project
    Plans,
    /// Show a test plan
    Plan { id: i32 },
    /// List suites of a test plan
    Suites { plan_id: i32 },
    /// List test runs published by a build
    Runs { build_id: i32 },
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Wait until a build is no longer in progress
    Wait(WaitArgs),
    /// Build queries and queueing
    #[command(subcommand)]
    Build(BuildCommand),
    /// Build definition lookups
    #[command(subcommand)]
    Definitions(DefinitionCommand),
    /// TFVC changeset queries
    #[command(subcommand)]
    Changeset(ChangesetCommand),
    /// TFVC shelveset queries
    #[command(subcommand)]
    Shelveset(ShelvesetCommand),
    /// Work item queries and updates
    #[command(subcommand)]
    WorkItem(WorkItemCommand),
    /// List team projects in the collection
    Projects,
    /// List teams in the project
    Teams,
    /// List members of a team
    TeamMembers { team: String },
    /// Test management queries
    #[command(subcommand)]
    Test(TestCommand),
}

#[derive(Parser, Clone, Debug)]
#[command(
    name = "tfs-tools",
    version,
    about = "Thin wrappers over the Team Foundation Server REST API",
    after_help = "Examples:\n    \
        # Queue a build and wait for it\n    \
        tfs-tools -c https://tfs/tfs/DefaultCollection -p Fabrikam build queue 12\n    \
        tfs-tools -c https://tfs/tfs/DefaultCollection -p Fabrikam wait 4711 --timeout-minutes 30\n\n    \
        # Read connection settings from TFS_TOOLS_* variables\n    \
        tfs-tools changeset comment 1234\n\n    \
        # Create sample config file\n    \
        tfs-tools --create-config"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub shared: SharedArgs,

    /// Create a sample configuration file at ~/.config/tfs-tools/config.toml
    #[arg(long)]
    pub create_config: bool,
}

impl Args {
    /// Resolves configuration from CLI args, environment variables, config
    /// file and defaults, in that order of precedence.
    pub fn resolve_config(&self) -> Result<ResolvedConfig> {
        let file_config = Config::load_from_file()?;
        let env_config = Config::load_from_env();

        let mut cli_config = Config::from_shared_args(&self.shared);
        if let Some(Commands::Wait(wait)) = &self.command {
            cli_config.timeout_minutes = wait
                .timeout_minutes
                .map(|v| ParsedProperty::Cli(v, v.to_string()));
            cli_config.poll_interval_seconds = wait
                .poll_interval_seconds
                .map(|v| ParsedProperty::Cli(v, v.to_string()));
        }

        // Merge configs: default < file < env < cli
        let merged = Config::default()
            .merge(file_config)
            .merge(env_config)
            .merge(cli_config);

        Ok(merged.resolve()?)
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

// ============================================================================
// TFS REST response models
// ============================================================================

/// The `{ "count": n, "value": [...] }` envelope used by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: Option<i32>,
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
}

impl IdentityRef {
    /// Best available human name.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.unique_name.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefinitionReference {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: i32,
    #[serde(default)]
    pub build_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub queue_time: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub finish_time: Option<String>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub source_version: Option<String>,
    #[serde(default)]
    pub definition: Option<BuildDefinitionReference>,
    #[serde(default)]
    pub requested_for: Option<IdentityRef>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResource {
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArtifact {
    #[serde(default)]
    pub id: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub resource: Option<ArtifactResource>,
}

/// Reference returned by `builds/{id}/workitems`; the id arrives as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemReference {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of a queue-build request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueBuildRequest {
    pub definition: DefinitionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
    /// JSON-encoded `{ name: value }` map, as the build service expects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DefinitionId {
    pub id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    pub changeset_id: i32,
    #[serde(default)]
    pub author: Option<IdentityRef>,
    #[serde(default)]
    pub checked_in_by: Option<IdentityRef>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub item: ChangeItem,
    #[serde(default)]
    pub change_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedWorkItem {
    pub id: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub work_item_type: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelvesetReference {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<IdentityRef>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i32,
    #[serde(default)]
    pub rev: Option<i32>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub url: Option<String>,
}

impl WorkItem {
    /// A field's value when it is a string.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.field_str("System.Title")
    }

    pub fn state(&self) -> Option<&str> {
        self.field_str("System.State")
    }
}

/// One JSON-patch operation for work item updates.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPatchOperation {
    pub op: &'static str,
    pub path: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProjectReference {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApiTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Team member entry.
///
/// Newer servers wrap the identity (`{ "identity": {...}, "isTeamAdmin": .. }`),
/// older ones return the identity itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TeamMemberEntry {
    Wrapped { identity: IdentityRef },
    Bare(IdentityRef),
}

impl From<TeamMemberEntry> for IdentityRef {
    fn from(entry: TeamMemberEntry) -> Self {
        match entry {
            TeamMemberEntry::Wrapped { identity } => identity,
            TeamMemberEntry::Bare(identity) => identity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShallowReference {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlan {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub iteration: Option<String>,
    #[serde(default)]
    pub root_suite: Option<ShallowReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub suite_type: Option<String>,
    #[serde(default)]
    pub test_case_count: Option<i32>,
    #[serde(default)]
    pub parent: Option<ShallowReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub total_tests: Option<i32>,
    #[serde(default)]
    pub passed_tests: Option<i32>,
    #[serde(default)]
    pub unanalyzed_tests: Option<i32>,
}
