use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use serde_json::Value;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, error};

use tfs_tools::{
    Config, TfsClient, logging,
    models::{
        Args, BuildCommand, ChangesetCommand, Commands, DefinitionCommand, ShelvesetCommand,
        TestCommand, WorkItemCommand,
    },
    output::OutputWriter,
    wait::wait_for_build,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Logging flags are read before clap so config resolution is traced too.
    let raw_args: Vec<String> = std::env::args().collect();
    let _log_guard = logging::init_logging(logging::parse_early_log_config(&raw_args));

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    // Handle --create-config flag
    if args.create_config {
        let path = Config::create_sample_config()?;
        println!("Sample config at {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = args.command.clone() else {
        Args::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = args.resolve_config()?;
    debug!(?config, "Resolved configuration");
    let client = TfsClient::with_settings(config.connection_settings())?;

    let stdout = io::stdout();
    let mut out = OutputWriter::new(stdout.lock(), args.shared.output);

    let code = match command {
        Commands::Wait(wait) => {
            let mut write_error = None;
            let summary =
                wait_for_build(&client, &wait.build_id, config.wait_options(), |event| {
                    if let Err(e) = out.write_wait_event(event) {
                        write_error.get_or_insert(e);
                    }
                })
                .await;
            if let Some(e) = write_error {
                return Err(e).context("Failed to write wait progress");
            }
            ExitCode::from(summary.outcome.exit_code())
        }
        Commands::Build(cmd) => {
            run_build(&client, &mut out, cmd).await?;
            ExitCode::SUCCESS
        }
        Commands::Definitions(cmd) => {
            run_definitions(&client, &mut out, cmd).await?;
            ExitCode::SUCCESS
        }
        Commands::Changeset(cmd) => {
            run_changeset(&client, &mut out, cmd).await?;
            ExitCode::SUCCESS
        }
        Commands::Shelveset(cmd) => {
            run_shelveset(&client, &mut out, cmd).await?;
            ExitCode::SUCCESS
        }
        Commands::WorkItem(cmd) => {
            run_work_item(&client, &mut out, cmd).await?;
            ExitCode::SUCCESS
        }
        Commands::Projects => {
            let projects = client
                .get_projects()
                .await
                .context("Failed to list projects")?;
            out.write_list(&projects)?;
            ExitCode::SUCCESS
        }
        Commands::Teams => {
            let teams = client.get_teams().await.context("Failed to list teams")?;
            out.write_list(&teams)?;
            ExitCode::SUCCESS
        }
        Commands::TeamMembers { team } => {
            let members = client
                .get_team_members(&team)
                .await
                .with_context(|| format!("Failed to list members of team '{}'", team))?;
            out.write_list(&members)?;
            ExitCode::SUCCESS
        }
        Commands::Test(cmd) => {
            run_test(&client, &mut out, cmd).await?;
            ExitCode::SUCCESS
        }
    };

    out.flush()?;
    Ok(code)
}

async fn run_build<W: Write>(
    client: &TfsClient,
    out: &mut OutputWriter<W>,
    command: BuildCommand,
) -> Result<()> {
    match command {
        BuildCommand::Get { id } => {
            let build = client
                .get_build(&id)
                .await
                .with_context(|| format!("Failed to fetch build {}", id))?;
            out.write_record(&build)?;
        }
        BuildCommand::Status { id } => {
            let status = client
                .get_build_status(&id)
                .await
                .with_context(|| format!("Failed to fetch status of build {}", id))?;
            out.write_scalar(Some(status.as_str()))?;
        }
        BuildCommand::Result { id } => {
            let result = client
                .get_build_result(&id)
                .await
                .with_context(|| format!("Failed to fetch result of build {}", id))?;
            out.write_scalar(result.as_deref())?;
        }
        BuildCommand::Number { id } => {
            let number = client
                .get_build_number(&id)
                .await
                .with_context(|| format!("Failed to fetch number of build {}", id))?;
            out.write_scalar(Some(number.as_str()))?;
        }
        BuildCommand::Latest { definition_id } => {
            let build = client
                .get_latest_build(definition_id)
                .await
                .with_context(|| {
                    format!("Failed to query builds of definition {}", definition_id)
                })?;
            match build {
                Some(build) => out.write_record(&build)?,
                None => bail!("Definition {} has no finished builds", definition_id),
            }
        }
        BuildCommand::Queue {
            definition_id,
            source_branch,
            parameters,
        } => {
            let build = client
                .queue_build(definition_id, source_branch.as_deref(), &parameters)
                .await
                .with_context(|| format!("Failed to queue definition {}", definition_id))?;
            out.write_record(&build)?;
        }
        BuildCommand::Artifacts { id } => {
            let artifacts = client
                .get_build_artifacts(&id)
                .await
                .with_context(|| format!("Failed to list artifacts of build {}", id))?;
            out.write_list(&artifacts)?;
        }
        BuildCommand::WorkItems { id } => {
            let ids = client
                .get_build_work_item_ids(&id)
                .await
                .with_context(|| format!("Failed to list work items of build {}", id))?;
            out.write_list(&ids)?;
        }
    }
    Ok(())
}

async fn run_definitions<W: Write>(
    client: &TfsClient,
    out: &mut OutputWriter<W>,
    command: DefinitionCommand,
) -> Result<()> {
    match command {
        DefinitionCommand::List => {
            let definitions = client
                .get_build_definitions()
                .await
                .context("Failed to list build definitions")?;
            out.write_list(&definitions)?;
        }
        DefinitionCommand::Id { name } => {
            let id = client
                .get_build_definition_id(&name)
                .await
                .with_context(|| format!("Failed to look up definition '{}'", name))?;
            match id {
                Some(id) => out.write_scalar(Some(&id))?,
                None => bail!("No build definition named '{}'", name),
            }
        }
    }
    Ok(())
}

async fn run_changeset<W: Write>(
    client: &TfsClient,
    out: &mut OutputWriter<W>,
    command: ChangesetCommand,
) -> Result<()> {
    match command {
        ChangesetCommand::Get { id } => {
            let changeset = client
                .get_changeset(id)
                .await
                .with_context(|| format!("Failed to fetch changeset {}", id))?;
            out.write_record(&changeset)?;
        }
        ChangesetCommand::Comment { id } => {
            let comment = client
                .get_changeset_comment(id)
                .await
                .with_context(|| format!("Failed to fetch changeset {}", id))?;
            out.write_scalar(comment.as_deref())?;
        }
        ChangesetCommand::Changes { id } => {
            let changes = client
                .get_changeset_changes(id)
                .await
                .with_context(|| format!("Failed to list changes of changeset {}", id))?;
            out.write_list(&changes)?;
        }
        ChangesetCommand::WorkItems { id } => {
            let items = client
                .get_changeset_work_items(id)
                .await
                .with_context(|| format!("Failed to list work items of changeset {}", id))?;
            out.write_list(&items)?;
        }
        ChangesetCommand::Latest { item_path } => {
            let changeset = client
                .get_latest_changeset(&item_path)
                .await
                .with_context(|| format!("Failed to query changesets under {}", item_path))?;
            match changeset {
                Some(changeset) => out.write_record(&changeset)?,
                None => bail!("No changesets under {}", item_path),
            }
        }
    }
    Ok(())
}

async fn run_shelveset<W: Write>(
    client: &TfsClient,
    out: &mut OutputWriter<W>,
    command: ShelvesetCommand,
) -> Result<()> {
    match command {
        ShelvesetCommand::List { owner } => {
            let shelvesets = client
                .get_shelvesets(owner.as_deref())
                .await
                .context("Failed to list shelvesets")?;
            out.write_list(&shelvesets)?;
        }
        ShelvesetCommand::Get { name, owner } => {
            let shelveset = client
                .get_shelveset(&name, &owner)
                .await
                .with_context(|| format!("Failed to fetch shelveset {};{}", name, owner))?;
            out.write_record(&shelveset)?;
        }
        ShelvesetCommand::Changes { name, owner } => {
            let changes = client
                .get_shelveset_changes(&name, &owner)
                .await
                .with_context(|| {
                    format!("Failed to list changes of shelveset {};{}", name, owner)
                })?;
            out.write_list(&changes)?;
        }
    }
    Ok(())
}

async fn run_work_item<W: Write>(
    client: &TfsClient,
    out: &mut OutputWriter<W>,
    command: WorkItemCommand,
) -> Result<()> {
    match command {
        WorkItemCommand::Get { id } => {
            let item = client
                .get_work_item(id)
                .await
                .with_context(|| format!("Failed to fetch work item {}", id))?;
            out.write_record(&item)?;
        }
        WorkItemCommand::Title { id } => {
            let title = client
                .get_work_item_title(id)
                .await
                .with_context(|| format!("Failed to fetch work item {}", id))?;
            out.write_scalar(title.as_deref())?;
        }
        WorkItemCommand::State { id } => {
            let state = client
                .get_work_item_state(id)
                .await
                .with_context(|| format!("Failed to fetch work item {}", id))?;
            out.write_scalar(state.as_deref())?;
        }
        WorkItemCommand::SetState { id, state } => {
            let item = client
                .update_work_item_state(id, &state)
                .await
                .with_context(|| format!("Failed to set state of work item {}", id))?;
            out.write_record(&item)?;
        }
        WorkItemCommand::SetField { id, field, value } => {
            let item = client
                .update_work_item_field(id, &field, field_value(&value))
                .await
                .with_context(|| format!("Failed to set {} on work item {}", field, id))?;
            out.write_record(&item)?;
        }
    }
    Ok(())
}

async fn run_test<W: Write>(
    client: &TfsClient,
    out: &mut OutputWriter<W>,
    command: TestCommand,
) -> Result<()> {
    match command {
        TestCommand::Plans => {
            let plans = client
                .get_test_plans()
                .await
                .context("Failed to list test plans")?;
            out.write_list(&plans)?;
        }
        TestCommand::Plan { id } => {
            let plan = client
                .get_test_plan(id)
                .await
                .with_context(|| format!("Failed to fetch test plan {}", id))?;
            out.write_record(&plan)?;
        }
        TestCommand::Suites { plan_id } => {
            let suites = client
                .get_test_suites(plan_id)
                .await
                .with_context(|| format!("Failed to list suites of test plan {}", plan_id))?;
            out.write_list(&suites)?;
        }
        TestCommand::Runs { build_id } => {
            let runs = client
                .get_test_runs_for_build(build_id)
                .await
                .with_context(|| format!("Failed to list test runs of build {}", build_id))?;
            out.write_list(&runs)?;
        }
    }
    Ok(())
}

/// Values that parse as JSON (numbers, booleans, quoted strings) are sent
/// as-is; anything else is sent as a string.
fn field_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
