use chrono::prelude::*;
use eyre::{eyre, Result, WrapErr};
use serde::Serialize;
use std::convert::TryFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;
use termcolor::{ColorChoice, StandardStream, WriteColor};
use tracing_subscriber::EnvFilter;

mod aws;
mod config;
mod drift;
mod error;
mod events;
mod output;
mod paginate;
mod stack_status;
mod stacks;
mod template;
#[cfg(test)]
mod testing;
mod waiter;
mod writer;

use crate::aws::AwsCloudFormationClient;
use crate::config::{key_value_map, parse_key_value, parse_since_argument, Settings};
use crate::output::{OutputFormat, Tabular};
use crate::paginate::Listing;
use crate::stack_status::StackStatus;
use crate::stacks::StackManager;
use crate::waiter::{OperationKind, Waiter, WaiterConfig};

#[derive(StructOpt, Debug)]
#[structopt(about = "Manage CloudFormation stacks and follow their deploys")]
struct Opts {
    /// AWS region, defaults to the region of the current profile
    #[structopt(long, global = true)]
    region: Option<String>,

    /// AWS profile to load credentials from
    #[structopt(long, global = true)]
    profile: Option<String>,

    /// Output format: yaml, json or table
    #[structopt(short, long, default_value = "yaml", global = true)]
    output: OutputFormat,

    /// How often to poll for stack events while waiting
    #[structopt(long, default_value = "1s", parse(try_from_str = humantime::parse_duration), global = true)]
    poll_interval: Duration,

    /// Give up waiting on a stack operation after this long
    #[structopt(long, default_value = "1h", parse(try_from_str = humantime::parse_duration), global = true)]
    max_wait: Duration,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
struct TemplateArgs {
    /// Local template file
    #[structopt(short = "f", long, parse(from_os_str))]
    template_file: Option<PathBuf>,

    /// S3 url of the template, ignored if a file is given
    #[structopt(short = "u", long)]
    template_url: Option<String>,
}

impl TemplateArgs {
    fn body(&self) -> Result<String> {
        match &self.template_file {
            Some(path) => std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading template {}", path.display())),
            None => Ok(String::new()),
        }
    }

    fn url(&self) -> String {
        self.template_url.clone().unwrap_or_default()
    }
}

#[derive(StructOpt, Debug)]
struct StackArgs {
    name: String,

    #[structopt(flatten)]
    template: TemplateArgs,

    /// Stack parameter as KEY=VALUE
    #[structopt(long = "param", parse(try_from_str = parse_key_value))]
    params: Vec<(String, String)>,

    /// Stack tag as KEY=VALUE
    #[structopt(long = "tag", parse(try_from_str = parse_key_value))]
    tags: Vec<(String, String)>,

    /// Return as soon as the request is accepted
    #[structopt(long)]
    no_wait: bool,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// List stack summaries
    List {
        /// Only show stacks in this status
        #[structopt(long = "status")]
        status: Vec<String>,
    },
    /// Describe one stack, or all of them
    Get { name: Option<String> },
    /// Create a stack and follow its events
    Create(StackArgs),
    /// Update a stack and follow its events
    Update(StackArgs),
    /// Delete a stack and follow its events
    Delete {
        name: String,

        /// Logical id of a resource to keep
        #[structopt(long = "retain")]
        retain: Vec<String>,

        /// Return as soon as the request is accepted
        #[structopt(long)]
        no_wait: bool,
    },
    /// Validate a template
    Validate(TemplateArgs),
    /// Show the events of a stack
    Events {
        name: String,

        /// Only show events after this time
        #[structopt(short, long, parse(try_from_str = parse_since_argument))]
        since: Option<DateTime<Utc>>,
    },
    /// Show the resources of a stack
    Resources { name: String },
    /// Detect and inspect drift
    Drift(DriftCommand),
}

#[derive(StructOpt, Debug)]
enum DriftCommand {
    /// Start drift detection on a stack
    Detect {
        name: String,

        /// Limit detection to these logical resource ids
        #[structopt(long = "resource")]
        resources: Vec<String>,

        /// Wait for the detection to finish and show its result
        #[structopt(long)]
        wait: bool,
    },
    /// Show the status of a drift detection
    Status { id: String },
    /// Show per resource drift of a stack
    Resources {
        name: String,

        /// Only show resources with this drift status
        #[structopt(long = "status")]
        status: Vec<String>,
    },
}

fn print_listing<T, W>(out: &mut W, format: OutputFormat, listing: Listing<T>) -> Result<()>
where
    T: Serialize + Tabular,
    W: WriteColor,
{
    // show whatever was fetched before a failing page
    if listing.error.is_none() || !listing.items.is_empty() {
        output::print(&mut *out, format, &listing.items)?;
    }
    match listing.error {
        Some(e) => Err(e).wrap_err("fetching all pages"),
        None => Ok(()),
    }
}

async fn follow<C, W>(
    stacks: &StackManager<C>,
    config: WaiterConfig,
    out: &mut W,
    name: &str,
    kind: OperationKind,
) -> Result<()>
where
    C: AwsCloudFormationClient + 'static,
    W: WriteColor,
{
    let mut waiter = Waiter::new(config, Arc::clone(stacks.client()), &mut *out);
    waiter
        .poll_until_complete(name, kind)
        .await
        .wrap_err_with(|| format!("waiting for {} of stack {}", kind, name))?;

    if kind == OperationKind::Delete {
        tracing::info!(stack_name = %name, "stack deleted");
        return Ok(());
    }

    let stack = stacks
        .describe_stack(name)
        .await
        .wrap_err("describing stack")?;
    let failed = StackStatus::try_from(stack.stack_status.as_str())
        .map(|s| s.is_failed())
        .unwrap_or(false);
    if failed {
        return Err(eyre!(
            "stack {} finished in state {}",
            name,
            stack.stack_status
        ));
    }
    tracing::info!(stack_name = %name, status = %stack.stack_status, "stack finished");
    Ok(())
}

async fn run<C, W>(
    cmd: Command,
    settings: &Settings,
    format: OutputFormat,
    client: Arc<C>,
    out: &mut W,
) -> Result<()>
where
    C: AwsCloudFormationClient + 'static,
    W: WriteColor,
{
    let stacks = StackManager::new(client);

    match cmd {
        Command::List { status } => {
            let listing = stacks.list_stacks(&status).await;
            print_listing(out, format, listing)
        }
        Command::Get { name: Some(name) } => {
            if !stacks.exists(&name).await {
                return Err(eyre!("Failed to find stack {}", name));
            }
            let stack = stacks
                .describe_stack(&name)
                .await
                .wrap_err("describing stack")?;
            output::print(out, format, &[stack])
        }
        Command::Get { name: None } => {
            let listing = stacks.describe_stacks().await;
            print_listing(out, format, listing)
        }
        Command::Create(args) => {
            stacks
                .create_stack(
                    &args.name,
                    &key_value_map(&args.params),
                    key_value_map(&args.tags),
                    &args.template.body()?,
                    &args.template.url(),
                )
                .await
                .wrap_err("creating stack")?;
            if args.no_wait {
                return Ok(());
            }
            follow(&stacks, settings.waiter, out, &args.name, OperationKind::Create).await
        }
        Command::Update(args) => {
            stacks
                .update_stack(
                    &args.name,
                    &key_value_map(&args.params),
                    key_value_map(&args.tags),
                    &args.template.body()?,
                    &args.template.url(),
                )
                .await
                .wrap_err("updating stack")?;
            if args.no_wait {
                return Ok(());
            }
            follow(&stacks, settings.waiter, out, &args.name, OperationKind::Update).await
        }
        Command::Delete {
            name,
            retain,
            no_wait,
        } => {
            stacks
                .delete_stack(&name, &retain)
                .await
                .wrap_err("deleting stack")?;
            if no_wait {
                return Ok(());
            }
            follow(&stacks, settings.waiter, out, &name, OperationKind::Delete).await
        }
        Command::Validate(args) => {
            let validated =
                template::validate_template(stacks.client().as_ref(), &args.body()?, &args.url())
                    .await
                    .wrap_err("validating template")?;
            output::print(out, format, &[validated.summary])
        }
        Command::Events { name, since } => {
            let events = events::fetch_events(stacks.client().as_ref(), &name, since)
                .await
                .wrap_err("fetching stack events")?;
            output::print(out, format, &events)
        }
        Command::Resources { name } => {
            let resources = stacks
                .stack_resources(&name)
                .await
                .wrap_err("fetching stack resources")?;
            output::print(out, format, &resources)
        }
        Command::Drift(DriftCommand::Detect {
            name,
            resources,
            wait,
        }) => {
            if !stacks.exists(&name).await {
                return Err(eyre!("Failed to find stack {}", name));
            }
            let id = stacks
                .detect_drift(&name, &resources)
                .await
                .wrap_err("starting drift detection")?;
            if !wait {
                writeln!(out, "{}", id).wrap_err("printing detection id")?;
                return Ok(());
            }
            let status = stacks
                .wait_for_drift_detection(&id, settings.waiter.poll_interval)
                .await
                .wrap_err("waiting for drift detection")?;
            output::print(out, format, &[status])
        }
        Command::Drift(DriftCommand::Status { id }) => {
            let status = stacks
                .drift_status(&id)
                .await
                .wrap_err("fetching drift detection status")?;
            output::print(out, format, &[status])
        }
        Command::Drift(DriftCommand::Resources { name, status }) => {
            let drifts = stacks
                .describe_resource_drifts(&name, &status)
                .await
                .wrap_err("fetching resource drifts")?;
            output::print(out, format, &drifts)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    color_eyre::install()?;

    let opts = Opts::from_args();
    let settings = Settings {
        region: opts.region,
        profile: opts.profile,
        waiter: WaiterConfig {
            poll_interval: opts.poll_interval,
            max_wait: opts.max_wait,
        },
    };
    tracing::info!(command = ?opts.cmd, "running command");

    let client = Arc::new(settings.cloudformation_client().await);
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    run(opts.cmd, &settings, opts.output, client, &mut stdout).await
}
