use std::collections::BTreeSet;

use crate::agent::{AgentController, PushEvent};
use crate::cli::{ActivityArgs, ConfigureArgs, PushArgs, StatusArgs, Verbosity};
use crate::config::AgentConfigUpdate;
use crate::errors::MenderError;
use crate::output::{JsonFormatter, OutputFormatter};

/// Command handler for replaying push events
pub struct PushCommand<O>
where
    O: OutputFormatter + Clone,
{
    output_formatter: O,
    verbosity: Verbosity,
}

impl<O> PushCommand<O>
where
    O: OutputFormatter + Clone,
{
    pub fn new(output_formatter: O, verbosity: Verbosity) -> Self {
        Self {
            output_formatter,
            verbosity,
        }
    }

    /// Execute the push command
    pub async fn execute(
        &self,
        args: PushArgs,
        controller: &AgentController,
    ) -> Result<(), MenderError> {
        let payload = std::fs::read_to_string(&args.payload)?;
        let event: PushEvent = serde_json::from_str(&payload)
            .map_err(|err| MenderError::Payload(err.to_string()))?;

        if self.verbosity >= Verbosity::Normal && args.format != "json" {
            println!(
                "📨 Handling push to {} ({})...",
                event.repository.full_name, event.git_ref
            );
        }

        let outcome = controller.handle_push(&event).await?;

        if args.format == "json" {
            println!("{}", JsonFormatter::new().format_push(&outcome));
        } else {
            println!("{}", self.output_formatter.format_push(&outcome));
        }

        Ok(())
    }
}

/// Command handler for the status command
pub struct StatusCommand<O>
where
    O: OutputFormatter + Clone,
{
    output_formatter: O,
}

impl<O> StatusCommand<O>
where
    O: OutputFormatter + Clone,
{
    pub fn new(output_formatter: O) -> Self {
        Self { output_formatter }
    }

    /// Execute the status command
    pub fn execute(&self, args: StatusArgs, controller: &AgentController) -> Result<(), MenderError> {
        let status = controller.status();

        if args.format == "json" {
            println!("{}", JsonFormatter::new().format_status(&status));
        } else {
            println!("{}", self.output_formatter.format_status(&status));
        }

        Ok(())
    }
}

/// Command handler for the activity command
pub struct ActivityCommand<O>
where
    O: OutputFormatter + Clone,
{
    output_formatter: O,
}

impl<O> ActivityCommand<O>
where
    O: OutputFormatter + Clone,
{
    pub fn new(output_formatter: O) -> Self {
        Self { output_formatter }
    }

    /// Execute the activity command
    pub fn execute(
        &self,
        args: ActivityArgs,
        controller: &AgentController,
    ) -> Result<(), MenderError> {
        let entries = controller.activity(args.limit);

        if args.format == "json" {
            println!("{}", JsonFormatter::new().format_activity(&entries));
        } else {
            println!("{}", self.output_formatter.format_activity(&entries));
        }

        Ok(())
    }
}

/// Command handler for the configure command
pub struct ConfigureCommand {
    verbosity: Verbosity,
}

impl ConfigureCommand {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Execute the configure command
    pub fn execute(
        &self,
        args: ConfigureArgs,
        controller: &AgentController,
    ) -> Result<(), MenderError> {
        let update = AgentConfigUpdate {
            agent_mode: args.mode,
            auto_commit: args.auto_commit,
            max_files: args.max_files,
            excluded_files: non_empty(args.exclude_files),
            excluded_extensions: non_empty(args.exclude_extensions),
        };

        if update.is_empty() {
            println!("Nothing to change; pass --mode, --auto-commit, --max-files, --exclude-file, or --exclude-extension");
            return Ok(());
        }

        let config = controller.configure(update)?;

        if self.verbosity >= Verbosity::Normal {
            println!("⚙️ Agent configuration updated:");
            println!(
                "{}",
                serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string())
            );
        }

        Ok(())
    }
}

fn non_empty(values: Vec<String>) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.into_iter().collect())
    }
}
