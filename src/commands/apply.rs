use crate::agent::AgentController;
use crate::apply::FixSelection;
use crate::cli::{ApplyArgs, Verbosity};
use crate::errors::MenderError;
use crate::output::{JsonFormatter, OutputFormatter};

/// Command handler for the apply command
pub struct ApplyCommand<O>
where
    O: OutputFormatter + Clone,
{
    output_formatter: O,
    verbosity: Verbosity,
}

impl<O> ApplyCommand<O>
where
    O: OutputFormatter + Clone,
{
    /// Create a new apply command handler
    pub fn new(output_formatter: O, verbosity: Verbosity) -> Self {
        Self {
            output_formatter,
            verbosity,
        }
    }

    /// Execute the apply command
    pub async fn execute(
        &self,
        args: ApplyArgs,
        controller: &AgentController,
    ) -> Result<(), MenderError> {
        let selection = if args.high_confidence {
            FixSelection::HighConfidence
        } else if !args.lines.is_empty() {
            FixSelection::Lines(args.lines.clone())
        } else {
            // Nothing explicitly selected; high-confidence is the safe default
            if self.verbosity >= Verbosity::Normal && args.format != "json" {
                println!("No fixes selected; applying high-confidence fixes");
            }
            FixSelection::HighConfidence
        };

        if self.verbosity >= Verbosity::Normal && args.format != "json" {
            println!(
                "🔧 Applying fixes to {} in {} @ {}...",
                args.path, args.repo, args.branch
            );
        }

        let report = controller
            .apply_fixes(&args.repo, &args.branch, &args.path, &selection)
            .await?;

        if args.format == "json" {
            println!("{}", JsonFormatter::new().format_apply(&report));
        } else {
            println!("{}", self.output_formatter.format_apply(&report));
        }

        Ok(())
    }
}
