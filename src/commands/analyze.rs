use crate::agent::AgentController;
use crate::cli::{AnalyzeArgs, Verbosity};
use crate::errors::MenderError;
use crate::output::{JsonFormatter, OutputFormatter};

/// Command handler for the analyze command
pub struct AnalyzeCommand<O>
where
    O: OutputFormatter + Clone,
{
    output_formatter: O,
    verbosity: Verbosity,
}

impl<O> AnalyzeCommand<O>
where
    O: OutputFormatter + Clone,
{
    /// Create a new analyze command handler
    pub fn new(output_formatter: O, verbosity: Verbosity) -> Self {
        Self {
            output_formatter,
            verbosity,
        }
    }

    /// Execute the analyze command
    pub async fn execute(
        &self,
        args: AnalyzeArgs,
        controller: &AgentController,
    ) -> Result<(), MenderError> {
        if self.verbosity >= Verbosity::Normal && args.format != "json" {
            println!("🔍 Analyzing {} @ {}...", args.repo, args.branch);
        }

        let result = controller.analyze(&args.repo, &args.branch).await?;

        if args.format == "json" {
            println!("{}", JsonFormatter::new().format_analysis(&result));
        } else {
            println!("{}", self.output_formatter.format_analysis(&result));
        }

        Ok(())
    }
}
