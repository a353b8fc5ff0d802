use std::path::Path;
use std::sync::Arc;

use crate::agent::AgentController;
use crate::cli::{ActivityArgs, AnalyzeArgs, ApplyArgs, ConfigureArgs, PushArgs, StatusArgs, Verbosity};
use crate::commands::{
    ActivityCommand, AnalyzeCommand, ApplyCommand, ConfigureCommand, PushCommand, StatusCommand,
};
use crate::config::{ConfigProvider, MenderConfig};
use crate::detect::Detector;
use crate::errors::MenderError;
use crate::fixes::{AiFixProvider, ChatFixProvider, FixEngine};
use crate::host::GitHubHost;
use crate::output::OutputFormatter;

/// Core application that orchestrates the workflow of Mender
pub struct MenderApp<C, O>
where
    C: ConfigProvider,
    O: OutputFormatter + Clone,
{
    config_provider: C,
    output_formatter: O,
    verbosity: Verbosity,
}

impl<C, O> MenderApp<C, O>
where
    C: ConfigProvider,
    O: OutputFormatter + Clone,
{
    /// Create a new instance of MenderApp
    pub fn new(config_provider: C, output_formatter: O) -> Self {
        Self {
            config_provider,
            output_formatter,
            verbosity: Verbosity::default(),
        }
    }

    /// Set the verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Run the analyze command
    pub async fn analyze(&self, args: AnalyzeArgs) -> Result<(), MenderError> {
        let controller = self.build_controller()?;
        AnalyzeCommand::new(self.output_formatter.clone(), self.verbosity)
            .execute(args, &controller)
            .await
    }

    /// Run the apply command
    pub async fn apply(&self, args: ApplyArgs) -> Result<(), MenderError> {
        let controller = self.build_controller()?;
        ApplyCommand::new(self.output_formatter.clone(), self.verbosity)
            .execute(args, &controller)
            .await
    }

    /// Run the push command
    pub async fn push(&self, args: PushArgs) -> Result<(), MenderError> {
        let controller = self.build_controller()?;
        PushCommand::new(self.output_formatter.clone(), self.verbosity)
            .execute(args, &controller)
            .await
    }

    /// Run the status command
    pub fn status(&self, args: StatusArgs) -> Result<(), MenderError> {
        let controller = self.build_controller()?;
        StatusCommand::new(self.output_formatter.clone()).execute(args, &controller)
    }

    /// Run the activity command
    pub fn activity(&self, args: ActivityArgs) -> Result<(), MenderError> {
        let controller = self.build_controller()?;
        ActivityCommand::new(self.output_formatter.clone()).execute(args, &controller)
    }

    /// Run the configure command
    pub fn configure(&self, args: ConfigureArgs) -> Result<(), MenderError> {
        let controller = self.build_controller()?;
        ConfigureCommand::new(self.verbosity).execute(args, &controller)
    }

    // Helper methods

    /// Load configuration from the current directory's ancestry
    fn load_config(&self) -> Result<MenderConfig, MenderError> {
        self.config_provider.load_config(Path::new("."))
    }

    /// Assemble the agent controller from configuration
    fn build_controller(&self) -> Result<AgentController, MenderError> {
        let config = self.load_config()?;

        let host = Arc::new(GitHubHost::new(&config.host)?);
        let provider: Arc<dyn AiFixProvider> = Arc::new(ChatFixProvider::new(config.ai.clone()));
        let engine = FixEngine::new(Some(provider));

        AgentController::new(config.agent, Detector::new(), engine, host)
    }
}
