//! Policy command implementation

use crate::output::OutputFormatter;
use anyhow::Result;
use intake_core::PolicyConfig;

pub fn execute(config: &PolicyConfig, formatter: &dyn OutputFormatter) -> Result<()> {
    formatter.format_policy(config)
}
