//! Config command handlers

use crate::cli::run::load_config;
use crate::cli::{ConfigInitArgs, ConfigValidateArgs};
use crate::policy::ThresholdPolicy;
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../costgate.example.toml");

/// Handle `costgate config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Set budget.subscription_id and the media server address, then run `costgate run --dry-run`.");

    Ok(())
}

/// Handle `costgate config validate` command
///
/// Returns a summary of the effective tier table on success.
pub fn handle_config_validate(
    args: &ConfigValidateArgs,
) -> Result<String, Box<dyn std::error::Error>> {
    if !args.config.exists() {
        return Err(format!("Config file not found: {}", args.config.display()).into());
    }

    let config = load_config(&args.config)?;
    config.validate()?;
    let policy = ThresholdPolicy::from_config(&config.policy, &config.budget)?;

    let mut summary = format!("✓ {} is valid\n", args.config.display());
    let mut lower = 0.0;
    for tier in policy.tiers() {
        summary.push_str(&format!(
            "  {:>5.1}% - {:>5.1}%  {:<10} {} bps\n",
            lower, tier.max_percent, tier.name, tier.bitrate_bps
        ));
        lower = tier.max_percent;
    }
    summary.push_str(&format!(
        "  above {:>5.1}%     {:<10} remote streaming disabled",
        lower,
        policy.most_restrictive().name
    ));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CostgateConfig;

    #[test]
    fn test_config_init_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("costgate.toml");

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: false,
        };

        handle_config_init(&args).unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("[budget]"));
        assert!(CostgateConfig::load(Some(&output_path)).is_ok());
    }

    #[test]
    fn test_config_init_no_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("costgate.toml");
        std::fs::write(&output_path, "existing").unwrap();

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: false,
        };

        assert!(handle_config_init(&args).is_err());
        let content = std::fs::read_to_string(&output_path).unwrap();
        assert_eq!(content, "existing");
    }

    #[test]
    fn test_config_init_force_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("costgate.toml");
        std::fs::write(&output_path, "old content").unwrap();

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: true,
        };

        handle_config_init(&args).unwrap();
        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("[budget]"));
    }

    #[test]
    fn test_config_validate_example() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("costgate.toml");
        std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

        let summary = handle_config_validate(&ConfigValidateArgs { config: path }).unwrap();
        assert!(summary.contains("high"));
        assert!(summary.contains("disabled"));
    }

    #[test]
    fn test_config_validate_rejects_descending_tiers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("costgate.toml");
        std::fs::write(
            &path,
            r#"
[[policy.tiers]]
name = "high"
max_percent = 90.0
bitrate_bps = 4000000

[[policy.tiers]]
name = "low"
max_percent = 50.0
bitrate_bps = 1000000
"#,
        )
        .unwrap();

        let err = handle_config_validate(&ConfigValidateArgs { config: path }).unwrap_err();
        assert!(err.to_string().contains("policy.tiers[1]"));
    }

    #[test]
    fn test_config_validate_missing_file() {
        let args = ConfigValidateArgs {
            config: "/nonexistent/costgate.toml".into(),
        };
        assert!(handle_config_validate(&args).is_err());
    }
}
