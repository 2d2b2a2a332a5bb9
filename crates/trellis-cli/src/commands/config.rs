//! `trellis config`: inspect the merged configuration.

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

pub fn execute(cmd: ConfigCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => match config.get(&key) {
            Some(value) => output.print(&value)?,
            None => {
                return Err(CliError::ConfigError {
                    message: format!("Unknown config key: '{key}'"),
                    source: None,
                });
            }
        },
        ConfigCommands::List if output.is_json() => output.json(&config)?,
        ConfigCommands::List => {
            output.header("Effective configuration")?;
            output.print(render_toml(&config)?.trim_end())?;
        }
        ConfigCommands::Path => output.print(&AppConfig::config_path().display().to_string())?,
    }
    Ok(())
}

fn render_toml(config: &AppConfig) -> CliResult<String> {
    toml::to_string_pretty(config).map_err(|e| CliError::ConfigError {
        message: format!("cannot render settings as TOML: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_as_toml_sections() {
        let text = render_toml(&AppConfig::default()).unwrap();
        for section in ["[engine]", "[output]", "[defaults]"] {
            assert!(text.contains(section), "{section} missing from\n{text}");
        }
        assert!(text.contains("max_depth = 64"));
        // Unset optionals are omitted rather than written as empty strings.
        assert!(!text.contains("project_name"));
    }
}
