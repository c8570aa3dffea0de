// FILE: src/cli/config.rs

use crate::error::{CompilerError, Result};
use crate::CompilerOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub debug_mode: Option<bool>,
    pub component_root: Option<String>,
    pub template_extension: Option<String>,
    pub snake_case_names: Option<bool>,
    pub check_components: Option<bool>,
    pub template_dirs: Option<Vec<PathBuf>>,
    pub output_directory: Option<String>,
}

impl ConfigFile {
    pub fn apply(&self, options: &mut CompilerOptions) {
        if let Some(debug_mode) = self.debug_mode {
            options.debug_mode = debug_mode;
        }
        if let Some(root) = &self.component_root {
            options.component_root = root.clone();
        }
        if let Some(extension) = &self.template_extension {
            options.template_extension = extension.clone();
        }
        if let Some(snake_case) = self.snake_case_names {
            options.snake_case_names = snake_case;
        }
        if let Some(check) = self.check_components {
            options.check_components = check;
        }
        if let Some(dirs) = &self.template_dirs {
            options.template_dirs.extend(dirs.iter().cloned());
        }
    }
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| CompilerError::InvalidFormat {
        message: format!("Config file {}: {}", config_path, e),
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })
    } else {
        Err(CompilerError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        })
    }?;
    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}
