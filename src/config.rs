use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".ngbuildrc.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root module of the application; the synthesized bootstrap registers
    /// this module. Required.
    pub app_module: String,
    /// Entry-point files of the build. Required, one or more.
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Files ingested but never analyzed for dependencies.
    #[serde(default)]
    pub parse_exclude: Vec<String>,
    /// Files always pulled into the closure, analyzed.
    #[serde(default)]
    pub required_files: Vec<String>,
    /// Library files always pulled into the closure, unparsed.
    #[serde(default)]
    pub required_libs: Vec<String>,
    /// Template references matching these patterns are never resolved.
    #[serde(default)]
    pub ignored_templates: Vec<String>,
    /// Optional-library marker files; requiring one pulls in the include
    /// tree below.
    #[serde(default)]
    pub optional_libs: Vec<String>,
    /// Glob selecting an optional library's include files.
    #[serde(default = "default_optional_libs_include")]
    pub optional_libs_include: String,
    /// Modules assumed pre-existing; excluded from aggregation and prepended
    /// to the bootstrap dependency list.
    #[serde(default)]
    pub global_modules: Vec<String>,
    /// Dependency names satisfied outside the build; missing-dependency
    /// checks accept them silently.
    #[serde(default)]
    pub global_dependencies: Vec<String>,
    /// Base-name patterns deciding output order; unmatched files sort last.
    #[serde(default)]
    pub file_priority: Vec<String>,
    /// Files whose unresolved dependencies warn instead of failing.
    #[serde(default)]
    pub files_with_resolved_deps: Vec<String>,

    /// Directory the CLI scans for candidate files.
    #[serde(default = "default_source_root")]
    pub source_root: String,
    /// Patterns selecting which files get streamed into the graph.
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,

    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub debug: bool,
}

fn default_optional_libs_include() -> String {
    "includes/*".to_string()
}

fn default_source_root() -> String {
    "./".to_string()
}

fn default_includes() -> Vec<String> {
    ["**/*.js", "**/*.html", "**/*.htm", "**/*.ejs"]
        .map(String::from)
        .to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_module: "app".to_string(),
            seeds: vec!["app.js".to_string()],
            parse_exclude: Vec::new(),
            required_files: Vec::new(),
            required_libs: Vec::new(),
            ignored_templates: Vec::new(),
            optional_libs: Vec::new(),
            optional_libs_include: default_optional_libs_include(),
            global_modules: Vec::new(),
            global_dependencies: Vec::new(),
            file_priority: Vec::new(),
            files_with_resolved_deps: Vec::new(),
            source_root: default_source_root(),
            includes: default_includes(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Returns an error if `appModule` or `seeds` is missing, or if any
    /// pattern list contains an invalid glob.
    pub fn validate(&self) -> Result<()> {
        if self.app_module.is_empty() {
            anyhow::bail!("'appModule' is missing");
        }
        if self.seeds.is_empty() {
            anyhow::bail!("'seeds' should name at least one entry-point file");
        }

        let pattern_lists: [(&str, &[String]); 7] = [
            ("parseExclude", &self.parse_exclude),
            ("requiredFiles", &self.required_files),
            ("requiredLibs", &self.required_libs),
            ("ignoredTemplates", &self.ignored_templates),
            ("optionalLibs", &self.optional_libs),
            ("filesWithResolvedDeps", &self.files_with_resolved_deps),
            ("includes", &self.includes),
        ];
        for (field, patterns) in pattern_lists {
            for pattern in patterns {
                Pattern::new(pattern)
                    .with_context(|| format!("Invalid glob pattern in '{field}': \"{pattern}\""))?;
            }
        }
        Pattern::new(&self.optional_libs_include).with_context(|| {
            format!(
                "Invalid glob pattern in 'optionalLibsInclude': \"{}\"",
                self.optional_libs_include
            )
        })?;

        Ok(())
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.optional_libs_include, "includes/*");
        assert!(config.includes.contains(&"**/*.js".to_string()));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_requires_app_module_and_seeds() {
        let config = Config {
            app_module: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            seeds: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_patterns() {
        let config = Config {
            parse_exclude: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_camel_case_round_trip() {
        let json = r#"{ "appModule": "shop", "seeds": ["src/main.js"], "optionalLibsInclude": "parts/*" }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.app_module, "shop");
        assert_eq!(config.optional_libs_include, "parts/*");
        config.validate().unwrap();
    }
}
