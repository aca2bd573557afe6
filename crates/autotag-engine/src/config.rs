//! Engine configuration.
//!
//! Everything is optional in the TOML file; missing fields and missing
//! sections fall back to the defaults below, which match the live page as of
//! this writing. The selectors live in config because the page's hashed CSS
//! class names churn between deployments.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Top level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSection,
    pub page: PageSection,
    pub run: RunConfig,
    pub wait: WaitConfig,
}

impl Config {
    /// Load configuration from a TOML file, expanding `${VAR}` references
    /// from the environment.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a TOML string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(placeholder, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarNotSet(var_name.to_string()));
                }
            }
        }

        Ok(result)
    }
}

/// How to reach (or launch) the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// DevTools port Chrome listens on.
    pub debug_port: u16,
    /// Profile directory for a launched Chrome. Defaults next to the log dir.
    pub profile_dir: Option<String>,
    /// Launch Chrome headless.
    pub headless: bool,
    /// Explicit Chrome binary, overriding platform detection.
    pub chrome_binary: Option<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            profile_dir: None,
            headless: false,
            chrome_binary: None,
        }
    }
}

/// Which page to work on and how to find things in it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageSection {
    /// Substring a tab URL must contain to count as the draft page.
    pub draft_url_fragment: String,
    /// URL opened in a new tab when no matching tab exists.
    pub open_url: Option<String>,
    pub selectors: Selectors,
}

impl Default for PageSection {
    fn default() -> Self {
        Self {
            draft_url_fragment: "/icon/draft/".to_string(),
            open_url: None,
            selectors: Selectors::default(),
        }
    }
}

/// CSS selectors for the draft page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// One draft item card.
    pub item: String,
    /// Tag list container inside a card.
    pub tag_container: String,
    /// One committed tag chip.
    pub tag_chip: String,
    /// Class marking the "add new" pseudo chip, excluded from counts.
    pub add_new_class: String,
    /// Suggestion panel inside a card.
    pub suggestion_panel: String,
    /// One clickable suggestion entry inside the panel.
    pub suggestion_entry: String,
    /// The accept-all button inside the panel.
    pub accept_all: String,
    /// Free text tag input inside the tag container.
    pub tag_input: String,
    /// Title input inside a card.
    pub title_input: String,
    /// Attribute set on a card once it has been processed.
    pub processed_attr: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            item: ".card_8BZOE".to_string(),
            tag_container: "[id^=\"tags-\"]".to_string(),
            tag_chip: "ul.list-unstyled li.font-size-sm".to_string(),
            add_new_class: "addNew_okcFC".to_string(),
            suggestion_panel: ".suggestedTags_bXHhf".to_string(),
            suggestion_entry: "ul li.font-size-sm".to_string(),
            accept_all: ".addToTag_AT1GT".to_string(),
            tag_input: "input[type=\"text\"]".to_string(),
            title_input: "input[name^=\"title-\"], input[id^=\"title-\"]".to_string(),
            processed_attr: "data-autotag-done".to_string(),
        }
    }
}

/// Limits and switches for a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Items processed concurrently per group.
    pub concurrency: usize,
    /// Only use the accept-all button; skip per-entry clicking and typing.
    pub bulk_only: bool,
    /// Retry rounds per item after the first pass.
    pub bulk_attempts: u32,
    /// Target tag count per item.
    pub max_tags: usize,
    /// Cap on per-entry suggestion clicks in one round.
    pub max_individual_clicks: usize,
    /// Cap on chip removals while trimming overflow.
    pub max_trim_attempts: u32,
    /// Keywords seeded per retry round.
    pub max_seed_keywords: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            bulk_only: true,
            bulk_attempts: 4,
            max_tags: 10,
            max_individual_clicks: 15,
            max_trim_attempts: 25,
            max_seed_keywords: 3,
        }
    }
}

/// Timeouts, poll intervals and settle pauses, all in milliseconds.
///
/// The settle pauses exist because the page mutates asynchronously after
/// each action; counting tags immediately after a click reads the old state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub page_ready_timeout_ms: u64,
    pub page_poll_ms: u64,
    pub suggestion_timeout_ms: u64,
    pub suggestion_poll_ms: u64,
    pub bulk_settle_ms: u64,
    pub seed_settle_ms: u64,
    pub seed_pace_ms: u64,
    pub click_pace_ms: u64,
    pub individual_settle_ms: u64,
    pub entry_pace_ms: u64,
    pub entry_settle_ms: u64,
    pub verify_settle_ms: u64,
    pub trim_pace_ms: u64,
    pub trim_settle_ms: u64,
    pub group_pause_ms: u64,
    pub rearm_cooldown_ms: u64,
    pub preload: PreloadConfig,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            page_ready_timeout_ms: 40_000,
            page_poll_ms: 500,
            suggestion_timeout_ms: 6_000,
            suggestion_poll_ms: 250,
            bulk_settle_ms: 1_400,
            seed_settle_ms: 2_500,
            seed_pace_ms: 500,
            click_pace_ms: 120,
            individual_settle_ms: 1_200,
            entry_pace_ms: 220,
            entry_settle_ms: 800,
            verify_settle_ms: 800,
            trim_pace_ms: 120,
            trim_settle_ms: 400,
            group_pause_ms: 800,
            rearm_cooldown_ms: 15_000,
            preload: PreloadConfig::default(),
        }
    }
}

/// Scroll preload tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Hard cap on the scroll-down phase.
    pub max_duration_ms: u64,
    /// Pause between scroll steps.
    pub pause_ms: u64,
    /// Consecutive stable height samples that end the scroll-down phase.
    pub stable_cycles: u32,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: 8_000,
            pause_ms: 25,
            stable_cycles: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_from_empty_input() {
        let config = Config::load_str("").unwrap();
        assert_eq!(config.browser.debug_port, 9222);
        assert_eq!(config.page.draft_url_fragment, "/icon/draft/");
        assert_eq!(config.run.concurrency, 8);
        assert_eq!(config.run.max_tags, 10);
        assert!(config.run.bulk_only);
        assert_eq!(config.wait.page_ready_timeout_ms, 40_000);
        assert_eq!(config.wait.preload.stable_cycles, 2);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::load_str(
            r#"
[run]
concurrency = 2
bulk_only = false
"#,
        )
        .unwrap();
        assert_eq!(config.run.concurrency, 2);
        assert!(!config.run.bulk_only);
        assert_eq!(config.run.max_tags, 10);
        assert_eq!(config.run.bulk_attempts, 4);
    }

    #[test]
    fn selectors_can_be_overridden() {
        let config = Config::load_str(
            r#"
[page]
draft_url_fragment = "/photos/draft/"

[page.selectors]
item = ".card_XYZ12"
"#,
        )
        .unwrap();
        assert_eq!(config.page.draft_url_fragment, "/photos/draft/");
        assert_eq!(config.page.selectors.item, ".card_XYZ12");
        assert_eq!(config.page.selectors.accept_all, ".addToTag_AT1GT");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[browser]\ndebug_port = 9333\nheadless = true").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.browser.debug_port, 9333);
        assert!(config.browser.headless);
    }

    #[test]
    fn env_var_expansion() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("AUTOTAG_TEST_FRAGMENT", "/icon/draft/");
        }
        let config = Config::load_str(
            r#"
[page]
draft_url_fragment = "${AUTOTAG_TEST_FRAGMENT}"
"#,
        )
        .unwrap();
        assert_eq!(config.page.draft_url_fragment, "/icon/draft/");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let result = Config::load_str(r#"fragment = "${AUTOTAG_NO_SUCH_VAR}""#);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(name)) if name == "AUTOTAG_NO_SUCH_VAR"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let result = Config::load_str("[run\nconcurrency = 2");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }
}
