use clap::Parser;

// --- Command Line Interface ---
#[derive(Parser)]
#[command(name = "sakuga-retimer")]
#[command(about = "Motion-aware frame re-timing for 2D animation clips")]
pub struct Cli {
    /// Path to the source clip.
    #[arg(long)]
    pub input: String,

    /// Path for the re-timed output clip.
    #[arg(long)]
    pub output: String,

    /// Inline JSON config blob (see the recognized keys in the crate docs).
    /// Required unless `--config-file` is given.
    #[arg(long, value_name = "JSON")]
    pub config: Option<String>,

    /// Read the config JSON from a file instead of the command line.
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,

    /// Override the `save_keypoints` config key: persist per-frame keypoints
    /// in the analysis document.
    #[arg(long)]
    pub save_keypoints: bool,

    /// Emit the per-frame MI contribution breakdown in the analysis document
    /// even when `--save-keypoints` is not set.
    #[arg(long)]
    pub debug_features: bool,

    /// Print per-stage timing to stderr once processing completes.
    #[arg(long)]
    pub profile_performance: bool,

    /// Override the number of Rayon analysis threads (defaults to logical cores).
    #[arg(long)]
    pub analysis_threads: Option<usize>,
}

impl Cli {
    /// Read the config JSON from whichever of `--config` / `--config-file`
    /// was given, preferring `--config` if both are present.
    pub fn config_source(&self) -> Result<ConfigSource<'_>, String> {
        match (&self.config, &self.config_file) {
            (Some(inline), _) => Ok(ConfigSource::Inline(inline)),
            (None, Some(path)) => Ok(ConfigSource::File(path)),
            (None, None) => Err("one of --config or --config-file is required".to_string()),
        }
    }
}

pub enum ConfigSource<'a> {
    Inline(&'a str),
    File(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_source_prefers_inline() {
        let cli = Cli {
            input: "in.mp4".into(),
            output: "out.mp4".into(),
            config: Some("{}".into()),
            config_file: Some("cfg.json".into()),
            save_keypoints: false,
            debug_features: false,
            profile_performance: false,
            analysis_threads: None,
        };
        assert!(matches!(cli.config_source(), Ok(ConfigSource::Inline(_))));
    }

    #[test]
    fn config_source_requires_one() {
        let cli = Cli {
            input: "in.mp4".into(),
            output: "out.mp4".into(),
            config: None,
            config_file: None,
            save_keypoints: false,
            debug_features: false,
            profile_performance: false,
            analysis_threads: None,
        };
        assert!(cli.config_source().is_err());
    }
}
