use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use sakuga_retimer::cli::{Cli, ConfigSource};
use sakuga_retimer::{logging, CoreError, RetimeConfig, RunArgs};

#[derive(Serialize)]
#[serde(tag = "status")]
enum OutputDocument {
    #[serde(rename = "success")]
    Success {
        output_video_path: String,
        database_id: String,
        message: String,
    },
    #[serde(rename = "error")]
    Error { error_type: String, message: String },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match try_run(&cli) {
        Ok(outcome) => {
            let doc = OutputDocument::Success {
                output_video_path: outcome.output_video_path,
                database_id: outcome.database_id,
                message: format!(
                    "retimed successfully ({} transient pose failures)",
                    outcome.transient_pose_failures
                ),
            };
            println!("{}", serde_json::to_string(&doc).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(report) => {
            let doc = OutputDocument::Error {
                error_type: report.error_type,
                message: report.message,
            };
            eprintln!("{}", serde_json::to_string(&doc).unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}

struct ErrorReport {
    error_type: String,
    message: String,
}

fn try_run(cli: &Cli) -> Result<sakuga_retimer::AnalysisOutcome, ErrorReport> {
    if let Some(threads) = cli.analysis_threads {
        if threads == 0 {
            return Err(ErrorReport {
                error_type: "ConfigError".to_string(),
                message: "--analysis-threads must be at least 1".to_string(),
            });
        }
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global();
    }

    let config = load_config(cli).map_err(|message| ErrorReport {
        error_type: "ConfigError".to_string(),
        message,
    })?;

    let args = RunArgs {
        input_path: cli.input.clone(),
        output_path: cli.output.clone(),
        config,
        save_keypoints_override: cli.save_keypoints,
        debug_features: cli.debug_features,
        profile_performance: cli.profile_performance,
    };

    sakuga_retimer::run(args).map_err(core_error_to_report)
}

fn load_config(cli: &Cli) -> Result<RetimeConfig, String> {
    let source = cli.config_source()?;
    match source {
        ConfigSource::Inline(raw) => RetimeConfig::from_json_str(raw).map_err(|e| e.to_string()),
        ConfigSource::File(path) => {
            RetimeConfig::from_file(std::path::Path::new(path)).map_err(|e| e.to_string())
        }
    }
}

fn core_error_to_report(err: CoreError) -> ErrorReport {
    let error_type = match &err {
        CoreError::Config(_) => "ConfigError",
        CoreError::InputNotFound(_) => "InputNotFound",
        CoreError::InputUnreadable { .. } => "InputUnreadable",
        CoreError::VariableFrameRate { .. } => "VariableFrameRate",
        CoreError::NoSubjectDetected => "NoSubjectDetected",
        CoreError::ShortClip { .. } => "ShortClip",
        CoreError::OutputWrite(_) => "OutputWriteError",
    };
    ErrorReport {
        error_type: error_type.to_string(),
        message: err.to_string(),
    }
}
