use anyhow::Result;
use clap::Parser as ClapParser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

use cli::command::{Cli, Commands, LogFormat};
use cli::decode::cmd_decode;
use cli::encode::cmd_encode;
use cli::info::cmd_info;

mod byteorder;
mod cli;
mod input;
mod riff;
pub(crate) mod timestamp;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base_level = cli.loglevel.to_level_filter();

    let multi = MultiProgress::new();

    let mut env_builder = env_logger::Builder::from_default_env();
    env_builder.filter_level(base_level);
    match cli.log_format {
        LogFormat::Plain => {
            env_builder.format_timestamp_secs();
        }
        LogFormat::Json => {
            env_builder.format(|buf, record| {
                use std::io::Write;
                let line = json_record(buf.timestamp(), record.level(), &record.args().to_string());
                writeln!(buf, "{line}")
            });
        }
    }

    let pb = if cli.progress {
        let logger = env_builder.build();
        LogWrapper::new(multi.clone(), logger).try_init()?;
        Some(&multi)
    } else {
        env_builder.try_init()?;
        None
    };

    log::debug!(
        "sbcd {} ({})",
        cli::command::VERSION,
        option_env!("VERGEN_GIT_DESCRIBE").unwrap_or("no git description")
    );

    match cli.command {
        Commands::Encode(ref args) => cmd_encode(args, &cli, pb)?,
        Commands::Decode(ref args) => cmd_decode(args, &cli, pb)?,
        Commands::Info(ref args) => cmd_info(args, &cli, pb)?,
    }

    Ok(())
}

/// One log record as a JSON object.
fn json_record(ts: impl std::fmt::Display, level: log::Level, msg: &str) -> String {
    serde_json::json!({
        "ts": ts.to_string(),
        "lvl": level.as_str(),
        "msg": msg,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_records_escape_control_characters() -> anyhow::Result<()> {
        let msg = "frame \"7\" muted\x1b[31m\u{7f}\ttab\\";
        let line = json_record("2026-01-01T00:00:00Z", log::Level::Warn, msg);
        assert!(!line.contains('\x1b'));

        let value: serde_json::Value = serde_json::from_str(&line)?;
        assert_eq!(value["msg"], msg);
        assert_eq!(value["lvl"], "WARN");
        assert_eq!(value["ts"], "2026-01-01T00:00:00Z");
        Ok(())
    }
}
