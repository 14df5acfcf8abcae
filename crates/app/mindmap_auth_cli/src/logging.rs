pub mod formats;

use flexi_logger::{Logger, LoggerHandle};

use crate::Error;

/// Start logging at `level` unless `RUST_LOG` says otherwise.
///
/// Records go to stderr; stdout carries only command output (secrets,
/// digests, claims JSON) so it can be piped.
pub fn init(level: &str) -> Result<LoggerHandle, Error> {
    let handle = Logger::try_with_env_or_str(level)?
        .format(formats::cli_format)
        .log_to_stderr()
        .start()?;

    Ok(handle)
}
