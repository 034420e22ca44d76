//! CLI surface (C10): parses `argv` into a run request or a help action.
//!
//! Hand-rolled `-d`/`-p`/`-n`/`-h` loop, matching the existing binaries'
//! own `std::env::args()` style rather than reaching for an argument-parsing
//! crate — there is no config file here, only these three flags plus the
//! persisted `auth_users` file under the root directory.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_PORT: u16 = 8989;
pub const DEFAULT_WORKERS: usize = 4;

pub const USAGE: &str = "\
Usage: vaultd -d <root_dir> [-p <port>] [-n <workers>]

  -d <path>     Root directory for persisted state (required, not \"/\")
  -p <port>     TCP port to listen on (default 8989)
  -n <count>    Worker thread count, > 0 (default 4)
  -h            Print this help and exit
";

/// A fully parsed, validated run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub root_dir: PathBuf,
    pub port: u16,
    pub workers: usize,
}

/// What the CLI loop decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `-h` was given; usage has already been printed.
    Help,
    Run(ParsedArgs),
}

/// Parses `argv` (excluding the program name). Unknown flags, a missing
/// required value, an invalid `-p`/`-n`, or `-d /` all fail with
/// [`CoreError::BadInput`] carrying a short diagnostic for stderr.
pub fn parse(args: &[String]) -> CoreResult<Action> {
    let mut root_dir: Option<PathBuf> = None;
    let mut port = DEFAULT_PORT;
    let mut workers = DEFAULT_WORKERS;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" => return Ok(Action::Help),
            "-d" => {
                i += 1;
                let val = args
                    .get(i)
                    .ok_or_else(|| CoreError::BadInput("-d requires a PATH argument".into()))?;
                root_dir = Some(PathBuf::from(val));
            }
            "-p" => {
                i += 1;
                let val = args
                    .get(i)
                    .ok_or_else(|| CoreError::BadInput("-p requires a PORT argument".into()))?;
                port = val
                    .parse()
                    .map_err(|_| CoreError::BadInput(format!("invalid port: {val}")))?;
            }
            "-n" => {
                i += 1;
                let val = args
                    .get(i)
                    .ok_or_else(|| CoreError::BadInput("-n requires a COUNT argument".into()))?;
                workers = val
                    .parse::<usize>()
                    .map_err(|_| CoreError::BadInput(format!("invalid worker count: {val}")))?;
                if workers == 0 {
                    return Err(CoreError::BadInput("worker count must be > 0".into()));
                }
            }
            other => {
                return Err(CoreError::BadInput(format!("unknown option: {other}")));
            }
        }
        i += 1;
    }

    let root_dir = root_dir.ok_or_else(|| CoreError::BadInput("-d <root_dir> is required".into()))?;
    if root_dir == Path::new("/") {
        return Err(CoreError::BadInput(
            "root directory must not be \"/\"".into(),
        ));
    }

    Ok(Action::Run(ParsedArgs {
        root_dir,
        port,
        workers,
    }))
}
