use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use vaultd::config::{self, Action, USAGE};
use vaultd::net::{ClientContext, ServeOutcome};

/// A minimal line-oriented echo server: reads one line, and if it is
/// exactly `"PING\n"` replies `"PONG\n"`, otherwise closes the connection.
/// Stands in for the wire protocol this crate does not define itself
/// (`SPEC_FULL.md` §6) — enough to exercise the dispatch engine end to end.
fn ping_pong_serve(ctx: &mut ClientContext) -> vaultd::error::CoreResult<ServeOutcome> {
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::os::unix::io::FromRawFd;

    let mut stream = unsafe { TcpStream::from_raw_fd(ctx.client_sockfd) };
    let mut buf = [0u8; 64];
    let outcome = match stream.read(&mut buf) {
        Ok(0) => ServeOutcome::Close,
        Ok(n) if &buf[..n] == b"PING\n" => {
            let _ = stream.write_all(b"PONG\n");
            ServeOutcome::KeepOpen
        }
        Ok(_) => ServeOutcome::Close,
        Err(_) => ServeOutcome::Close,
    };
    std::mem::forget(stream);
    Ok(outcome)
}

/// Exit codes per `SPEC_FULL.md` §6: `0` normal shutdown, `1` startup
/// failure, `2` runtime fatal error.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = match config::parse(&args).context("failed to parse arguments") {
        Ok(action) => action,
        Err(e) => {
            eprintln!("{e:#}");
            eprint!("{USAGE}");
            return ExitCode::from(1);
        }
    };

    let parsed = match action {
        Action::Help => {
            print!("{USAGE}");
            return ExitCode::from(0);
        }
        Action::Run(parsed) => parsed,
    };

    tracing::info!(
        root_dir = %parsed.root_dir.display(),
        port = parsed.port,
        workers = parsed.workers,
        "[vaultd] starting"
    );

    match vaultd::orchestrator::run(parsed, Arc::new(ping_pong_serve)) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("server exited with an error: {e:#}");
            ExitCode::from(2)
        }
    }
}
