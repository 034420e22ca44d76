//! `authtool` — maintains an `auth_users` file from the command line without
//! starting the server (`SPEC_FULL.md` §4.12/§10.6), the small-CLI sibling
//! to this codebase's other single-purpose tools.

use std::process::ExitCode;

use anyhow::{Context, Result};
use vaultd::auth::AuthTable;
use vaultd::crypt::hash64;

const USAGE: &str = "\
Usage: authtool <auth_users_file> <command> [args...]

Commands:
  add <username> <password> <permissions>   add or replace a credential
  remove <username>                         remove a credential
  list                                      print every username, sorted
";

fn run(args: &[String]) -> Result<()> {
    let [path, command, rest @ ..] = args else {
        anyhow::bail!("missing arguments\n\n{USAGE}");
    };

    let table = AuthTable::new(Box::new(hash64));
    if std::path::Path::new(path).exists() {
        table.load(path).with_context(|| format!("failed to load {path}"))?;
    }

    match command.as_str() {
        "add" => {
            let [username, password, permissions] = rest else {
                anyhow::bail!("add requires <username> <password> <permissions>");
            };
            let permissions: u8 = permissions
                .parse()
                .with_context(|| format!("invalid permissions: {permissions}"))?;
            let password_hash = hash64(password.as_bytes());
            table.put(username, password_hash, permissions);
            table.dump(path, true)?;
            println!("added {username}");
        }
        "remove" => {
            let [username] = rest else {
                anyhow::bail!("remove requires <username>");
            };
            table.remove(username)?;
            table.dump(path, true)?;
            println!("removed {username}");
        }
        "list" => {
            let mut usernames: Vec<String> = Vec::new();
            // AuthTable doesn't expose raw entries publicly beyond
            // dump/load; reload via a throwaway dump to a temp path to get
            // a stable sorted listing without duplicating its sort logic.
            let tmp = std::env::temp_dir().join(format!("authtool-list-{}", std::process::id()));
            table.dump(&tmp, true)?;
            for line in std::fs::read_to_string(&tmp)?.lines() {
                if let Some(username) = line.split_whitespace().next() {
                    usernames.push(username.to_string());
                }
            }
            std::fs::remove_file(&tmp).ok();
            for username in usernames {
                println!("{username}");
            }
        }
        other => anyhow::bail!("unknown command: {other}\n\n{USAGE}"),
    }

    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("-h") {
        print!("{USAGE}");
        return ExitCode::from(0);
    }
    match run(&args) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(1)
        }
    }
}
