//! `samtv key KEY...`: send remote key presses.
//!
//! Keys are sent one at a time with a short delay between them. The special
//! argument `_` inserts a longer pause. A failed key is reported and the
//! remaining keys are still sent.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::warn;

use samtv_core::{is_known_key, key_codes};

use super::open_session;
use crate::config::Config;

/// Argument standing for a pause instead of a key.
pub const PAUSE_ARG: &str = "_";

const PAUSE: Duration = Duration::from_millis(400);
const KEY_GAP: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    Key(&'a str),
    Wait(Duration),
}

/// Turn the argument list into key presses and waits.
fn plan(args: &[String]) -> Vec<Step<'_>> {
    let mut steps = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if arg == PAUSE_ARG {
            steps.push(Step::Wait(PAUSE));
            continue;
        }
        steps.push(Step::Key(arg));
        if i + 1 < args.len() {
            steps.push(Step::Wait(KEY_GAP));
        }
    }
    steps
}

pub async fn run(cfg: &Config, keys: &[String], list: bool) -> Result<()> {
    if list {
        for key in key_codes() {
            println!("- {key}");
        }
        return Ok(());
    }
    if keys.is_empty() {
        bail!("requires at least 1 key or --list");
    }

    let session = open_session(cfg)?;
    if let Err(e) = session.init_session().await {
        session.close().await;
        if e.is_pairing_required() {
            bail!("the TV is not paired: run `samtv pair`, then `samtv pair --pin NNNN`");
        }
        return Err(e).context("cannot initialize session");
    }

    let mut failed = Vec::new();
    for step in plan(keys) {
        match step {
            Step::Wait(delay) => tokio::time::sleep(delay).await,
            Step::Key(key) => {
                if !is_known_key(key) {
                    warn!(key = %key, "unknown key identifier, sending anyway");
                }
                if let Err(e) = session.send_key(key).await {
                    eprintln!("samtv: cannot send key '{key}': {e}");
                    failed.push(key);
                }
            }
        }
    }
    session.close().await;

    if !failed.is_empty() {
        bail!("{} of {} key(s) failed: {}", failed.len(), count_keys(keys), failed.join(" "));
    }
    Ok(())
}

fn count_keys(args: &[String]) -> usize {
    args.iter().filter(|a| *a != PAUSE_ARG).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plan_inserts_gaps_and_pauses() {
        let a = args(&["KEY_MENU", "_", "KEY_DOWN", "KEY_UP"]);
        assert_eq!(
            plan(&a),
            vec![
                Step::Key("KEY_MENU"),
                Step::Wait(KEY_GAP),
                Step::Wait(PAUSE),
                Step::Key("KEY_DOWN"),
                Step::Wait(KEY_GAP),
                Step::Key("KEY_UP"),
            ]
        );
    }

    #[test]
    fn single_key_has_no_delay() {
        assert_eq!(plan(&args(&["KEY_POWER"])), vec![Step::Key("KEY_POWER")]);
        assert_eq!(count_keys(&args(&["_", "KEY_UP", "_"])), 1);
    }
}
