//! Operator console for the simulated reader.
//!
//! Lines typed on stdin place tags in the reader field:
//!
//! ```text
//! tap 04A1B2C3                     present a tag (blank if new)
//! load 04A1B2C3 spotify:album:...  pre-program a tag's memory
//! lift                             empty the field
//! help                             list the commands
//! ```
//!
//! Stdin is read on a plain thread. A read blocked on the terminal must
//! not hold up runtime shutdown, so the thread is left to die with the
//! process.

use std::io::BufRead;
use std::str::FromStr;

use spotirfid_core::TagUid;
use spotirfid_hardware::mock::{MockTagReaderHandle, SimulatedTag};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const HELP: &str = "\
commands:
  tap <uid>           present a tag (registers a blank tag if unknown)
  load <uid> <text>   store <text> in the tag's user memory
  lift                remove the tag from the field
  help                show this list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Tap(TagUid),
    Load(TagUid, String),
    Lift,
    Help,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let uid = |text: &str| {
            text.parse::<TagUid>()
                .map_err(|e| format!("bad tag UID {text:?}: {e}"))
        };

        match verb {
            "tap" if !rest.is_empty() => Ok(Self::Tap(uid(rest)?)),
            "load" => {
                let (id, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: load <uid> <text>".to_string())?;
                Ok(Self::Load(uid(id)?, text.trim().to_string()))
            }
            "lift" => Ok(Self::Lift),
            "help" | "?" => Ok(Self::Help),
            "tap" => Err("usage: tap <uid>".to_string()),
            other => Err(format!("unknown command {other:?}, try `help`")),
        }
    }
}

/// Apply one command to the simulated field.
pub async fn apply(handle: &MockTagReaderHandle, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Tap(uid) => {
            handle.tap(&uid).await;
            info!("Tag {uid} in field");
        }
        ConsoleCommand::Load(uid, text) => {
            handle
                .add_tag(SimulatedTag::ntag213(uid.clone()).with_text(&text))
                .await;
            info!("Tag {uid} loaded with {text:?}");
        }
        ConsoleCommand::Lift => {
            handle.lift().await;
            info!("Field empty");
        }
        ConsoleCommand::Help => println!("{HELP}"),
    }
}

/// Feed stdin commands to the simulated reader until `shutdown` fires or
/// stdin closes.
pub fn spawn(handle: MockTagReaderHandle, shutdown: CancellationToken) -> JoinHandle<()> {
    let (tx, mut rx) = mpsc::channel::<String>(16);

    let spawned = std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Console unavailable: {e}");
    }

    tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => break,
                line = rx.recv() => match line {
                    Some(line) => line,
                    None => {
                        debug!("Console input closed");
                        break;
                    }
                },
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<ConsoleCommand>() {
                Ok(command) => apply(&handle, command).await,
                Err(message) => println!("{message}"),
            }
        }
    })
}
