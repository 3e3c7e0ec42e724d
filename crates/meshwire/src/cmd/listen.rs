use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use meshwire_session::{Event, Topic};
use tracing::warn;

use crate::cmd::ListenArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (session, _config_id) = args.device.connect()?;

    // Callbacks run on the dispatcher thread; printing happens here.
    let (tx, rx) = crossbeam_channel::unbounded::<Event>();
    if args.packets {
        let tx = tx.clone();
        session.subscribe(Topic::Packets, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    session.subscribe(Topic::NodeEvents, move |event| {
        let _ = tx.send(event.clone());
    });

    let mut printed = 0usize;
    let mut link_lost = false;
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                print_event(&event, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !session.is_receiving() {
                    link_lost = true;
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    session.close();
    if link_lost {
        warn!(port = %args.device.port, printed, "radio link lost");
        return Err(CliError::new(TRANSPORT_ERROR, "radio link lost"));
    }
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
