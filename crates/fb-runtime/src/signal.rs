use tokio_util::sync::CancellationToken;

/// Exit status for a forced stop, as a shell reports SIGINT.
const FORCED_EXIT: i32 = 130;

/// Wait for Ctrl-C (SIGINT) or SIGTERM.
///
/// The first signal cancels the run: the batch already running is allowed to
/// finish and a waiting prompt gives up. A second signal exits the process
/// at once, for a runner that never returns.
pub async fn wait_for_signal(cancel: CancellationToken) {
    let mut signals = match Signals::install() {
        Ok(s) => s,
        Err(e) => {
            fb_warn!(sys, error = %e, "cannot listen for signals, the run cannot be cancelled");
            return;
        }
    };

    let Some(first) = signals.next().await else {
        return;
    };
    fb_info!(sys, signal = first, "received signal, finishing current batch");
    cancel.cancel();

    if let Some(second) = signals.next().await {
        fb_warn!(sys, signal = second, "received second signal, exiting now");
        std::process::exit(FORCED_EXIT);
    }
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn next(&mut self) -> Option<&'static str> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some("SIGINT"),
            Some(()) = self.terminate.recv() => Some("SIGTERM"),
            else => None,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> Option<&'static str> {
        tokio::signal::ctrl_c().await.ok().map(|()| "SIGINT")
    }
}
