//! SIGINT, SIGQUIT and SIGUSR1 for long running loops
//!
//! The handlers only set flags. The loop polls them between two commands,
//! an in-flight command is never interrupted.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use anyhow::Error;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

static INTERRUPT_SIGNAL: AtomicI32 = AtomicI32::new(0);
static PROGRESS_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(signo: libc::c_int) {
    if signo == libc::SIGUSR1 {
        PROGRESS_REQUESTED.store(true, Ordering::Relaxed);
    } else {
        INTERRUPT_SIGNAL.store(signo, Ordering::Relaxed);
    }
}

pub fn install_signal_handlers() -> Result<(), Error> {
    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGUSR1] {
        unsafe { signal::sigaction(sig, &action) }?;
    }
    Ok(())
}

/// True once per SIGUSR1 received since the last call
pub fn take_progress_request() -> bool {
    PROGRESS_REQUESTED.swap(false, Ordering::Relaxed)
}

/// The interrupting signal, if any arrived
pub fn pending_interrupt() -> Option<Signal> {
    match INTERRUPT_SIGNAL.load(Ordering::Relaxed) {
        0 => None,
        signo => Signal::try_from(signo).ok(),
    }
}

/// Restore the default disposition and raise `sig` again
pub fn reraise(sig: Signal) -> Result<(), Error> {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    unsafe { signal::sigaction(sig, &action) }?;
    signal::raise(sig)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sigusr1_requests_progress() -> Result<(), Error> {
        install_signal_handlers()?;
        signal::raise(Signal::SIGUSR1)?;
        assert!(take_progress_request());
        assert!(!take_progress_request());
        assert_eq!(pending_interrupt(), None);
        Ok(())
    }
}
