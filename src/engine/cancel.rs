//! engine::cancel
//!
//! Cooperative cancellation for sequencer runs.
//!
//! A [`CancelToken`] is a shared flag. [`SignalScope`] registers SIGINT and
//! SIGTERM to set it for as long as the scope lives; dropping the scope
//! unregisters both handlers on every exit path, so no handler outlives its
//! run. While a scope is active an interrupt no longer kills the process;
//! the sequencer notices the flag at its next step and unwinds.
//!
//! signal-hook keeps its own handler installed once anything was registered,
//! so unregistering alone would leave both signals ignored. A process-wide
//! conditional-default action is registered the first time a scope is
//! installed; it terminates the process the usual way whenever no scope is
//! active.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::SigId;
use tracing::debug;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Default signal behavior, shared by every scope in the process.
struct DefaultAction {
    /// True while no scope is active
    restore: Arc<AtomicBool>,
    active: usize,
}

static DEFAULT_ACTION: Mutex<Option<DefaultAction>> = Mutex::new(None);

/// Count one more active scope, registering the default action on first use.
fn enter_scope() -> io::Result<()> {
    let mut guard = DEFAULT_ACTION
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if guard.is_none() {
        let restore = Arc::new(AtomicBool::new(true));
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register_conditional_default(signal, Arc::clone(&restore))?;
        }
        *guard = Some(DefaultAction { restore, active: 0 });
    }
    if let Some(action) = guard.as_mut() {
        action.active += 1;
        action.restore.store(false, Ordering::SeqCst);
    }
    Ok(())
}

fn leave_scope() {
    let mut guard = DEFAULT_ACTION
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(action) = guard.as_mut() {
        action.active = action.active.saturating_sub(1);
        if action.active == 0 {
            action.restore.store(true, Ordering::SeqCst);
        }
    }
}

/// Whether a signal arriving now would terminate the process.
fn default_restored() -> bool {
    DEFAULT_ACTION
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map_or(true, |action| action.restore.load(Ordering::SeqCst))
}

/// Signal handlers bound to a token for the lifetime of this value.
#[derive(Debug)]
pub struct SignalScope {
    ids: Vec<SigId>,
    entered: bool,
}

impl SignalScope {
    /// Route SIGINT and SIGTERM to `token`.
    pub fn install(token: &CancelToken) -> io::Result<Self> {
        let mut scope = Self {
            ids: Vec::new(),
            entered: false,
        };
        // On error `scope` drops and undoes what was installed.
        enter_scope()?;
        scope.entered = true;
        for signal in [SIGINT, SIGTERM] {
            let id = signal_hook::flag::register(signal, Arc::clone(&token.flag))?;
            scope.ids.push(id);
        }
        debug!("signal handlers installed");
        Ok(scope)
    }
}

impl Drop for SignalScope {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
        if self.entered {
            leave_scope();
        }
        debug!("signal handlers removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn scope_installs_and_removes() {
        let token = CancelToken::new();
        {
            let scope = SignalScope::install(&token).unwrap();
            assert_eq!(scope.ids.len(), 2);
        }
        assert!(!token.is_cancelled());
    }

    #[test]
    fn nested_scopes_keep_signals_routed_until_the_last_drops() {
        let token = CancelToken::new();
        let outer = SignalScope::install(&token).unwrap();
        let inner = SignalScope::install(&token).unwrap();
        drop(inner);
        assert!(!default_restored());
        drop(outer);
        // Other tests may hold a scope of their own; only check ours left.
        let guard = DEFAULT_ACTION.lock().unwrap();
        let action = guard.as_ref().unwrap();
        assert_eq!(action.restore.load(Ordering::SeqCst), action.active == 0);
    }

    /// After a scope ends, SIGTERM must kill the process again. Checked in a
    /// child copy of this test binary so the runner survives.
    #[cfg(unix)]
    #[test]
    fn sigterm_after_scope_terminates() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::Command;

        const CHILD: &str = "STACKED_REBASE_SIGNAL_CHILD";
        const NAME: &str = "engine::cancel::tests::sigterm_after_scope_terminates";

        if std::env::var_os(CHILD).is_some() {
            let token = CancelToken::new();
            drop(SignalScope::install(&token).unwrap());
            signal_hook::low_level::raise(SIGTERM).unwrap();
            std::thread::sleep(std::time::Duration::from_secs(5));
            std::process::exit(0);
        }

        let status = Command::new(std::env::current_exe().unwrap())
            .args(["--exact", NAME, "--test-threads=1", "--nocapture"])
            .env(CHILD, "1")
            .status()
            .unwrap();
        assert_eq!(status.signal(), Some(SIGTERM), "child exited with {status:?}");
    }
}
