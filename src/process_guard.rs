//! Process lifecycle management for spawned install actions.
//!
//! Install actions are external, possibly long-running processes with real
//! filesystem/network effects. If the installer exits (cleanly or not) while
//! one is running, the child must not be left orphaned and half-finished.
//!
//! Children are spawned in their own process group and tracked in a global
//! registry. On exit or signal, every tracked group receives SIGTERM, gets a
//! grace period to clean up, then SIGKILL. Cancellation mid-run uses the
//! same mechanism through [`ChildRegistry::interrupt_all`], which does not
//! latch the one-shot exit cleanup flag.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking all spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    /// Whether exit cleanup has already run (prevent double-cleanup)
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    /// Register a new child process
    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("registered child process {pid}");
    }

    /// Unregister a child process (called when it exits normally)
    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("unregistered child process {pid}");
    }

    /// Number of tracked children
    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Signal all tracked process groups: SIGTERM, wait up to `grace`,
    /// then SIGKILL whatever survived. Used for mid-run cancellation;
    /// the registry stays usable afterwards.
    pub fn interrupt_all(&mut self, grace: Duration) {
        let pids: Vec<u32> = self.pids.iter().copied().collect();
        if pids.is_empty() {
            return;
        }
        info!("interrupting {} running install action(s)", pids.len());
        signal_groups_with_grace(&pids, grace);
        for pid in pids {
            self.pids.remove(&pid);
        }
    }

    /// Terminate all tracked children on process exit. One-shot: repeated
    /// calls are ignored.
    pub fn terminate_all(&mut self, grace: Duration) {
        if self.cleanup_initiated {
            debug!("cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            debug!("no child processes to terminate");
            return;
        }

        info!("terminating {} child process(es)", self.pids.len());
        let pids: Vec<u32> = self.pids.iter().copied().collect();
        signal_groups_with_grace(&pids, grace);
        self.pids.clear();
    }
}

/// SIGTERM every group, wait for the grace period, SIGKILL survivors.
fn signal_groups_with_grace(pids: &[u32], grace: Duration) {
    for &pid in pids {
        // Group signal first so the whole process tree of the action
        // (bash plus whatever it spawned) receives it.
        if let Err(e) = send_signal_to_group(pid, Signal::SIGTERM) {
            warn!("failed to SIGTERM process group {pid}: {e}");
            if let Err(e2) = send_signal(pid, Signal::SIGTERM) {
                warn!("failed to SIGTERM pid {pid}: {e2}");
            }
        }
    }

    let start = Instant::now();
    while start.elapsed() < grace {
        if pids.iter().all(|&pid| !is_process_alive(pid)) {
            debug!("all children exited within grace period");
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    for &pid in pids {
        if is_process_alive(pid) {
            warn!("process group {pid} survived SIGTERM, sending SIGKILL");
            if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                let _ = send_signal(pid, Signal::SIGKILL);
            }
        }
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Negative PID signals every process in the group.
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Check if a process is still alive (not dead or zombie)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Zombies can still receive signals but aren't running; field 3 of
    // /proc/pid/stat is the state character.
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        let fields: Vec<&str> = stat.split_whitespace().collect();
        if fields.len() > 2 {
            return !matches!(fields[2], "Z" | "X");
        }
    }

    true
}

/// RAII guard that terminates all tracked children on drop.
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    /// Create a guard attached to the global registry
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }

    /// Number of tracked children
    pub fn child_count(&self) -> usize {
        self.registry.lock().map(|r| r.count()).unwrap_or(0)
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        debug!("ProcessGuard dropped, initiating cleanup");
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate_all(Duration::from_secs(5));
        }
    }
}

/// Install handlers for SIGTERM and SIGHUP that terminate tracked children
/// before exiting. SIGINT is deliberately left alone: in headless mode it
/// triggers a graceful cancel (the run still produces a report) and in TUI
/// mode it arrives as a key event under raw mode.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = Signals::new([SIGTERM, SIGHUP])?;

    thread::spawn(move || {
        for sig in signals.forever() {
            let name = match sig {
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            info!("received {name}, cleaning up child processes");

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command` to set up process groups.
pub trait CommandProcessGroup {
    /// Run the command in its own process group so the entire process tree
    /// can be signalled at once.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: pre_exec runs between fork and exec; setpgid and prctl are
        // async-signal-safe and touch no allocator state.
        unsafe {
            self.pre_exec(|| {
                // New group with PGID = child PID
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                // Child dies if the parent dies, so a crashed installer
                // cannot leave an install action running unattended.
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_registry_register_unregister() {
        let mut registry = ChildRegistry::default();

        registry.register(1234);
        registry.register(5678);
        assert_eq!(registry.count(), 2);

        registry.unregister(1234);
        assert_eq!(registry.count(), 1);

        registry.unregister(5678);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_terminate_all_kills_real_process() {
        let child = Command::new("sh")
            .args(["-c", "sleep 60"])
            .spawn()
            .expect("failed to spawn sleep");
        let pid = child.id();

        let mut registry = ChildRegistry::default();
        registry.register(pid);
        assert!(is_process_alive(pid));

        registry.terminate_all(Duration::from_millis(500));

        // Reap so the zombie doesn't count as alive forever
        let start = Instant::now();
        let mut child = child;
        while start.elapsed() < Duration::from_secs(2) {
            if matches!(child.try_wait(), Ok(Some(_))) {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("child should have terminated");
    }

    #[test]
    fn test_guard_drop_terminates_registered_child() {
        let child = Command::new("sh")
            .args(["-c", "sleep 60"])
            .spawn()
            .expect("failed to spawn sleep");
        let pid = child.id();

        // The guard attaches to the global registry, so this is the only
        // test that may use it; the exit cleanup flag latches on drop.
        let guard = ProcessGuard::new();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }
        assert_eq!(guard.child_count(), 1);
        drop(guard);

        let start = Instant::now();
        let mut child = child;
        while start.elapsed() < Duration::from_secs(2) {
            if matches!(child.try_wait(), Ok(Some(_))) {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("child should have been terminated when the guard dropped");
    }

    #[test]
    fn test_terminate_all_is_one_shot() {
        let mut registry = ChildRegistry::default();
        registry.terminate_all(Duration::from_millis(10));
        assert!(registry.cleanup_initiated);

        registry.register(99999); // stale pid, nothing to signal
        registry.terminate_all(Duration::from_millis(10));
        assert_eq!(registry.count(), 1, "second call must be a no-op");
    }

    #[test]
    fn test_interrupt_all_leaves_registry_usable() {
        let mut registry = ChildRegistry::default();
        registry.register(99999);
        registry.interrupt_all(Duration::from_millis(10));
        assert_eq!(registry.count(), 0);
        assert!(!registry.cleanup_initiated);

        // Still accepts registrations after an interrupt pass
        registry.register(88888);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_terminate_all_handles_already_dead_process() {
        let mut child = Command::new("sh")
            .args(["-c", "exit 0"])
            .spawn()
            .expect("failed to spawn sh");
        let pid = child.id();
        let _ = child.wait();

        let mut registry = ChildRegistry::default();
        registry.register(pid);
        registry.terminate_all(Duration::from_millis(100));
    }

    #[test]
    fn test_is_process_alive_nonexistent() {
        assert!(!is_process_alive(999999));
    }

    #[test]
    fn test_send_signal_to_nonexistent_pid() {
        assert!(send_signal(999999, Signal::SIGTERM).is_err());
    }
}
