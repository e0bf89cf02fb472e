use std::ffi::CString;

use nix::{
    errno::Errno,
    libc,
    sys::signal::{
        pthread_sigmask, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
    },
    unistd::{self, Pid},
};

use crate::{error::ShellError, shell::syscall};

/// Holds SIGCHLD blocked on the calling thread until dropped.
///
/// Launching runs under this guard so the exit of a fast child cannot be
/// reported before the job is in the table.
pub struct ChildSignalBlock {
    mask: SigSet,
}

impl ChildSignalBlock {
    pub fn new() -> Result<Self, ShellError> {
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGCHLD);
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&mask), None)
            .map_err(ShellError::os("sigprocmask error"))?;
        Ok(ChildSignalBlock { mask })
    }

    pub fn mask(&self) -> &SigSet {
        &self.mask
    }
}

impl Drop for ChildSignalBlock {
    fn drop(&mut self) {
        if let Err(e) = pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&self.mask), None) {
            tracing::error!("failed to unblock SIGCHLD: {}", e);
        }
    }
}

/// Fork a child that leads a new process group and execs `args`.
///
/// Returns the child's pid, which is also its process group id. If the program
/// cannot be executed, the child prints a diagnostic and exits on its own.
pub fn fork_exec(args: &[&str], blocked: &ChildSignalBlock) -> Result<Pid, ShellError> {
    let Some(program) = args.first() else {
        return Err(ShellError::InvalidArgument("empty command".to_string()));
    };
    let argv = args
        .iter()
        .map(|s| CString::new(*s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ShellError::InvalidArgument(format!("{}: argument contains NUL", program)))?;
    // Formatted before fork; the child only writes it.
    let not_found = format!("{}: Command not found\n", program);

    match syscall(|| unsafe { unistd::fork() }).map_err(ShellError::os("fork error"))? {
        unistd::ForkResult::Parent { child } => {
            // The child may already have exec'd or exited.
            match unistd::setpgid(child, child) {
                Ok(()) | Err(Errno::EACCES) | Err(Errno::ESRCH) => {}
                Err(e) => return Err(ShellError::os("setpgid error")(e)),
            }
            tracing::debug!(pid = %child, program, "forked");
            Ok(child)
        }
        unistd::ForkResult::Child => {
            restore_default_signals();
            let _ = pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(blocked.mask()), None);
            let _ = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
            let _ = unistd::execvp(&argv[0], &argv);
            let _ = unistd::write(libc::STDOUT_FILENO, not_found.as_bytes());
            unsafe { libc::_exit(127) }
        }
    }
}

/// The shell's handlers must not run in a child that has not exec'd yet.
fn restore_default_signals() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in [
        Signal::SIGINT,
        Signal::SIGTSTP,
        Signal::SIGQUIT,
        Signal::SIGCHLD,
    ] {
        unsafe {
            let _ = sigaction(sig, &default);
        }
    }
}
