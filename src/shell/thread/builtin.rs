use nix::unistd::Pid;

use super::job::{JobId, JobTable};
use crate::error::JobRefError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Quit,
    Jobs,
    Fg,
    Bg,
    Ampersand, // A lone `&`
}

impl Builtin {
    pub fn from_args(args: &[&str]) -> Option<Self> {
        match *args.first()? {
            "quit" => Some(Builtin::Quit),
            "jobs" => Some(Builtin::Jobs),
            "fg" => Some(Builtin::Fg),
            "bg" => Some(Builtin::Bg),
            "&" => Some(Builtin::Ampersand),
            _ => None,
        }
    }
}

pub fn is_builtin(args: &[&str]) -> bool {
    Builtin::from_args(args).is_some()
}

/// Target of `fg`/`bg`: `%<jid>` or a bare pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRef {
    Job(JobId),
    Process(Pid),
}

impl JobRef {
    /// Parse the first argument after the command name.
    pub fn parse(args: &[&str]) -> Result<Self, JobRefError> {
        let cmd = args.first().copied().unwrap_or_default();
        let Some(arg) = args.get(1) else {
            return Err(JobRefError::Missing {
                cmd: cmd.to_string(),
            });
        };
        let malformed = || JobRefError::Malformed {
            cmd: cmd.to_string(),
        };
        match arg.strip_prefix('%') {
            Some(jid) => {
                if !is_number(jid) {
                    return Err(malformed());
                }
                jid.parse::<JobId>().map(JobRef::Job).map_err(|_| malformed())
            }
            None => {
                if !is_number(arg) {
                    return Err(malformed());
                }
                arg.parse::<i32>()
                    .map(|pid| JobRef::Process(Pid::from_raw(pid)))
                    .map_err(|_| malformed())
            }
        }
    }

    /// Resolve to the pid of a job present in `jobs`.
    pub fn resolve(self, jobs: &JobTable) -> Result<Pid, JobRefError> {
        match self {
            JobRef::Job(jid) => jobs
                .lookup_by_jid(jid)
                .map(|job| job.pid)
                .ok_or(JobRefError::NoSuchJob { jid: jid.into() }),
            JobRef::Process(pid) => jobs
                .lookup_by_pid(pid)
                .map(|job| job.pid)
                .ok_or(JobRefError::NoSuchProcess { pid: pid.as_raw() }),
        }
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::thread::job::JobState;
    use rstest::rstest;

    #[rstest]
    #[case(&["quit"], Some(Builtin::Quit))]
    #[case(&["jobs"], Some(Builtin::Jobs))]
    #[case(&["fg", "%1"], Some(Builtin::Fg))]
    #[case(&["bg"], Some(Builtin::Bg))]
    #[case(&["&"], Some(Builtin::Ampersand))]
    #[case(&["sleep", "1"], None)]
    #[case(&[], None)]
    fn recognizes_builtins(#[case] args: &[&str], #[case] expected: Option<Builtin>) {
        assert_eq!(Builtin::from_args(args), expected);
        assert_eq!(is_builtin(args), expected.is_some());
    }

    #[rstest]
    #[case(&["fg", "%1"], JobRef::Job(JobId::from(1)))]
    #[case(&["bg", "%12"], JobRef::Job(JobId::from(12)))]
    #[case(&["fg", "4321"], JobRef::Process(Pid::from_raw(4321)))]
    fn parses_references(#[case] args: &[&str], #[case] expected: JobRef) {
        assert_eq!(JobRef::parse(args), Ok(expected));
    }

    #[rstest]
    #[case(&["fg"], JobRefError::Missing { cmd: "fg".into() })]
    #[case(&["bg"], JobRefError::Missing { cmd: "bg".into() })]
    #[case(&["fg", "%"], JobRefError::Malformed { cmd: "fg".into() })]
    #[case(&["fg", "%x"], JobRefError::Malformed { cmd: "fg".into() })]
    #[case(&["bg", "abc"], JobRefError::Malformed { cmd: "bg".into() })]
    #[case(&["bg", "-5"], JobRefError::Malformed { cmd: "bg".into() })]
    #[case(&["fg", "99999999999"], JobRefError::Malformed { cmd: "fg".into() })]
    fn rejects_bad_references(#[case] args: &[&str], #[case] expected: JobRefError) {
        assert_eq!(JobRef::parse(args), Err(expected));
    }

    #[test]
    fn resolves_against_table() {
        let mut jobs = JobTable::new();
        let pid = Pid::from_raw(777);
        let jid = jobs.insert(pid, JobState::Stopped, "sleep 5").unwrap();

        assert_eq!(JobRef::Job(jid).resolve(&jobs), Ok(pid));
        assert_eq!(JobRef::Process(pid).resolve(&jobs), Ok(pid));
        assert_eq!(
            JobRef::Job(JobId::from(9)).resolve(&jobs),
            Err(JobRefError::NoSuchJob { jid: 9 })
        );
        assert_eq!(
            JobRef::Process(Pid::from_raw(99999)).resolve(&jobs),
            Err(JobRefError::NoSuchProcess { pid: 99999 })
        );
    }
}
