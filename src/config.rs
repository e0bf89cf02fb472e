//! Command-line flags and the configuration derived from them.

use std::path::PathBuf;

use clap::Parser;

use crate::shell::thread::{MAX_JID, MAX_JOBS};

pub const PROMPT: &str = "tsh> ";
const HISTORY_FILE: &str = ".tsh_history";

pub const USAGE: &str = "\
Usage: tsh [-hvp] [--max-jobs <n>]
   -h   print this message
   -v   print additional diagnostic information
   -p   do not emit a command prompt
   --max-jobs <n>   maximum number of concurrent jobs (default 16)
";

#[derive(Debug, Parser)]
#[command(name = "tsh", about = "A tiny shell with job control", disable_help_flag = true)]
pub struct Cli {
    /// Print usage and exit
    #[arg(short = 'h')]
    pub help: bool,

    /// Print additional job table diagnostics
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Do not emit a prompt (for scripted input)
    #[arg(short = 'p')]
    pub no_prompt: bool,

    #[arg(long, default_value_t = MAX_JOBS, value_parser = parse_max_jobs)]
    pub max_jobs: usize,
}

fn parse_max_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{}", e))?;
    if (1..=MAX_JID).contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be between 1 and {}", MAX_JID))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: String,
    pub verbose: bool,
    pub max_jobs: usize,
    pub history: Option<PathBuf>, // Interactive sessions only
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: PROMPT.to_string(),
            verbose: false,
            max_jobs: MAX_JOBS,
            history: None,
        }
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        let (prompt, history) = if cli.no_prompt {
            (String::new(), None)
        } else {
            (
                PROMPT.to_string(),
                dirs::home_dir().map(|home| home.join(HISTORY_FILE)),
            )
        };
        Config {
            prompt,
            verbose: cli.verbose,
            max_jobs: cli.max_jobs,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tsh").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).unwrap();
        assert!(!cli.help && !cli.verbose && !cli.no_prompt);
        let config = Config::from_cli(&cli);
        assert_eq!(config.prompt, PROMPT);
        assert_eq!(config.max_jobs, MAX_JOBS);
    }

    #[test]
    fn combined_short_flags() {
        let cli = parse(&["-vp"]).unwrap();
        assert!(cli.verbose && cli.no_prompt);
        let config = Config::from_cli(&cli);
        assert_eq!(config.prompt, "");
        assert!(config.history.is_none());
        assert!(config.verbose);
    }

    #[test]
    fn help_is_a_plain_flag() {
        assert!(parse(&["-h"]).unwrap().help);
    }

    #[test]
    fn rejects_unknown_flags_and_bad_limits() {
        assert!(parse(&["-x"]).is_err());
        assert!(parse(&["--max-jobs", "0"]).is_err());
        assert!(parse(&["--max-jobs", "many"]).is_err());
        assert_eq!(parse(&["--max-jobs", "4"]).unwrap().max_jobs, 4);
    }
}
