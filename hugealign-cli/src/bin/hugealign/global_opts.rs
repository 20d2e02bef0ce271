/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use hugealign::Context;
use hugealign::Error;
use hugealign::FailurePolicy;
use tracing::metadata::LevelFilter;

use super::tracing::init_file_tracing;
use super::tracing::init_stderr_tracing;

/// Allocates 4GiB with plain malloc and again with 1GiB alignment, and
/// reports whether each base address lands on a 2MiB or 1GiB huge page
/// boundary.
///
/// Command line arguments are ignored. Every option below is read from its
/// environment variable only.
#[derive(Debug, Parser, Clone)]
#[clap(name = "hugealign")]
pub struct GlobalOpts {
    /// The verbosity level of log output.
    #[clap(long, value_name = "LEVEL", env = "HUGEALIGN_LOG")]
    pub log: Option<LevelFilter>,

    /// Log to a file instead of stderr.
    #[clap(long, value_name = "FILE", env = "HUGEALIGN_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// What to do when an allocation returns null: "report" prints the null
    /// address and continues, "exit" stops with a nonzero exit status.
    #[clap(
        long,
        value_name = "POLICY",
        env = "HUGEALIGN_ON_FAILURE",
        default_value = "report"
    )]
    pub on_failure: FailurePolicy,
}

impl GlobalOpts {
    /// Reads the options from the environment, disregarding `argv`.
    pub fn from_env() -> Self {
        Self::parse_from(std::env::args_os().take(1))
    }

    /// Initalizes tracing. The returned guard flushes the log file when
    /// dropped.
    #[must_use = "This function returns a guard that should not be immediately dropped"]
    pub fn init_tracing(&self) -> Result<Option<impl Drop + use<>>, Error> {
        if let Some(path) = &self.log_file {
            let file_writer = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Ok(Some(init_file_tracing(self.log, file_writer)?))
        } else {
            init_stderr_tracing(self.log)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        let opts = GlobalOpts::try_parse_from(["hugealign"]).unwrap();
        assert_eq!(opts.on_failure, FailurePolicy::Report);
        assert_eq!(opts.log_file, None);
    }

    #[test]
    fn bad_policy_is_rejected() {
        assert!(GlobalOpts::try_parse_from(["hugealign", "--on-failure", "abort"]).is_err());
        let opts = GlobalOpts::try_parse_from(["hugealign", "--on-failure", "exit"]).unwrap();
        assert_eq!(opts.on_failure, FailurePolicy::Exit);
    }
}
