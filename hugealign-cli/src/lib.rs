/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Compares the alignment of a large plain heap allocation against an
//! alignment-constrained allocation of the same size, to see whether the
//! platform allocator hands out huge-page aligned (2 MiB, 1 GiB) buffers.

// Treat all Clippy warnings as errors.
#![deny(clippy::all)]

pub mod buffer;
mod error;
pub mod hugepages;
pub mod probe;
pub mod report;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::bail;
pub use buffer::HeapBuffer;
pub use error::AllocFailed;
pub use error::Context;
pub use error::Error;
pub use probe::Probe;
pub use report::AllocationReport;

/// What to do when the allocator returns null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Print the null address like any other and carry on.
    #[default]
    Report,
    /// Print the line for the failed probe, then stop with an error.
    Exit,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "report" => Ok(Self::Report),
            "exit" => Ok(Self::Exit),
            _ => bail!("unknown failure policy {s:?}, expected \"report\" or \"exit\""),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Report => "report",
            Self::Exit => "exit",
        };
        write!(f, "{s}")
    }
}

/// Runs the default probes at 4 GiB, writing one line per probe to `out`.
pub fn run<W: Write>(policy: FailurePolicy, out: &mut W) -> Result<(), Error> {
    let size = probe::probe_size()?;
    run_probes(&Probe::DEFAULT, size, policy, out)
}

/// Runs each probe in turn. Every buffer is freed before the next probe
/// allocates, so at most one is live at a time.
pub fn run_probes<W: Write>(
    probes: &[Probe],
    size: usize,
    policy: FailurePolicy,
    out: &mut W,
) -> Result<(), Error> {
    for probe in probes {
        let report = probe.run(size)?;
        writeln!(out, "{report}").context("Failed to write report")?;

        if report.is_null() && policy == FailurePolicy::Exit {
            out.flush()?;
            return Err(AllocFailed {
                probe: probe.label(),
                size,
                align: probe.align(),
            })
            .context("allocation probe failed");
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use alignment::HUGE_2MIB;
    use pretty_assertions::assert_eq;

    use super::*;

    fn output_lines(out: Vec<u8>) -> Vec<AllocationReport> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| line.parse().unwrap())
            .collect()
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("report".parse::<FailurePolicy>().unwrap(), FailurePolicy::Report);
        assert_eq!("exit".parse::<FailurePolicy>().unwrap(), FailurePolicy::Exit);
        assert!("abort".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default().to_string(), "report");
    }

    #[test]
    fn one_line_per_probe_in_order() {
        let probes = [Probe::Malloc, Probe::AlignedAlloc { align: HUGE_2MIB }];
        let mut out = Vec::new();
        run_probes(&probes, 4 * HUGE_2MIB, FailurePolicy::Exit, &mut out).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.ends_with('\n'));
        let reports = output_lines(out);
        assert_eq!(
            reports.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
            ["malloc", "aligned_alloc"]
        );
        assert!(reports.iter().all(|r| r.size == 8 << 20));
        assert!(reports[1].aligned_2mib);
        assert!(text.starts_with("malloc 8MiB = 0x"));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn null_is_reported_by_default() {
        let probes = [Probe::Malloc, Probe::Malloc];
        let mut out = Vec::new();
        run_probes(&probes, 1 << 62, FailurePolicy::Report, &mut out).unwrap();

        let reports = output_lines(out);
        assert_eq!(reports.len(), 2);
        for report in reports {
            assert!(report.is_null());
            assert!(report.aligned_2mib && report.aligned_1gib);
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn null_stops_with_exit_policy() {
        let probes = [Probe::Malloc, Probe::AlignedAlloc { align: HUGE_2MIB }];
        let mut out = Vec::new();
        let err = run_probes(&probes, 1 << 62, FailurePolicy::Exit, &mut out).unwrap_err();

        assert_eq!(
            err.downcast_ref::<AllocFailed>(),
            Some(&AllocFailed {
                probe: "malloc",
                size: 1 << 62,
                align: 1,
            })
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "malloc 4294967296GiB = 0x0; 2MiB aligned? 1; 1GiB aligned? 1\n"
        );
    }
}
