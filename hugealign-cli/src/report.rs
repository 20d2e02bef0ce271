/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The one-line summary printed for each probe, e.g.
//!
//! ```text
//! aligned_alloc 4GiB = 0x7f4c40000000; 2MiB aligned? 1; 1GiB aligned? 1
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use alignment::is_aligned;
use alignment::HUGE_1GIB;
use alignment::HUGE_2MIB;
use anyhow::anyhow;
use anyhow::bail;
use regex::Regex;

use crate::Context;
use crate::Error;

const UNITS: [(&str, u32); 3] = [("GiB", 30), ("MiB", 20), ("KiB", 10)];

/// Renders `bytes` in the largest binary unit that divides it exactly, so
/// 4 GiB is `4GiB` and 3 KiB is `3KiB`.
pub fn size_label(bytes: u64) -> String {
    for (unit, shift) in UNITS {
        if bytes != 0 && bytes % (1 << shift) == 0 {
            return format!("{}{unit}", bytes >> shift);
        }
    }
    format!("{bytes}B")
}

/// Inverse of [`size_label`].
pub fn parse_size_label(s: &str) -> Result<u64, Error> {
    let (digits, shift) = UNITS
        .iter()
        .find_map(|(unit, shift)| s.strip_suffix(unit).map(|digits| (digits, *shift)))
        .or_else(|| s.strip_suffix('B').map(|digits| (digits, 0)))
        .ok_or_else(|| anyhow!("size {s:?} has no unit"))?;

    let count: u64 = digits
        .parse()
        .with_context(|| format!("invalid size {s:?}"))?;
    count
        .checked_mul(1 << shift)
        .ok_or_else(|| anyhow!("size {s:?} overflows"))
}

/// What one probe observed about its allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationReport {
    /// Name of the allocation primitive, e.g. `malloc`.
    pub label: String,
    pub size: u64,
    /// Base address, or zero if the allocator returned null.
    pub addr: usize,
    pub aligned_2mib: bool,
    pub aligned_1gib: bool,
}

impl AllocationReport {
    pub fn new(label: impl Into<String>, size: u64, addr: usize) -> Self {
        Self {
            label: label.into(),
            size,
            addr,
            aligned_2mib: is_aligned(addr, HUGE_2MIB),
            aligned_1gib: is_aligned(addr, HUGE_1GIB),
        }
    }

    pub fn is_null(&self) -> bool {
        self.addr == 0
    }
}

impl fmt::Display for AllocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:#x}` renders exactly as `{:p}` does for a pointer, null included.
        write!(
            f,
            "{} {} = {:#x}; 2MiB aligned? {}; 1GiB aligned? {}",
            self.label,
            size_label(self.size),
            self.addr,
            u8::from(self.aligned_2mib),
            u8::from(self.aligned_1gib),
        )
    }
}

fn parse_flag(s: &str) -> Result<bool, Error> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => bail!("expected 0 or 1, got {s:?}"),
    }
}

impl FromStr for AllocationReport {
    type Err = Error;

    /// Parses a line as printed by `Display`. The alignment fields are taken
    /// as printed, not recomputed from the address.
    fn from_str(line: &str) -> Result<Self, Error> {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"^(\S+) (\S+) = 0x([0-9a-f]+); 2MiB aligned\? (\S+); 1GiB aligned\? (\S+)$",
            )
            .expect("valid report regex")
        });

        let caps = RE
            .captures(line.trim_end_matches('\n'))
            .ok_or_else(|| anyhow!("not an allocation report: {line:?}"))?;

        Ok(Self {
            label: caps[1].to_owned(),
            size: parse_size_label(&caps[2])?,
            addr: usize::from_str_radix(&caps[3], 16)
                .with_context(|| format!("invalid address 0x{}", &caps[3]))?,
            aligned_2mib: parse_flag(&caps[4]).context("2MiB aligned field")?,
            aligned_1gib: parse_flag(&caps[5]).context("1GiB aligned field")?,
        })
    }
}
