/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Host settings that decide whether an aligned buffer can end up backed by
//! huge pages. These are only ever logged; nothing here changes them.

use std::fmt;
use std::sync::LazyLock;

use anyhow::anyhow;
use anyhow::bail;
use nix::unistd::SysconfVar;
use regex::bytes::Regex;
use tracing::debug;
use tracing::info;

use crate::Context;
use crate::Error;

// See: https://www.kernel.org/doc/Documentation/vm/transhuge.txt
pub const HUGEPAGE_ENABLED_PATH: &str = "/sys/kernel/mm/transparent_hugepage/enabled";
pub const HPAGE_PMD_SIZE_PATH: &str = "/sys/kernel/mm/transparent_hugepage/hpage_pmd_size";

/// The transparent hugepage mode selected in [`HUGEPAGE_ENABLED_PATH`].
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum HugepageSetting {
    Always,
    MAdvise,
    Never,
}

impl HugepageSetting {
    fn from_bytes(input: &[u8]) -> Result<Self, Error> {
        match input {
            b"always" => Ok(Self::Always),
            b"madvise" => Ok(Self::MAdvise),
            b"never" => Ok(Self::Never),
            _ => bail!(
                "unknown transparent_hugepage setting {}",
                String::from_utf8_lossy(input)
            ),
        }
    }
}

impl fmt::Display for HugepageSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Always => "always",
            Self::MAdvise => "madvise",
            Self::Never => "never",
        };
        write!(f, "{s}")
    }
}

/// Picks the bracketed entry out of e.g. `always [madvise] never`.
pub fn parse_hugepage_enabled(input: &[u8]) -> Result<HugepageSetting, Error> {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("valid hugepage regex"));

    let selected = RE
        .captures(input)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| {
            anyhow!(
                "could not match hugepages input: {}",
                String::from_utf8_lossy(input)
            )
        })?;

    HugepageSetting::from_bytes(selected.as_bytes())
}

pub fn parse_hugepage_size(input: &str) -> Result<usize, Error> {
    // always terminated by \n
    let trimmed = input.trim_end_matches('\n');
    trimmed
        .parse()
        .with_context(|| format!("invalid huge page size {trimmed:?}"))
}

#[cfg(target_os = "linux")]
pub fn read_hugepage_setting() -> Result<HugepageSetting, Error> {
    let contents = std::fs::read(HUGEPAGE_ENABLED_PATH)
        .with_context(|| format!("Failed to read {HUGEPAGE_ENABLED_PATH}"))?;
    parse_hugepage_enabled(&contents)
}

#[cfg(target_os = "linux")]
pub fn read_hugepage_size() -> Result<usize, Error> {
    let contents = std::fs::read_to_string(HPAGE_PMD_SIZE_PATH)
        .with_context(|| format!("Failed to read {HPAGE_PMD_SIZE_PATH}"))?;
    parse_hugepage_size(&contents)
}

/// The base page size, `sysconf(_SC_PAGESIZE)`.
pub fn page_size() -> Result<usize, Error> {
    let page_size = nix::unistd::sysconf(SysconfVar::PAGE_SIZE)
        .context("sysconf(_SC_PAGESIZE) failed")?
        .ok_or_else(|| anyhow!("sysconf(_SC_PAGESIZE) has no value"))?;
    usize::try_from(page_size).with_context(|| format!("invalid page size {page_size}"))
}

/// Logs whatever we can find out about page sizes on this host. Nothing here
/// is fatal: a missing sysfs file is only a debug message.
pub fn log_host_settings() {
    match page_size() {
        Ok(page_size) => info!(page_size, "base page size"),
        Err(err) => debug!("{err:#}"),
    }

    #[cfg(target_os = "linux")]
    {
        match read_hugepage_setting() {
            Ok(setting) => info!(%setting, "transparent_hugepage setting"),
            Err(err) => debug!("{err:#}"),
        }
        match read_hugepage_size() {
            Ok(hpage_pmd_size) => info!(hpage_pmd_size, "transparent huge page size"),
            Err(err) => debug!("{err:#}"),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        debug!("not running on linux; no transparent hugepage setting to read");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_hugepage() {
        assert_eq!(
            HugepageSetting::MAdvise,
            parse_hugepage_enabled(b"always [madvise] never\n").unwrap()
        );
        assert_eq!(
            HugepageSetting::Never,
            parse_hugepage_enabled(b"always madvise [never]\n").unwrap()
        );
        assert_eq!(
            HugepageSetting::Always,
            parse_hugepage_enabled(b"[always] madvise never\n").unwrap()
        );
    }

    #[test]
    fn parse_hugepage_errors() {
        assert!(parse_hugepage_enabled(b"always madvise never\n").is_err());
        assert!(parse_hugepage_enabled(b"always [sometimes] never\n").is_err());
    }

    #[test]
    fn setting_round_trips_through_display() {
        for setting in [
            HugepageSetting::Always,
            HugepageSetting::MAdvise,
            HugepageSetting::Never,
        ] {
            let line = format!("x [{setting}] y");
            assert_eq!(parse_hugepage_enabled(line.as_bytes()).unwrap(), setting);
        }
    }

    #[test]
    fn parse_size() {
        assert_eq!(parse_hugepage_size("2097152\n").unwrap(), 2 << 20);
        assert!(parse_hugepage_size("two megs\n").is_err());
    }

    #[test]
    fn page_size_is_power_of_two() {
        let page_size = page_size().unwrap();
        assert!(page_size.is_power_of_two(), "page_size={page_size}");
    }

    #[test]
    fn logging_never_panics() {
        log_host_settings();
    }
}
