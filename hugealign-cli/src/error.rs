/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

pub type Error = anyhow::Error;

pub use anyhow::Context;

/// The allocator returned null for a probe's request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocFailed {
    /// Which primitive was exercised, e.g. `malloc`.
    pub probe: &'static str,
    pub size: usize,
    pub align: usize,
}

impl fmt::Display for AllocFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} bytes (alignment {:#x}) returned null",
            self.probe, self.size, self.align
        )
    }
}

impl std::error::Error for AllocFailed {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn alloc_failed_chain() {
        let error = Error::from(AllocFailed {
            probe: "aligned_alloc",
            size: 4096,
            align: 1 << 30,
        })
        .context("allocation probe failed");

        assert_eq!(
            error
                .chain()
                .map(ToString::to_string)
                .collect::<Vec<String>>(),
            [
                "allocation probe failed",
                "aligned_alloc of 4096 bytes (alignment 0x40000000) returned null",
            ]
        );
        assert!(error.downcast_ref::<AllocFailed>().is_some());
    }
}
