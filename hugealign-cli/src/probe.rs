/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::alloc::Layout;

use alignment::FOUR_GIB;
use alignment::HUGE_1GIB;
use tracing::debug;
use tracing::warn;

use crate::buffer::HeapBuffer;
use crate::report::AllocationReport;
use crate::Context;
use crate::Error;

/// An allocation primitive to exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The default allocator with no alignment constraint.
    Malloc,
    /// An alignment-constrained allocation. `align` must be a power of two.
    AlignedAlloc { align: usize },
}

impl Probe {
    /// The probes run by the `hugealign` binary, in order.
    pub const DEFAULT: [Probe; 2] = [Probe::Malloc, Probe::AlignedAlloc { align: HUGE_1GIB }];

    pub fn label(&self) -> &'static str {
        match self {
            Probe::Malloc => "malloc",
            Probe::AlignedAlloc { .. } => "aligned_alloc",
        }
    }

    /// The requested alignment. A plain `malloc` asks for none, which is an
    /// alignment of one.
    pub fn align(&self) -> usize {
        match self {
            Probe::Malloc => 1,
            Probe::AlignedAlloc { align } => *align,
        }
    }

    pub fn layout(&self, size: usize) -> Result<Layout, Error> {
        Layout::from_size_align(size, self.align()).with_context(|| {
            format!(
                "invalid {} layout: size={size} align={:#x}",
                self.label(),
                self.align()
            )
        })
    }

    /// Allocates `size` bytes, inspects the base address, and frees the
    /// buffer again before returning.
    pub fn run(&self, size: usize) -> Result<AllocationReport, Error> {
        let layout = self.layout(size)?;
        let buffer = HeapBuffer::allocate(layout)?;

        let report = AllocationReport::new(self.label(), size as u64, buffer.addr());
        if buffer.is_null() {
            warn!(
                probe = self.label(),
                size,
                align = self.align(),
                "allocation returned null"
            );
        } else {
            debug!(
                probe = self.label(),
                addr = ?buffer.as_ptr(),
                aligned_2mib = report.aligned_2mib,
                aligned_1gib = report.aligned_1gib,
                "allocated"
            );
        }
        drop(buffer);

        Ok(report)
    }
}

/// Size of each probe's buffer on this platform.
pub fn probe_size() -> Result<usize, Error> {
    usize::try_from(FOUR_GIB)
        .with_context(|| format!("{FOUR_GIB} bytes does not fit in a {}-bit usize", usize::BITS))
}
