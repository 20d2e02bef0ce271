/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::alloc::GlobalAlloc;
use std::alloc::Layout;
use std::alloc::System;
use std::ptr;
use std::ptr::NonNull;

use anyhow::ensure;

use crate::Error;

/// Owns a heap allocation made through the system allocator and frees it on
/// drop. The memory is never read or written, so on an overcommitting OS the
/// pages are never faulted in.
///
/// A null return from the allocator is kept as an empty buffer instead of an
/// error, so callers can still report on it.
#[derive(Debug)]
pub struct HeapBuffer {
    ptr: Option<NonNull<u8>>,
    layout: Layout,
}

impl HeapBuffer {
    /// Requests `layout` from [`System`]. For alignments no larger than the
    /// platform's minimum this is a plain `malloc`; larger alignments go
    /// through `posix_memalign` or the platform's equivalent.
    pub fn allocate(layout: Layout) -> Result<Self, Error> {
        // GlobalAlloc::alloc is undefined for zero-sized layouts.
        ensure!(layout.size() > 0, "cannot allocate a zero-sized buffer");

        let ptr = unsafe { System.alloc(layout) };
        Ok(Self {
            ptr: NonNull::new(ptr),
            layout,
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr().cast_const())
    }

    /// The base address as a pointer-width integer. Zero if the allocation
    /// failed.
    pub fn addr(&self) -> usize {
        self.as_ptr() as usize
    }
}

impl Drop for HeapBuffer {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr {
            unsafe { System.dealloc(ptr.as_ptr(), self.layout) };
        }
    }
}
