/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fs::File;
use std::io;
use std::io::IsTerminal;
use std::io::stderr;

use hugealign::Error;
use tracing::Subscriber;
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_TRACE_LEVEL: LevelFilter = LevelFilter::WARN;

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}

/// Returns a non-blocking subscriber for logging to a file.
fn file_subscriber(level: LevelFilter, f: File) -> (impl Subscriber, impl Drop) {
    let (writer, guard) = tracing_appender::non_blocking(f);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(writer)
        .with_ansi(false)
        .finish();

    (subscriber, guard)
}

/// Initializes tracing to the given file `f`.
#[must_use = "This function returns a guard that should not be immediately dropped"]
pub fn init_file_tracing(level: Option<LevelFilter>, f: File) -> Result<impl Drop, Error> {
    let level = level.unwrap_or(DEFAULT_TRACE_LEVEL);

    let (subscriber, guard) = file_subscriber(level, f);
    subscriber.try_init()?;

    Ok(guard)
}

/// Returns a tracing subscriber that logs to `stderr`.
///
/// NOTE: Writes to stderr are unbuffered, so this may be slow.
pub fn stderr_subscriber(level: Option<LevelFilter>) -> impl Subscriber {
    let level = level.unwrap_or(DEFAULT_TRACE_LEVEL);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(io::stderr)
        .with_ansi(stderr().is_terminal())
        .finish()
}

/// Initializes tracing to `stderr`.
pub fn init_stderr_tracing(level: Option<LevelFilter>) -> Result<(), Error> {
    stderr_subscriber(level).try_init()?;
    Ok(())
}
