/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

// Treat all Clippy warnings as errors.
#![deny(clippy::all)]

mod global_opts;
mod tracing;

use std::io;
use std::process::ExitCode;

use colored::*;
use hugealign::Error;

use self::global_opts::GlobalOpts;

fn main() -> ExitCode {
    let global = GlobalOpts::from_env();

    match try_main(&global) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            display_error(err);
            ExitCode::FAILURE
        }
    }
}

fn try_main(global: &GlobalOpts) -> Result<(), Error> {
    let _guard = global.init_tracing()?;

    hugealign::hugepages::log_host_settings();
    hugealign::run(global.on_failure, &mut io::stdout().lock())
}

fn display_error(error: Error) {
    let mut chain = error.chain();

    if let Some(error) = chain.next() {
        eprintln!("{}: {}", "Error".red().bold(), error);
    }

    for cause in chain {
        eprintln!("     {} {}", ">".dimmed().bold(), cause);
    }
}
