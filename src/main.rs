/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use newt::Cli;

fn main() {
    if let Err(e) = newt::run(Cli::parse()) {
        eprintln!("{} error: {e:#}", env!("CARGO_PKG_NAME"));
        std::process::exit(1);
    }
}
