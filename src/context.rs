// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{Buffer, LogStream};

/// State handed to every bring-up component: where to report progress and how chatty to be.
#[derive(Debug)]
pub struct Context {
    pub out_stream: LogStream,
    pub verbose: bool,
}

impl Context {
    pub fn new(verbose: bool) -> Self {
        Context {
            out_stream: LogStream::new_stdout(),
            verbose,
        }
    }

    /// A context whose output is captured in `buffer`.
    pub fn buffered(buffer: Buffer) -> Self {
        Context {
            out_stream: LogStream::Buffer(buffer),
            verbose: true,
        }
    }

    /// Report a step of the bring-up.
    pub fn info(&self, line: &str) {
        self.write(line);
    }

    /// Report a detail that is only interesting with `--verbose`, such as the exact command run.
    pub fn detail(&self, line: &str) {
        if self.verbose {
            self.write(line);
        }
    }

    /// Progress output is best effort: a closed stdout must not abort a bring-up.
    fn write(&self, line: &str) {
        if let Err(e) = self.out_stream.writeln(line) {
            log::warn!("could not write progress output: {e}");
        }
    }
}
