// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Mutation tracking errors.
#[derive(Error, Debug)]
pub enum Error {
    /// The diff filter selects no sides or no categories,
    /// so the requested diff would always be empty.
    #[error("the diff filter selects nothing")]
    InvalidFilter,

    /// `range` was called without a root node while the tracked mutations
    /// span disconnected trees.
    ///
    /// Retry with an explicit root that contains the nodes of interest.
    #[error("mutations span disconnected trees")]
    DisconnectedRange,

    /// `revert` could not place some groups of nodes because both of their
    /// boundary siblings are still unknown.
    ///
    /// All other groups were reverted; the value is the number of groups
    /// that were skipped.
    #[error("{0} node group(s) were not reverted: both boundary siblings are unknown")]
    InsufficientInformation(usize),
}

/// A specialized `Result` type where the error is hard-wired to [`Error`].
///
/// [`Error`]: enum.Error.html
pub type Result<T> = std::result::Result<T, Error>;
