//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Every seam of the system (commands, queries, database and document store
/// operations) is expressed as a [`Handler`] of some arguments.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
