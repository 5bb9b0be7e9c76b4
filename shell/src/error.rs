//! Command handler return contract.
//!
//! Handlers return `Ok(())` on success. Everything else is a `CmdError`
//! that the dispatcher turns into exactly one diagnostic line — except
//! `Failed`, which means the handler already explained itself and the
//! dispatcher must stay silent.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmdError {
    /// Index of the first bad argument (1-based, argv[0] is the command).
    BadArg(usize),
    /// Wrong number of arguments for this keyword.
    MissingArg,
    /// No such command in the active or main directory.
    NotFound,
    /// The handler printed its own explanation.
    Failed,
}

pub type CmdResult = Result<(), CmdError>;
