//! The songswap discovery session controller.
//!
//! Front-ends send [`state::action::Action`]s to the [`state::Dispatcher`], and render the
//! snapshots the stores send back. The rules of the session itself live in [`session`].

pub mod notice;
pub mod session;
pub mod state;
pub mod termination;
