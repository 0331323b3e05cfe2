//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

mod admin_log;
pub use admin_log::{AdminLog, AdminLogCore, NewAdminLog};

mod petition;
pub use petition::{NewPetition, OfficialResponse, Petition, PetitionCore};

mod poll;
pub use poll::{NewPoll, Poll, PollCore};

mod signature;
pub use signature::{NewSignature, Signature, SignatureCore};

mod user;
pub use user::{NewUser, User, UserCore};

mod vote;
pub use vote::{NewVote, Vote, VoteCore};
