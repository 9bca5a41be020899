//! Celebrity entries and votes.

mod memory;
mod models;
mod postgres;
mod store;

pub use memory::MemoryCelebrityStore;
pub use models::{
    Celebrity, CelebritySummary, CelebrityUpdate, ImageRecord, NewCelebrity, SEED_CELEBRITIES,
    VoteTotals, VoteType, approval_flag, slugify,
};
pub use postgres::PgCelebrityStore;
pub use store::{CelebrityStore, SharedStore};
