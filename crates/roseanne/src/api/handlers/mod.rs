//! API request handlers.

pub mod admin;
pub mod auth;
pub mod celebrities;
pub mod misc;
pub mod votes;

pub use admin::{
    approve_celebrity, bulk_upload, delete_celebrities, fix_image_urls, init_db, list_pending,
    reject_celebrity, test_images,
};
pub use auth::{login, verify};
pub use celebrities::{get_celebrities, submit_celebrity};
pub use misc::{health, method_not_allowed};
pub use votes::cast_vote;
