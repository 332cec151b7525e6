pub mod moderator;

pub use moderator::ModeratorGuard;
