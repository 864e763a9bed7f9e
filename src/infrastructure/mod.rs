// Infrastructure - persistence for pages

pub mod database; // Page repository interface
pub mod sqlite_database; // SQLite implementation

pub use database::PageRepository;
pub use sqlite_database::SqlitePageRepository;
