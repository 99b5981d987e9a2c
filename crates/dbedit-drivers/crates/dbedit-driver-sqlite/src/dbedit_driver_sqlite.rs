//! SQLite database driver implementation

mod connection;

pub use connection::SqliteConnection;
