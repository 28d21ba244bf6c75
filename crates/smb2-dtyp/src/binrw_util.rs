//! Utility types for the binrw crate.

pub mod file_time;

pub mod prelude {
    pub use super::file_time::FileTime;
}
