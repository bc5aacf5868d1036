pub mod file_access;
pub mod sample;

pub use file_access::FileAccessPlugin;
pub use sample::SamplePlugin;
