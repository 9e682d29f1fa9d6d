//! Render hosts

mod headless;

pub use headless::HeadlessHost;
