//! UI layer for the reader control window.

pub mod app;

pub use app::ThreadReaderApp;
