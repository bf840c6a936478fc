pub mod preview;

pub use preview::{PreviewMixer, PreviewPlayer};
