pub mod args;
pub mod config;
pub mod filter;
pub mod pick;
pub mod picker;
pub mod runner;
pub mod synthetic;
pub mod util;
pub mod wavefile;
pub mod waveform;

pub use config::{PalConfig, PickerConfig};
pub use pick::{Pick, PickSet};
pub use picker::StaLtaPca;
pub use waveform::{Trace, Waveform};
