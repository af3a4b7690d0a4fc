pub mod net;
pub mod platform;
pub mod intent;
pub mod route;

// Session core: permission arbitration, file chooser, page lifecycle
pub mod permission;
pub mod chooser;
pub mod navigation;

pub mod browser;
pub mod config;

pub use browser::{Browser, Host};
pub use config::BrowserOptions;
pub use platform::{BrowserEvent, RendererEvent};
