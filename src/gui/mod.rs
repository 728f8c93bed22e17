//! Terminal user interface: figure viewer and device selector.

mod device_selector;
mod error;
mod figure_viewer;

pub use device_selector::device_selector;
pub use error::GuiError;
pub use figure_viewer::show_figures;
