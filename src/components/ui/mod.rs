pub mod button;
pub mod card;
pub mod label;

// Re-export component symbols so callers can `use crate::components::ui::Button` etc.
pub use button::*;
pub use card::*;
pub use label::*;
