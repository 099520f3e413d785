//! User directory, login check and username colors.

mod color;
mod directory;

pub use color::{assign_color, UserColor, PALETTE};
pub use directory::{User, UserDirectory};
