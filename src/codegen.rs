mod frame;
mod interface;
mod x86_64;
mod x86_64_env;

pub use frame::{FrameLayout, Slot, FRAME_ALIGNMENT};
pub use interface::{generate, generate_to, Target};
