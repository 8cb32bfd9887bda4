pub mod greeting;

pub use greeting::{decode, encode};
