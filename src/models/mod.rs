pub mod cafe;

pub use cafe::{Cafe, CafeInput, CafeView, FieldErrors};
