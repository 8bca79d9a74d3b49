pub mod dataset;
pub mod item;

pub use dataset::{Dataset, Membership};
pub use item::Item;
