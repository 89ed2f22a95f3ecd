pub mod secondary;

pub use secondary::SecondaryExecutor;
