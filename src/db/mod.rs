pub mod repository;

pub use repository::LocalStorage;
