pub mod repository;

pub use repository::LedgerRepository;
