pub mod model;
pub mod repository;

pub use model::{NewPortfolioDB, PortfolioDB, PositionDB};
pub use repository::PortfolioRepository;
