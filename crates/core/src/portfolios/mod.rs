//! Portfolios module - domain models, services, and traits.

mod portfolios_model;
mod portfolios_service;
mod portfolios_traits;

mod portfolios_service_tests;

// Re-export the public interface
pub use portfolios_model::{
    HoldingView, NewPortfolio, Portfolio, PortfolioSnapshot, PortfolioUpdate,
};
pub use portfolios_service::PortfolioService;
pub use portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};
