//! Shared constants for the Paperdesk core.

/// Well-known identifier of the portfolio that is auto-created on first access.
pub const DEFAULT_PORTFOLIO_ID: &str = "default";

/// Display name given to the auto-created default portfolio.
pub const DEFAULT_PORTFOLIO_NAME: &str = "Default Portfolio";

/// Base currency assumed when none is supplied.
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Opening cash balance of the auto-created default portfolio.
pub const DEFAULT_OPENING_CASH: &str = "100000";

/// Number of recent trades included in a plan context.
pub const CONTEXT_RECENT_TRADES: usize = 20;

/// Maximum number of daily candles included per held symbol.
pub const CONTEXT_MAX_CANDLES: usize = 60;
