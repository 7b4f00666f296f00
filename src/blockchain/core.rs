// Ledger core, one submodule per concern.
pub mod batch;
pub mod block;
pub mod chain;
pub mod state;
pub mod validation;

pub use batch::*;
pub use block::*;
pub use chain::*;
pub use state::*;
pub use validation::*;
