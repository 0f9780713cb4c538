//! # Value Objects
//!
//! Protocol constants and defaults shared by the ingestion pipeline.

/// Passphrase of the Stellar public test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Passphrase of the Stellar public main network.
pub const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Default RPC endpoint for the test network.
pub const DEFAULT_RPC_URL: &str = "https://soroban-testnet.stellar.org";

/// Maximum depth of an authorization invocation tree.
///
/// The protocol builds these trees acyclically, the limit only bounds the
/// work done on malformed input.
pub const MAX_INVOCATION_DEPTH: usize = 64;

/// Fixed pause between attempts to fetch a ledger that is not available yet.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;

/// Number of ledgers requested per fetch from the backend.
pub const DEFAULT_GET_LEDGERS_LIMIT: u32 = 100;

/// Contract function creating a single-release escrow.
pub const SINGLE_RELEASE_ESCROW_FN: &str = "tw_new_single_release_escrow";

/// Contract function creating a multi-release escrow.
pub const MULTI_RELEASE_ESCROW_FN: &str = "tw_new_multi_release_escrow";
