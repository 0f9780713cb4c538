//! # Contract Ids and Addresses
//!
//! Network id hashing, contract id derivation and strkey rendering of the
//! XDR address types.
//!
//! ```text
//! contract_id = sha256( xdr( HashIdPreimage::ContractId {
//!                   network_id: sha256(passphrase),
//!                   contract_id_preimage,
//!               }))
//! ```

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AccountId, ContractIdPreimage, ContractIdPreimageFromAddress, Hash, HashIdPreimage,
    HashIdPreimageContractId, Limits, MuxedAccount, PublicKey, ScAddress, WriteXdr,
};

use super::errors::ProcessorError;
use super::value_objects::{MAINNET_PASSPHRASE, TESTNET_PASSPHRASE};

/// SHA-256 of a network passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(pub [u8; 32]);

impl NetworkId {
    /// Hash a network passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(Sha256::digest(passphrase.as_bytes()).into())
    }

    /// Public test network.
    pub fn testnet() -> Self {
        Self::from_passphrase(TESTNET_PASSPHRASE)
    }

    /// Public main network.
    pub fn mainnet() -> Self {
        Self::from_passphrase(MAINNET_PASSPHRASE)
    }
}

/// Derive the `C...` strkey of a contract deployed from an address preimage.
pub fn derive_contract_id(
    network_id: &NetworkId,
    preimage: &ContractIdPreimageFromAddress,
) -> Result<String, ProcessorError> {
    let hash_preimage = HashIdPreimage::ContractId(HashIdPreimageContractId {
        network_id: Hash(network_id.0),
        contract_id_preimage: ContractIdPreimage::Address(preimage.clone()),
    });
    let bytes = hash_preimage
        .to_xdr(Limits::none())
        .map_err(|e| ProcessorError::ContractId(e.to_string()))?;
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    Ok(stellar_strkey::Contract(digest).to_string())
}

/// Strkey of an account or contract address.
///
/// Muxed, claimable balance and liquidity pool addresses are rejected.
pub fn sc_address_strkey(address: &ScAddress) -> Result<String, ProcessorError> {
    match address {
        ScAddress::Account(account) => Ok(account_id_strkey(account)),
        ScAddress::Contract(contract) => Ok(stellar_strkey::Contract((contract.0).0).to_string()),
        other => Err(ProcessorError::UnsupportedAddress(
            other.discriminant().name().to_string(),
        )),
    }
}

/// `G...` strkey of an account id.
pub fn account_id_strkey(account: &AccountId) -> String {
    let PublicKey::PublicKeyTypeEd25519(key) = &account.0;
    stellar_strkey::ed25519::PublicKey(key.0).to_string()
}

/// `G...` strkey of the account behind a possibly multiplexed account.
pub fn muxed_account_strkey(account: &MuxedAccount) -> String {
    let key = match account {
        MuxedAccount::Ed25519(key) => key,
        MuxedAccount::MuxedEd25519(muxed) => &muxed.ed25519,
    };
    stellar_strkey::ed25519::PublicKey(key.0).to_string()
}
