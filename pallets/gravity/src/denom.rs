//! Mapping between host-chain denoms and ERC20 contracts.
//!
//! Ethereum-originated tokens are represented by a voucher denom derived from the contract
//! address (`gravity0x` followed by the lowercase hex address). Host-originated denoms get
//! an ERC20 through an observed deployment and are tracked in both directions.

use crate::pallet::*;
use crate::types::{EthAddress, GRAVITY_DENOM_PREFIX};
use sp_core::H160;
use sp_std::prelude::*;

/// Voucher denom for an Ethereum-originated token.
pub fn gravity_denom(token_contract: &EthAddress) -> Vec<u8> {
	let mut denom = GRAVITY_DENOM_PREFIX.to_vec();
	denom.extend_from_slice(b"0x");
	denom.extend_from_slice(hex::encode(token_contract.as_bytes()).as_bytes());
	denom
}

/// Inverse of `gravity_denom`. Only the canonical lowercase form parses.
pub fn parse_gravity_denom(denom: &[u8]) -> Option<EthAddress> {
	let hex_address = denom.strip_prefix(GRAVITY_DENOM_PREFIX)?.strip_prefix(b"0x")?;
	let bytes = hex::decode(hex_address).ok()?;
	if bytes.len() != 20 {
		return None;
	}
	let token_contract = H160::from_slice(&bytes);
	(gravity_denom(&token_contract) == denom).then_some(token_contract)
}

impl<T: Config> Pallet<T> {
	/// Resolves a denom to its ERC20 and whether it originated on this chain.
	pub fn denom_to_erc20_lookup(denom: &[u8]) -> Result<(bool, EthAddress), Error<T>> {
		if let Some(token_contract) = parse_gravity_denom(denom) {
			return Ok((false, token_contract));
		}
		CosmosOriginatedDenomToErc20::<T>::get(denom)
			.map(|token_contract| (true, token_contract))
			.ok_or(Error::<T>::DenomNotBridged)
	}

	/// Resolves an ERC20 to its host denom and whether that denom originated on this chain.
	/// Unknown contracts are Ethereum-originated.
	pub fn erc20_to_denom_lookup(token_contract: &EthAddress) -> (bool, Vec<u8>) {
		match Erc20ToCosmosOriginatedDenom::<T>::get(token_contract) {
			Some(denom) => (true, denom),
			None => (false, gravity_denom(token_contract)),
		}
	}

	pub(crate) fn set_cosmos_originated_denom_to_erc20(denom: Vec<u8>, token_contract: EthAddress) {
		Erc20ToCosmosOriginatedDenom::<T>::insert(token_contract, denom.clone());
		CosmosOriginatedDenomToErc20::<T>::insert(denom, token_contract);
	}
}
