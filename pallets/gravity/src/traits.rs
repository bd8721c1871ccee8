//! Capabilities the bridge consumes from the rest of the runtime, and the hook it exposes
//! back to staking.

use crate::types::Coin;
use codec::{Decode, Encode};
use scale_info::TypeInfo;
use sp_runtime::{DispatchError, Perbill, RuntimeDebug};
use sp_std::prelude::*;

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct DenomUnit {
	pub denom: Vec<u8>,
	pub exponent: u32,
}

/// Display metadata registered for a host-chain denom.
#[derive(Clone, Default, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct DenomMetadata {
	pub base: Vec<u8>,
	pub display: Vec<u8>,
	pub name: Vec<u8>,
	pub symbol: Vec<u8>,
	pub denom_units: Vec<DenomUnit>,
}

impl DenomMetadata {
	/// Exponent of the display unit, or zero when no unit matches the display denom.
	pub fn decimals(&self) -> u64 {
		self.denom_units
			.iter()
			.find(|unit| unit.denom == self.display)
			.map(|unit| unit.exponent as u64)
			.unwrap_or_default()
	}
}

/// Token ledger of the host chain. Module-scoped operations act on the account derived
/// from the given module account.
pub trait BankKeeper<AccountId> {
	fn mint_coins(module: &AccountId, coin: &Coin) -> Result<(), DispatchError>;
	fn burn_coins(module: &AccountId, coin: &Coin) -> Result<(), DispatchError>;
	fn send_from_module_to_account(
		module: &AccountId,
		to: &AccountId,
		coin: &Coin,
	) -> Result<(), DispatchError>;
	fn send_from_account_to_module(
		from: &AccountId,
		module: &AccountId,
		coin: &Coin,
	) -> Result<(), DispatchError>;
	fn get_all_balances(who: &AccountId) -> Vec<Coin>;
	fn get_balance(who: &AccountId, denom: &[u8]) -> u128;
	fn get_denom_metadata(denom: &[u8]) -> Option<DenomMetadata>;
	fn set_denom_metadata(metadata: DenomMetadata);
}

#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub enum BondStatus {
	Bonded,
	Unbonding,
	Unbonded,
}

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct ValidatorInfo<AccountId> {
	pub operator: AccountId,
	/// Consensus power, already scaled down by the staking power reduction.
	pub power: u64,
	pub status: BondStatus,
	pub jailed: bool,
	/// Host block at which unbonding began, zero if never.
	pub unbonding_height: u64,
}

impl<AccountId> ValidatorInfo<AccountId> {
	pub fn is_bonded(&self) -> bool {
		self.status == BondStatus::Bonded
	}
}

pub trait StakingKeeper<AccountId> {
	/// Bonded validators, highest power first.
	fn bonded_validators_by_power() -> Vec<ValidatorInfo<AccountId>>;
	fn validator(who: &AccountId) -> Option<ValidatorInfo<AccountId>>;
	fn last_total_power() -> u64;
	/// Validators whose unbonding completes at or before the given time and height.
	fn validator_queue(unbond_time_ms: u64, height: u64) -> Vec<AccountId>;
	/// Unbonding period in milliseconds.
	fn unbonding_time() -> u64;
	fn slash(who: &AccountId, height: u64, power: u64, fraction: Perbill);
	fn jail(who: &AccountId);
}

#[derive(Clone, Copy, Default, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct ValidatorSigningInfo {
	/// Host block from which the validator is expected to sign.
	pub start_height: u64,
	pub jailed_until: u64,
}

pub trait SlashingKeeper<AccountId> {
	fn validator_signing_info(who: &AccountId) -> Option<ValidatorSigningInfo>;
}

/// Staking lifecycle notifications the bridge listens to.
pub trait StakingHooks<AccountId> {
	fn after_validator_begin_unbonding(who: &AccountId);
}
