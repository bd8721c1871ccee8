use codec::{Decode, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_core::H160;
use sp_runtime::{FixedPointNumber, FixedU128, Perbill, RuntimeDebug};
use sp_std::{
	collections::{btree_map::BTreeMap, btree_set::BTreeSet},
	prelude::*,
};

/// An Ethereum account or contract address.
pub type EthAddress = H160;

/// Reward token used by valsets that carry no reward.
pub const ZERO_ADDRESS: EthAddress = H160([0u8; 20]);

/// Prefix of the host-chain denom minted for Ethereum-originated ERC20 tokens.
pub const GRAVITY_DENOM_PREFIX: &[u8] = b"gravity";

/// A host-chain amount of a single denom.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct Coin {
	pub denom: Vec<u8>,
	pub amount: u128,
}

impl Coin {
	pub fn new(denom: impl Into<Vec<u8>>, amount: u128) -> Self {
		Self { denom: denom.into(), amount }
	}
}

/// An amount of an ERC20 token identified by its contract.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct Erc20Token {
	pub contract: EthAddress,
	pub amount: u128,
}

/// One member of a bridge validator set as the Ethereum contract sees it.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct BridgeValidator {
	pub ethereum_address: EthAddress,
	pub power: u64,
}

#[derive(Clone, Copy, Eq, PartialEq, RuntimeDebug)]
pub enum ValsetError {
	/// A validator set must have at least one member.
	Empty,
	/// Every member must carry some power.
	ZeroPower,
	/// The same Ethereum address appears twice.
	DuplicateAddress,
}

/// A list of bridge validators with the helpers used to compare and order sets.
#[derive(Clone, Default, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct BridgeValidators(pub Vec<BridgeValidator>);

impl BridgeValidators {
	/// Orders members by descending power, ties broken by ascending address bytes.
	///
	/// The Ethereum contract checks signatures against this exact order, so the result
	/// must not depend on the input permutation.
	pub fn sort(&mut self) {
		self.0.sort_by(|a, b| {
			b.power
				.cmp(&a.power)
				.then_with(|| a.ethereum_address.as_bytes().cmp(b.ethereum_address.as_bytes()))
		});
	}

	pub fn total_power(&self) -> u64 {
		self.0.iter().fold(0u64, |acc, v| acc.saturating_add(v.power))
	}

	pub fn validate_basic(&self) -> Result<(), ValsetError> {
		if self.0.is_empty() {
			return Err(ValsetError::Empty);
		}
		let mut seen = BTreeSet::new();
		for member in &self.0 {
			if member.power == 0 {
				return Err(ValsetError::ZeroPower);
			}
			if !seen.insert(member.ethereum_address) {
				return Err(ValsetError::DuplicateAddress);
			}
		}
		Ok(())
	}

	/// Sum of the absolute per-address power changes between two sets, as a fraction of
	/// `u32::MAX`. A member present on one side only counts as a change from or to zero.
	pub fn power_diff(&self, other: &BridgeValidators) -> FixedU128 {
		let mut powers: BTreeMap<EthAddress, i128> = BTreeMap::new();
		for member in &self.0 {
			*powers.entry(member.ethereum_address).or_default() += member.power as i128;
		}
		for member in &other.0 {
			*powers.entry(member.ethereum_address).or_default() -= member.power as i128;
		}
		let delta = powers.values().fold(0u128, |acc, p| acc.saturating_add(p.unsigned_abs()));
		FixedU128::saturating_from_rational(delta, u32::MAX as u128)
	}
}

/// Scales `power` into `[0, u32::MAX]` relative to `total_power`, rounding to nearest.
pub fn normalize_power(power: u64, total_power: u64) -> u64 {
	if total_power == 0 {
		return 0;
	}
	let total = total_power as u128;
	((power as u128 * u32::MAX as u128 + total / 2) / total) as u64
}

/// A validator set snapshot that validators sign for the Ethereum contract.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct Valset {
	pub nonce: u64,
	pub members: Vec<BridgeValidator>,
	pub height: u64,
	pub reward_amount: u128,
	pub reward_token: EthAddress,
}

impl Valset {
	/// Builds a valset with validated and canonically ordered members.
	pub fn new(
		nonce: u64,
		height: u64,
		members: Vec<BridgeValidator>,
		reward_amount: u128,
		reward_token: EthAddress,
	) -> Result<Self, ValsetError> {
		let mut members = BridgeValidators(members);
		members.validate_basic()?;
		members.sort();
		Ok(Self { nonce, members: members.0, height, reward_amount, reward_token })
	}

	pub fn bridge_validators(&self) -> BridgeValidators {
		BridgeValidators(self.members.clone())
	}
}

/// A withdrawal waiting in the pool or carried by a batch.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct OutgoingTransferTx<AccountId> {
	pub id: u64,
	pub sender: AccountId,
	pub dest_address: EthAddress,
	pub erc20_token: Erc20Token,
	pub erc20_fee: Erc20Token,
}

impl<AccountId> OutgoingTransferTx<AccountId> {
	/// What the sender paid in: amount plus fee.
	pub fn total(&self) -> u128 {
		self.erc20_token.amount.saturating_add(self.erc20_fee.amount)
	}
}

/// A set of withdrawals of one ERC20 token executed together on Ethereum.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct OutgoingTxBatch<AccountId> {
	pub batch_nonce: u64,
	/// Ethereum block height after which the batch can no longer execute.
	pub batch_timeout: u64,
	pub transactions: Vec<OutgoingTransferTx<AccountId>>,
	pub token_contract: EthAddress,
	/// Host block the batch was created in.
	pub block: u64,
}

impl<AccountId> OutgoingTxBatch<AccountId> {
	pub fn total_fee(&self) -> u128 {
		self.transactions.iter().fold(0u128, |acc, tx| acc.saturating_add(tx.erc20_fee.amount))
	}
}

/// An arbitrary contract call executed by the Ethereum bridge contract.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct OutgoingLogicCall {
	pub transfers: Vec<Erc20Token>,
	pub fees: Vec<Erc20Token>,
	pub logic_contract_address: EthAddress,
	pub payload: Vec<u8>,
	pub timeout: u64,
	pub invalidation_id: Vec<u8>,
	pub invalidation_nonce: u64,
	pub block: u64,
}

/// Anything validators sign with their Ethereum keys.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub enum EthereumSigned<AccountId> {
	Valset(Valset),
	Batch(OutgoingTxBatch<AccountId>),
	LogicCall(OutgoingLogicCall),
}

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct ValsetConfirm<AccountId> {
	pub nonce: u64,
	pub orchestrator: AccountId,
	pub eth_address: EthAddress,
	pub signature: Vec<u8>,
}

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct BatchConfirm<AccountId> {
	pub nonce: u64,
	pub token_contract: EthAddress,
	pub orchestrator: AccountId,
	pub eth_signer: EthAddress,
	pub signature: Vec<u8>,
}

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct LogicCallConfirm<AccountId> {
	pub invalidation_id: Vec<u8>,
	pub invalidation_nonce: u64,
	pub orchestrator: AccountId,
	pub eth_signer: EthAddress,
	pub signature: Vec<u8>,
}

/// Ethereum height carried by the last observed claim and the host height it was seen at.
#[derive(
	Clone, Copy, Default, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen,
)]
pub struct LastObservedEthereumBlockHeight {
	pub cosmos_block_height: u64,
	pub ethereum_block_height: u64,
}

#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub enum SlashReason {
	MissingValsetConfirm,
	MissingBatchConfirm,
	MissingLogicCallConfirm,
	BadEthSignature,
}

/// Governance-tunable bridge parameters.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct Params {
	/// Domain separator mixed into every checkpoint, at most 32 bytes.
	pub gravity_id: Vec<u8>,
	pub signed_valsets_window: u64,
	pub signed_batches_window: u64,
	pub signed_logic_calls_window: u64,
	/// Milliseconds a batch stays executable on Ethereum.
	pub target_batch_timeout: u64,
	/// Expected Ethereum block time in milliseconds.
	pub average_ethereum_block_time: u64,
	pub slash_fraction_valset: Perbill,
	pub slash_fraction_batch: Perbill,
	pub slash_fraction_logic_call: Perbill,
	pub unbond_slashing_valsets_window: u64,
	pub slash_fraction_bad_eth_signature: Perbill,
	/// Paid on Ethereum to whoever relays a valset update.
	pub valset_reward: Option<Coin>,
}

impl Default for Params {
	fn default() -> Self {
		Self {
			gravity_id: b"defaultgravityid".to_vec(),
			signed_valsets_window: 10_000,
			signed_batches_window: 10_000,
			signed_logic_calls_window: 10_000,
			target_batch_timeout: 43_200_000,
			average_ethereum_block_time: 15_000,
			slash_fraction_valset: Perbill::from_rational(1u32, 1000u32),
			slash_fraction_batch: Perbill::from_rational(1u32, 1000u32),
			slash_fraction_logic_call: Perbill::from_rational(1u32, 1000u32),
			unbond_slashing_valsets_window: 10_000,
			slash_fraction_bad_eth_signature: Perbill::from_rational(1u32, 1000u32),
			valset_reward: None,
		}
	}
}
