use crate as pallet_gravity;
use crate::traits::{
	BankKeeper, BondStatus, DenomMetadata, SlashingKeeper, StakingKeeper, ValidatorInfo,
	ValidatorSigningInfo,
};
use crate::types::{Coin, EthAddress};
use frame_support::{
	derive_impl, parameter_types,
	traits::{ConstU64, Hooks},
	PalletId,
};
use sp_core::H160;
use sp_runtime::{BuildStorage, DispatchError, Perbill};
use std::{cell::RefCell, collections::BTreeMap};

pub type AccountId = u64;

// Validators, their orchestrators and plain users
pub const VALIDATORS: [AccountId; 3] = [1, 2, 3];
pub const ORCHESTRATOR_OFFSET: AccountId = 10;
pub const ALICE: AccountId = 100;
pub const BOB: AccountId = 101;

pub const VALIDATOR_POWER: u64 = 100;
pub const GRAVITY_ID: &[u8] = b"foo";
pub const INITIAL_TIMESTAMP: u64 = 1_700_000_000_000;

// Configure a mock runtime to test the pallet
frame_support::construct_runtime!(
	pub enum Test
	{
		System: frame_system,
		Timestamp: pallet_timestamp,
		Gravity: pallet_gravity,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
	type Block = frame_system::mocking::MockBlock<Test>;
}

impl pallet_timestamp::Config for Test {
	type Moment = u64;
	type OnTimestampSet = ();
	type MinimumPeriod = ConstU64<1000>;
	type WeightInfo = ();
}

parameter_types! {
	pub const GravityPalletId: PalletId = PalletId(*b"gravity!");
	pub const OutgoingTxBatchSize: u32 = 100;
}

impl pallet_gravity::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type BankKeeper = MockBank;
	type StakingKeeper = MockStaking;
	type SlashingKeeper = MockSlashing;
	type UnixTime = Timestamp;
	type PalletId = GravityPalletId;
	type OutgoingTxBatchSize = OutgoingTxBatchSize;
	type WeightInfo = ();
}

// ---------------------------------------------------------------------
// Keepers
// ---------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashRecord {
	pub validator: AccountId,
	pub height: u64,
	pub power: u64,
	pub fraction: Perbill,
}

thread_local! {
	static BALANCES: RefCell<BTreeMap<(AccountId, Vec<u8>), u128>> = RefCell::new(BTreeMap::new());
	static METADATA: RefCell<BTreeMap<Vec<u8>, DenomMetadata>> = RefCell::new(BTreeMap::new());
	static STAKING: RefCell<BTreeMap<AccountId, ValidatorInfo<AccountId>>> =
		RefCell::new(BTreeMap::new());
	static SIGNING_INFO: RefCell<BTreeMap<AccountId, ValidatorSigningInfo>> =
		RefCell::new(BTreeMap::new());
	static SLASHES: RefCell<Vec<SlashRecord>> = RefCell::new(Vec::new());
}

pub struct MockBank;

impl MockBank {
	pub fn set_balance(who: AccountId, denom: &[u8], amount: u128) {
		BALANCES.with(|b| b.borrow_mut().insert((who, denom.to_vec()), amount));
	}

	fn debit(who: &AccountId, coin: &Coin) -> Result<(), DispatchError> {
		BALANCES.with(|b| {
			let mut balances = b.borrow_mut();
			let balance = balances.entry((*who, coin.denom.clone())).or_default();
			*balance = balance
				.checked_sub(coin.amount)
				.ok_or(DispatchError::Other("insufficient balance"))?;
			Ok(())
		})
	}

	fn credit(who: &AccountId, coin: &Coin) {
		BALANCES.with(|b| {
			*b.borrow_mut().entry((*who, coin.denom.clone())).or_default() += coin.amount;
		});
	}

	/// Sum of every account's balance of `denom`.
	pub fn supply(denom: &[u8]) -> u128 {
		BALANCES.with(|b| {
			b.borrow().iter().filter(|((_, d), _)| d.as_slice() == denom).map(|(_, v)| *v).sum()
		})
	}
}

impl BankKeeper<AccountId> for MockBank {
	fn mint_coins(module: &AccountId, coin: &Coin) -> Result<(), DispatchError> {
		Self::credit(module, coin);
		Ok(())
	}

	fn burn_coins(module: &AccountId, coin: &Coin) -> Result<(), DispatchError> {
		Self::debit(module, coin)
	}

	fn send_from_module_to_account(
		module: &AccountId,
		to: &AccountId,
		coin: &Coin,
	) -> Result<(), DispatchError> {
		Self::debit(module, coin)?;
		Self::credit(to, coin);
		Ok(())
	}

	fn send_from_account_to_module(
		from: &AccountId,
		module: &AccountId,
		coin: &Coin,
	) -> Result<(), DispatchError> {
		Self::debit(from, coin)?;
		Self::credit(module, coin);
		Ok(())
	}

	fn get_all_balances(who: &AccountId) -> Vec<Coin> {
		BALANCES.with(|b| {
			b.borrow()
				.iter()
				.filter(|((owner, _), amount)| owner == who && **amount > 0)
				.map(|((_, denom), amount)| Coin::new(denom.clone(), *amount))
				.collect()
		})
	}

	fn get_balance(who: &AccountId, denom: &[u8]) -> u128 {
		BALANCES.with(|b| b.borrow().get(&(*who, denom.to_vec())).copied().unwrap_or_default())
	}

	fn get_denom_metadata(denom: &[u8]) -> Option<DenomMetadata> {
		METADATA.with(|m| m.borrow().get(denom).cloned())
	}

	fn set_denom_metadata(metadata: DenomMetadata) {
		METADATA.with(|m| m.borrow_mut().insert(metadata.base.clone(), metadata));
	}
}

pub struct MockStaking;

impl MockStaking {
	pub fn add_validator(who: AccountId, power: u64) {
		STAKING.with(|s| {
			s.borrow_mut().insert(
				who,
				ValidatorInfo {
					operator: who,
					power,
					status: BondStatus::Bonded,
					jailed: false,
					unbonding_height: 0,
				},
			)
		});
	}

	pub fn set_power(who: AccountId, power: u64) {
		STAKING.with(|s| {
			if let Some(info) = s.borrow_mut().get_mut(&who) {
				info.power = power;
			}
		});
	}

	/// Moves a validator into the unbonding queue and notifies the bridge.
	pub fn begin_unbonding(who: AccountId, height: u64) {
		STAKING.with(|s| {
			if let Some(info) = s.borrow_mut().get_mut(&who) {
				info.status = BondStatus::Unbonding;
				info.unbonding_height = height;
			}
		});
		<Gravity as crate::traits::StakingHooks<AccountId>>::after_validator_begin_unbonding(&who);
	}

	pub fn is_jailed(who: AccountId) -> bool {
		STAKING.with(|s| s.borrow().get(&who).map_or(false, |info| info.jailed))
	}
}

impl StakingKeeper<AccountId> for MockStaking {
	fn bonded_validators_by_power() -> Vec<ValidatorInfo<AccountId>> {
		let mut bonded: Vec<_> = STAKING.with(|s| {
			s.borrow().values().filter(|info| info.is_bonded()).cloned().collect()
		});
		bonded.sort_by(|a: &ValidatorInfo<AccountId>, b| {
			b.power.cmp(&a.power).then(a.operator.cmp(&b.operator))
		});
		bonded
	}

	fn validator(who: &AccountId) -> Option<ValidatorInfo<AccountId>> {
		STAKING.with(|s| s.borrow().get(who).cloned())
	}

	fn last_total_power() -> u64 {
		Self::bonded_validators_by_power().iter().map(|info| info.power).sum()
	}

	fn validator_queue(_unbond_time_ms: u64, _height: u64) -> Vec<AccountId> {
		STAKING.with(|s| {
			s.borrow()
				.values()
				.filter(|info| info.status == BondStatus::Unbonding)
				.map(|info| info.operator)
				.collect()
		})
	}

	fn unbonding_time() -> u64 {
		21 * 24 * 60 * 60 * 1000
	}

	fn slash(who: &AccountId, height: u64, power: u64, fraction: Perbill) {
		SLASHES.with(|s| {
			s.borrow_mut().push(SlashRecord { validator: *who, height, power, fraction })
		});
	}

	fn jail(who: &AccountId) {
		STAKING.with(|s| {
			if let Some(info) = s.borrow_mut().get_mut(who) {
				info.jailed = true;
			}
		});
	}
}

pub struct MockSlashing;

impl MockSlashing {
	pub fn set_start_height(who: AccountId, start_height: u64) {
		SIGNING_INFO.with(|s| {
			s.borrow_mut().insert(who, ValidatorSigningInfo { start_height, jailed_until: 0 })
		});
	}
}

impl SlashingKeeper<AccountId> for MockSlashing {
	fn validator_signing_info(who: &AccountId) -> Option<ValidatorSigningInfo> {
		SIGNING_INFO.with(|s| s.borrow().get(who).copied())
	}
}

pub fn slashes() -> Vec<SlashRecord> {
	SLASHES.with(|s| s.borrow().clone())
}

pub fn slashed_validators() -> Vec<AccountId> {
	let mut validators: Vec<AccountId> = slashes().iter().map(|s| s.validator).collect();
	validators.sort();
	validators.dedup();
	validators
}

// ---------------------------------------------------------------------
// Ethereum keys
// ---------------------------------------------------------------------

pub fn orchestrator(validator: AccountId) -> AccountId {
	validator + ORCHESTRATOR_OFFSET
}

pub fn eth_secret(validator: AccountId) -> libsecp256k1::SecretKey {
	libsecp256k1::SecretKey::parse(&[validator as u8; 32]).expect("non-zero seed is a valid key")
}

pub fn eth_address(validator: AccountId) -> EthAddress {
	let public = libsecp256k1::PublicKey::from_secret_key(&eth_secret(validator)).serialize();
	H160::from_slice(&sp_io::hashing::keccak_256(&public[1..])[12..])
}

/// Ethereum-style signature (`v` in {27, 28}) over a checkpoint.
pub fn sign_checkpoint(validator: AccountId, checkpoint: &sp_core::H256) -> Vec<u8> {
	let digest = crate::checkpoint::eth_signed_message_hash(checkpoint);
	let (signature, recovery_id) = libsecp256k1::sign(
		&libsecp256k1::Message::parse(&digest),
		&eth_secret(validator),
	);
	let mut out = signature.serialize().to_vec();
	out.push(recovery_id.serialize() + 27);
	out
}

pub fn token_contract() -> EthAddress {
	H160::repeat_byte(0x7e)
}

pub fn module_account() -> AccountId {
	pallet_gravity::Pallet::<Test>::account_id()
}

// ---------------------------------------------------------------------
// Externalities and block helpers
// ---------------------------------------------------------------------

pub fn new_test_ext() -> sp_io::TestExternalities {
	BALANCES.with(|b| b.borrow_mut().clear());
	METADATA.with(|m| m.borrow_mut().clear());
	STAKING.with(|s| s.borrow_mut().clear());
	SIGNING_INFO.with(|s| s.borrow_mut().clear());
	SLASHES.with(|s| s.borrow_mut().clear());

	for validator in VALIDATORS {
		MockStaking::add_validator(validator, VALIDATOR_POWER);
		MockSlashing::set_start_height(validator, 0);
	}

	let t = frame_system::GenesisConfig::<Test>::default().build_storage().unwrap();
	let mut ext: sp_io::TestExternalities = t.into();
	ext.execute_with(|| {
		System::set_block_number(1);
		Timestamp::set_timestamp(INITIAL_TIMESTAMP);
		pallet_gravity::GravityParams::<Test>::mutate(|params| {
			params.gravity_id = GRAVITY_ID.to_vec();
		});
	});
	ext
}

/// Registers orchestrator and Ethereum key for every validator.
pub fn setup_delegate_keys() {
	for validator in VALIDATORS {
		frame_support::assert_ok!(Gravity::set_orchestrator_address(
			RuntimeOrigin::signed(validator),
			orchestrator(validator),
			eth_address(validator),
		));
	}
}

/// Runs the end-of-block logic for the current block.
pub fn finalize_block() {
	Gravity::on_finalize(System::block_number());
}

/// Finalizes blocks until `n` is the current, not yet finalized, block.
pub fn run_to_block(n: u64) {
	while System::block_number() < n {
		finalize_block();
		let next = System::block_number() + 1;
		System::set_block_number(next);
		Timestamp::set_timestamp(INITIAL_TIMESTAMP + next * 5_000);
		Gravity::on_initialize(next);
	}
}
