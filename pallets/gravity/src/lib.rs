//! # Gravity Pallet
//!
//! Validator side of a two-way token bridge between this chain and Ethereum.
//!
//! Orchestrators (the delegate keys of bonded validators) report Ethereum events as
//! claims. Claims with the same content at the same event nonce are votes on one
//! attestation; once the votes carry two thirds of the bonded power the attestation is observed
//! and its effect is applied exactly once, strictly in event-nonce order.
//!
//! In the other direction the pallet produces artifacts validators sign with their
//! Ethereum keys and relayers submit to the bridge contract:
//! - validator set updates, requested whenever the bonded set drifts,
//! - batches of withdrawals for one ERC20 token, built from a fee-ordered pool,
//! - arbitrary logic calls produced by other runtime modules.
//!
//! Validators that leave an artifact unsigned past its window, or that sign something the
//! chain never produced, are slashed and jailed through the staking keeper.
//!
//! All periodic work runs in `on_finalize`: slashing, attestation tally, timeout sweeps,
//! valset requests, then pruning.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(test)]
mod mock;


mod attestation;
mod batch;
pub mod checkpoint;
pub mod claims;
mod denom;
mod keys;
mod logic_call;
mod queries;
mod slashing;
pub mod traits;
pub mod types;
mod valset;
pub mod weights;

use frame_support::pallet_prelude::*;
use frame_support::sp_runtime::traits::AccountIdConversion;
use frame_system::pallet_prelude::*;
pub use pallet::*;
use sp_runtime::SaturatedConversion;
use sp_std::prelude::*;
pub use weights::WeightInfo;

pub const LOG_TARGET: &str = "runtime::gravity";

#[frame_support::pallet]
pub mod pallet {
	use super::*;
	use crate::checkpoint::CheckpointError;
	use crate::claims::{Attestation, ClaimType, EthereumClaim};
	use crate::traits::{BankKeeper, SlashingKeeper, StakingKeeper};
	use crate::types::*;
	use frame_support::PalletId;
	use sp_core::H256;
	use sp_runtime::Perbill;

	#[pallet::pallet]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(_);

	#[pallet::config]
	pub trait Config: frame_system::Config {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		type BankKeeper: BankKeeper<Self::AccountId>;

		type StakingKeeper: StakingKeeper<Self::AccountId>;

		type SlashingKeeper: SlashingKeeper<Self::AccountId>;

		/// Wall clock used to query the unbonding queue.
		type UnixTime: frame_support::traits::UnixTime;

		/// The pallet's id, used for deriving the module account that escrows bridged funds.
		#[pallet::constant]
		type PalletId: Get<PalletId>;

		/// Maximum number of transactions `request_batch` puts in one batch.
		#[pallet::constant]
		type OutgoingTxBatchSize: Get<u32>;

		type WeightInfo: WeightInfo;
	}

	#[pallet::storage]
	pub type GravityParams<T: Config> = StorageValue<_, Params, ValueQuery>;

	// ---------------------------------------------------------------------
	// Oracle
	// ---------------------------------------------------------------------

	#[pallet::storage]
	pub type Attestations<T: Config> = StorageDoubleMap<
		_,
		Twox64Concat,
		u64, // event nonce
		Blake2_128Concat,
		H256, // claim hash
		Attestation<T::AccountId>,
		OptionQuery,
	>;

	/// Highest event nonce each validator has voted on.
	#[pallet::storage]
	pub type LastEventNonceByValidator<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, u64, OptionQuery>;

	#[pallet::storage]
	pub type LastObservedEventNonce<T: Config> = StorageValue<_, u64, ValueQuery>;

	#[pallet::storage]
	pub type LastObservedEthereumHeight<T: Config> =
		StorageValue<_, LastObservedEthereumBlockHeight, ValueQuery>;

	/// The validator set the Ethereum contract last switched to.
	#[pallet::storage]
	pub type LastObservedValset<T: Config> = StorageValue<_, Valset, OptionQuery>;

	// ---------------------------------------------------------------------
	// Valsets
	// ---------------------------------------------------------------------

	#[pallet::storage]
	pub type Valsets<T: Config> = StorageMap<_, Twox64Concat, u64, Valset, OptionQuery>;

	#[pallet::storage]
	pub type LatestValsetNonce<T: Config> = StorageValue<_, u64, ValueQuery>;

	#[pallet::storage]
	pub type ValsetConfirms<T: Config> = StorageDoubleMap<
		_,
		Twox64Concat,
		u64,
		Blake2_128Concat,
		T::AccountId, // validator
		ValsetConfirm<T::AccountId>,
		OptionQuery,
	>;

	// ---------------------------------------------------------------------
	// Outgoing pool and batches
	// ---------------------------------------------------------------------

	#[pallet::storage]
	pub type UnbatchedTransactions<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		EthAddress, // token contract
		Twox64Concat,
		u64, // pool id
		OutgoingTransferTx<T::AccountId>,
		OptionQuery,
	>;

	/// Token contract of every transaction still in the pool.
	#[pallet::storage]
	pub type UnbatchedTransactionToken<T: Config> =
		StorageMap<_, Twox64Concat, u64, EthAddress, OptionQuery>;

	#[pallet::storage]
	pub type LastTxPoolId<T: Config> = StorageValue<_, u64, ValueQuery>;

	#[pallet::storage]
	pub type LastOutgoingBatchNonce<T: Config> = StorageValue<_, u64, ValueQuery>;

	#[pallet::storage]
	pub type OutgoingTxBatches<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		EthAddress,
		Twox64Concat,
		u64, // batch nonce
		OutgoingTxBatch<T::AccountId>,
		OptionQuery,
	>;

	#[pallet::storage]
	pub type BatchConfirms<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		(EthAddress, u64),
		Blake2_128Concat,
		T::AccountId,
		BatchConfirm<T::AccountId>,
		OptionQuery,
	>;

	// ---------------------------------------------------------------------
	// Logic calls
	// ---------------------------------------------------------------------

	#[pallet::storage]
	pub type OutgoingLogicCalls<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		Vec<u8>, // invalidation id
		Twox64Concat,
		u64, // invalidation nonce
		OutgoingLogicCall,
		OptionQuery,
	>;

	#[pallet::storage]
	pub type LogicCallConfirms<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		(Vec<u8>, u64),
		Blake2_128Concat,
		T::AccountId,
		LogicCallConfirm<T::AccountId>,
		OptionQuery,
	>;

	// ---------------------------------------------------------------------
	// Denoms, keys, evidence and slashing markers
	// ---------------------------------------------------------------------

	/// Checkpoints of every artifact this chain ever asked validators to sign.
	#[pallet::storage]
	pub type PastEthSignatureCheckpoints<T: Config> =
		StorageMap<_, Identity, H256, bool, ValueQuery>;

	/// Evidence already punished, keyed by the hash of checkpoint and signature.
	#[pallet::storage]
	pub type PastEvidence<T: Config> = StorageMap<_, Identity, H256, bool, ValueQuery>;

	#[pallet::storage]
	pub type CosmosOriginatedDenomToErc20<T: Config> =
		StorageMap<_, Blake2_128Concat, Vec<u8>, EthAddress, OptionQuery>;

	#[pallet::storage]
	pub type Erc20ToCosmosOriginatedDenom<T: Config> =
		StorageMap<_, Blake2_128Concat, EthAddress, Vec<u8>, OptionQuery>;

	#[pallet::storage]
	pub type EthAddressByValidator<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, EthAddress, OptionQuery>;

	#[pallet::storage]
	pub type ValidatorByEthAddress<T: Config> =
		StorageMap<_, Blake2_128Concat, EthAddress, T::AccountId, OptionQuery>;

	#[pallet::storage]
	pub type OrchestratorByValidator<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, T::AccountId, OptionQuery>;

	#[pallet::storage]
	pub type ValidatorByOrchestrator<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, T::AccountId, OptionQuery>;

	#[pallet::storage]
	pub type LastSlashedValsetNonce<T: Config> = StorageValue<_, u64, ValueQuery>;

	#[pallet::storage]
	pub type LastSlashedBatchBlock<T: Config> = StorageValue<_, u64, ValueQuery>;

	#[pallet::storage]
	pub type LastSlashedLogicCallBlock<T: Config> = StorageValue<_, u64, ValueQuery>;

	/// Last block in which a validator began unbonding.
	#[pallet::storage]
	pub type LastUnbondingBlockHeight<T: Config> = StorageValue<_, u64, ValueQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		OrchestratorAddressSet {
			validator: T::AccountId,
			orchestrator: T::AccountId,
			eth_address: EthAddress,
		},
		ClaimSubmitted {
			validator: T::AccountId,
			event_nonce: u64,
			claim_hash: H256,
			claim_type: ClaimType,
		},
		AttestationObserved { event_nonce: u64, claim_hash: H256, claim_type: ClaimType },
		/// The attestation stays observed, its effect was rolled back.
		ClaimApplicationFailed { event_nonce: u64, claim_hash: H256, error: DispatchError },
		DepositReceived { receiver: T::AccountId, denom: Vec<u8>, amount: u128 },
		Erc20Registered { denom: Vec<u8>, token_contract: EthAddress },
		ValsetUpdateObserved { valset_nonce: u64 },
		ValsetRequested { nonce: u64, members: u32 },
		ValsetConfirmed { nonce: u64, validator: T::AccountId },
		SendToEthQueued {
			id: u64,
			sender: T::AccountId,
			dest_address: EthAddress,
			token_contract: EthAddress,
			amount: u128,
			fee: u128,
		},
		SendToEthCancelled { id: u64, sender: T::AccountId },
		OutgoingBatchCreated { token_contract: EthAddress, batch_nonce: u64, transactions: u32 },
		BatchConfirmed { token_contract: EthAddress, batch_nonce: u64, validator: T::AccountId },
		OutgoingBatchExecuted { token_contract: EthAddress, batch_nonce: u64 },
		OutgoingBatchCancelled { token_contract: EthAddress, batch_nonce: u64 },
		OutgoingLogicCallCreated { invalidation_id: Vec<u8>, invalidation_nonce: u64 },
		LogicCallConfirmed {
			invalidation_id: Vec<u8>,
			invalidation_nonce: u64,
			validator: T::AccountId,
		},
		OutgoingLogicCallExecuted { invalidation_id: Vec<u8>, invalidation_nonce: u64 },
		OutgoingLogicCallCancelled { invalidation_id: Vec<u8>, invalidation_nonce: u64 },
		ValidatorSlashed { validator: T::AccountId, reason: SlashReason, fraction: Perbill },
		ParamsUpdated,
	}

	#[pallet::error]
	pub enum Error<T> {
		/// Zero or otherwise unusable Ethereum address.
		InvalidEthAddress,
		/// Signature does not recover to the expected Ethereum key.
		InvalidSignature,
		/// Claim failed its content checks.
		InvalidClaim,
		/// Gravity id does not fit in 32 bytes.
		InvalidGravityId,
		/// Invalidation id does not fit in 32 bytes.
		InvalidInvalidationId,
		/// Denom is neither a bridge voucher nor mapped to an ERC20.
		DenomNotBridged,
		/// Amount and fee are in different denoms.
		MismatchedDenoms,
		InvalidAmount,
		InvalidBatchSize,
		/// Only the sender can cancel a withdrawal.
		NotSender,
		/// An existing batch for the token already pays more fees.
		BatchNotProfitable,
		NoBatchCandidates,
		/// The validator set has no member with a registered Ethereum key.
		NoValidators,
		DuplicateClaim,
		DuplicateConfirmation,
		DuplicateEthAddress,
		DuplicateOrchestrator,
		DuplicateEvidence,
		UnknownOrchestrator,
		UnknownValidator,
		UnknownValset,
		UnknownBatch,
		UnknownLogicCall,
		/// A logic call with this invalidation id and nonce is already stored.
		DuplicateLogicCall,
		UnknownTransaction,
		/// Validator has no Ethereum key registered.
		EthAddressNotFound,
		/// Claims of a validator must follow its previous claim's nonce.
		NonContiguousEventNonce,
		ValidatorNotBonded,
		/// Delegate keys are bound once.
		ResetDelegateKeys,
		/// The signed artifact was produced by this chain; signing it is not misbehaviour.
		CheckpointExists,
		/// The denom already has an ERC20 representation.
		Erc20AlreadyRegistered,
		DenomMetadataMissing,
		/// Deployed ERC20 does not match the denom's metadata.
		Erc20MetadataMismatch,
	}

	impl<T> From<CheckpointError> for Error<T> {
		fn from(error: CheckpointError) -> Self {
			match error {
				CheckpointError::GravityIdTooLong => Error::<T>::InvalidGravityId,
				CheckpointError::InvalidationIdTooLong => Error::<T>::InvalidInvalidationId,
			}
		}
	}

	#[pallet::hooks]
	impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
		fn on_initialize(_n: BlockNumberFor<T>) -> Weight {
			T::WeightInfo::end_block()
		}

		fn on_finalize(_n: BlockNumberFor<T>) {
			Self::slashing();
			Self::attestation_tally();
			Self::cleanup_timed_out_batches();
			Self::cleanup_timed_out_logic_calls();
			Self::create_valsets();
			Self::prune_valsets();
			Self::prune_attestations();
		}
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Binds an orchestrator account and an Ethereum key to the calling validator.
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::set_orchestrator_address())]
		pub fn set_orchestrator_address(
			origin: OriginFor<T>,
			orchestrator: T::AccountId,
			eth_address: EthAddress,
		) -> DispatchResult {
			let validator = ensure_signed(origin)?;
			Self::set_delegate_keys(validator, orchestrator, eth_address)
		}

		/// Orchestrator submits its validator's signature over a stored valset.
		#[pallet::call_index(1)]
		#[pallet::weight(T::WeightInfo::confirm_valset())]
		pub fn confirm_valset(
			origin: OriginFor<T>,
			nonce: u64,
			signature: Vec<u8>,
		) -> DispatchResult {
			let orchestrator = ensure_signed(origin)?;
			Self::add_valset_confirm(orchestrator, nonce, signature)
		}

		#[pallet::call_index(2)]
		#[pallet::weight(T::WeightInfo::confirm_batch())]
		pub fn confirm_batch(
			origin: OriginFor<T>,
			token_contract: EthAddress,
			nonce: u64,
			signature: Vec<u8>,
		) -> DispatchResult {
			let orchestrator = ensure_signed(origin)?;
			Self::add_batch_confirm(orchestrator, token_contract, nonce, signature)
		}

		#[pallet::call_index(3)]
		#[pallet::weight(T::WeightInfo::confirm_logic_call())]
		pub fn confirm_logic_call(
			origin: OriginFor<T>,
			invalidation_id: Vec<u8>,
			invalidation_nonce: u64,
			signature: Vec<u8>,
		) -> DispatchResult {
			let orchestrator = ensure_signed(origin)?;
			Self::add_logic_call_confirm(
				orchestrator,
				invalidation_id,
				invalidation_nonce,
				signature,
			)
		}

		/// Orchestrator reports an Ethereum event on behalf of its validator.
		#[pallet::call_index(4)]
		#[pallet::weight(T::WeightInfo::submit_claim())]
		pub fn submit_claim(
			origin: OriginFor<T>,
			claim: EthereumClaim<T::AccountId>,
		) -> DispatchResult {
			let orchestrator = ensure_signed(origin)?;
			Self::add_claim(orchestrator, claim)
		}

		/// Escrows `amount + bridge_fee` and queues a withdrawal to `eth_dest`.
		#[pallet::call_index(5)]
		#[pallet::weight(T::WeightInfo::send_to_eth())]
		pub fn send_to_eth(
			origin: OriginFor<T>,
			eth_dest: EthAddress,
			amount: Coin,
			bridge_fee: Coin,
		) -> DispatchResult {
			let sender = ensure_signed(origin)?;
			Self::add_to_outgoing_pool(sender, eth_dest, amount, bridge_fee).map(|_| ())
		}

		/// Takes a withdrawal back out of the pool before it is batched.
		#[pallet::call_index(6)]
		#[pallet::weight(T::WeightInfo::cancel_send_to_eth())]
		pub fn cancel_send_to_eth(origin: OriginFor<T>, id: u64) -> DispatchResult {
			let sender = ensure_signed(origin)?;
			Self::remove_from_outgoing_pool_and_refund(sender, id)
		}

		#[pallet::call_index(7)]
		#[pallet::weight(T::WeightInfo::request_batch())]
		pub fn request_batch(origin: OriginFor<T>, denom: Vec<u8>) -> DispatchResult {
			ensure_signed(origin)?;
			let (_, token_contract) = Self::denom_to_erc20_lookup(&denom)?;
			Self::build_outgoing_tx_batch(token_contract, T::OutgoingTxBatchSize::get())
				.map(|_| ())
		}

		/// Anyone may report an Ethereum signature by a validator over something this chain
		/// never asked it to sign.
		#[pallet::call_index(8)]
		#[pallet::weight(T::WeightInfo::submit_bad_signature_evidence())]
		pub fn submit_bad_signature_evidence(
			origin: OriginFor<T>,
			subject: EthereumSigned<T::AccountId>,
			signature: Vec<u8>,
		) -> DispatchResult {
			ensure_signed(origin)?;
			Self::check_bad_signature_evidence(subject, signature)
		}

		#[pallet::call_index(9)]
		#[pallet::weight(T::WeightInfo::set_params())]
		pub fn set_params(origin: OriginFor<T>, params: Params) -> DispatchResult {
			ensure_root(origin)?;
			ensure!(params.gravity_id.len() <= 32, Error::<T>::InvalidGravityId);
			GravityParams::<T>::put(params);
			Self::deposit_event(Event::ParamsUpdated);
			Ok(())
		}
	}

	impl<T: Config> Pallet<T> {
		pub fn account_id() -> T::AccountId {
			<T as pallet::Config>::PalletId::get().into_account_truncating()
		}

		pub(crate) fn block_height() -> u64 {
			frame_system::Pallet::<T>::block_number().saturated_into::<u64>()
		}

		/// Records a checkpoint as produced by this chain.
		pub(crate) fn archive_checkpoint(checkpoint: H256) {
			PastEthSignatureCheckpoints::<T>::insert(checkpoint, true);
		}
	}
}
