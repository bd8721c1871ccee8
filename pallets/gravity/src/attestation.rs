//! Vote accumulation on Ethereum claims and the exactly-once application of observed ones.

use crate::claims::{
	Attestation, Erc20DeployedClaim, EthereumClaim, SendToCosmosClaim, ValsetUpdatedClaim,
};
use crate::pallet::*;
use crate::traits::{BankKeeper, StakingKeeper};
use crate::types::{Coin, LastObservedEthereumBlockHeight, Valset, ZERO_ADDRESS};
use crate::LOG_TARGET;
use frame_support::{
	ensure,
	pallet_prelude::{DispatchError, DispatchResult},
	storage::{with_transaction, TransactionOutcome},
};
use sp_core::H256;
use sp_std::{collections::btree_map::BTreeMap, prelude::*};

impl<T: Config> Pallet<T> {
	pub(crate) fn add_claim(
		orchestrator: T::AccountId,
		claim: EthereumClaim<T::AccountId>,
	) -> DispatchResult {
		let validator = ValidatorByOrchestrator::<T>::get(&orchestrator)
			.ok_or(Error::<T>::UnknownOrchestrator)?;
		let bonded = T::StakingKeeper::validator(&validator)
			.map(|info| info.is_bonded())
			.unwrap_or(false);
		ensure!(bonded, Error::<T>::ValidatorNotBonded);
		claim.validate_basic().map_err(|reason| {
			log::debug!(target: LOG_TARGET, "rejected claim from {:?}: {}", orchestrator, reason);
			Error::<T>::InvalidClaim
		})?;

		let event_nonce = claim.event_nonce();
		let claim_hash = claim.claim_hash();
		let existing = Attestations::<T>::get(event_nonce, claim_hash);
		if existing.as_ref().map_or(false, |att| att.votes.contains(&validator)) {
			return Ok(());
		}

		let last_nonce = LastEventNonceByValidator::<T>::get(&validator)
			.unwrap_or_else(|| LastObservedEventNonce::<T>::get().saturating_sub(1));
		ensure!(event_nonce > last_nonce, Error::<T>::DuplicateClaim);
		ensure!(event_nonce == last_nonce + 1, Error::<T>::NonContiguousEventNonce);

		let claim_type = claim.claim_type();
		let mut attestation = existing.unwrap_or_else(|| Attestation {
			observed: false,
			votes: Vec::new(),
			height: Self::block_height(),
			claim,
		});
		attestation.votes.push(validator.clone());
		Attestations::<T>::insert(event_nonce, claim_hash, attestation);
		LastEventNonceByValidator::<T>::insert(&validator, event_nonce);

		Self::deposit_event(Event::ClaimSubmitted {
			validator,
			event_nonce,
			claim_hash,
			claim_type,
		});
		Ok(())
	}

	/// Observes at most one attestation per nonce, in nonce order, starting right after the
	/// last observed nonce.
	pub(crate) fn attestation_tally() {
		let mut by_nonce: BTreeMap<u64, Vec<(H256, Attestation<T::AccountId>)>> = BTreeMap::new();
		for (nonce, claim_hash, attestation) in Attestations::<T>::iter() {
			by_nonce.entry(nonce).or_default().push((claim_hash, attestation));
		}

		for (nonce, mut attestations) in by_nonce {
			if nonce != LastObservedEventNonce::<T>::get().saturating_add(1) {
				continue;
			}
			attestations.sort_by_key(|(claim_hash, _)| *claim_hash);
			for (claim_hash, attestation) in attestations {
				if Self::try_attestation(nonce, claim_hash, attestation) {
					break;
				}
			}
		}
	}

	fn try_attestation(
		nonce: u64,
		claim_hash: H256,
		mut attestation: Attestation<T::AccountId>,
	) -> bool {
		if attestation.observed {
			return false;
		}
		let total_power = T::StakingKeeper::last_total_power();
		if total_power == 0 {
			return false;
		}
		let attested_power = attestation
			.votes
			.iter()
			.filter_map(|validator| T::StakingKeeper::validator(validator))
			.filter(|info| info.is_bonded())
			.fold(0u64, |acc, info| acc.saturating_add(info.power));
		// at least two thirds of the bonded power
		if (attested_power as u128) * 3 < (total_power as u128) * 2 {
			return false;
		}

		attestation.observed = true;
		Attestations::<T>::insert(nonce, claim_hash, &attestation);
		LastObservedEventNonce::<T>::put(nonce);
		LastObservedEthereumHeight::<T>::put(LastObservedEthereumBlockHeight {
			cosmos_block_height: Self::block_height(),
			ethereum_block_height: attestation.claim.eth_block_height(),
		});

		let claim_type = attestation.claim.claim_type();
		log::info!(target: LOG_TARGET, "observed {:?} claim at event nonce {}", claim_type, nonce);
		Self::deposit_event(Event::AttestationObserved {
			event_nonce: nonce,
			claim_hash,
			claim_type,
		});

		let applied = with_transaction(|| match Self::apply_claim(&attestation.claim) {
			Ok(()) => TransactionOutcome::Commit(Ok(())),
			Err(error) => TransactionOutcome::Rollback(Err(error)),
		});
		if let Err(error) = applied {
			log::error!(
				target: LOG_TARGET,
				"failed to apply {:?} claim at event nonce {}: {:?}",
				claim_type,
				nonce,
				error
			);
			Self::deposit_event(Event::ClaimApplicationFailed {
				event_nonce: nonce,
				claim_hash,
				error,
			});
		}
		true
	}

	fn apply_claim(claim: &EthereumClaim<T::AccountId>) -> Result<(), DispatchError> {
		match claim {
			EthereumClaim::SendToCosmos(claim) => Self::apply_deposit(claim),
			EthereumClaim::BatchSendToEth(claim) => Self::outgoing_tx_batch_executed(
				claim.token_contract,
				claim.batch_nonce,
				claim.eth_block_height,
			),
			EthereumClaim::Erc20Deployed(claim) => Self::apply_erc20_deployed(claim),
			EthereumClaim::LogicCallExecuted(claim) => Self::outgoing_logic_call_executed(
				&claim.invalidation_id,
				claim.invalidation_nonce,
			),
			EthereumClaim::ValsetUpdated(claim) => Self::apply_valset_updated(claim),
		}
	}

	fn apply_deposit(claim: &SendToCosmosClaim<T::AccountId>) -> DispatchResult {
		let module = Self::account_id();
		let (cosmos_originated, denom) = Self::erc20_to_denom_lookup(&claim.token_contract);
		let coin = Coin::new(denom.clone(), claim.amount);
		if !cosmos_originated {
			T::BankKeeper::mint_coins(&module, &coin)?;
		}
		T::BankKeeper::send_from_module_to_account(&module, &claim.cosmos_receiver, &coin)?;

		Self::deposit_event(Event::DepositReceived {
			receiver: claim.cosmos_receiver.clone(),
			denom,
			amount: claim.amount,
		});
		Ok(())
	}

	fn apply_erc20_deployed(claim: &Erc20DeployedClaim) -> DispatchResult {
		ensure!(
			crate::denom::parse_gravity_denom(&claim.cosmos_denom).is_none(),
			Error::<T>::InvalidClaim
		);
		ensure!(
			!CosmosOriginatedDenomToErc20::<T>::contains_key(&claim.cosmos_denom) &&
				!Erc20ToCosmosOriginatedDenom::<T>::contains_key(claim.token_contract),
			Error::<T>::Erc20AlreadyRegistered
		);
		let metadata = T::BankKeeper::get_denom_metadata(&claim.cosmos_denom)
			.ok_or(Error::<T>::DenomMetadataMissing)?;
		ensure!(
			metadata.name == claim.name &&
				metadata.symbol == claim.symbol &&
				metadata.decimals() == claim.decimals,
			Error::<T>::Erc20MetadataMismatch
		);

		Self::set_cosmos_originated_denom_to_erc20(
			claim.cosmos_denom.clone(),
			claim.token_contract,
		);
		Self::deposit_event(Event::Erc20Registered {
			denom: claim.cosmos_denom.clone(),
			token_contract: claim.token_contract,
		});
		Ok(())
	}

	fn apply_valset_updated(claim: &ValsetUpdatedClaim) -> DispatchResult {
		let observed = Valset::new(
			claim.valset_nonce,
			Self::block_height(),
			claim.members.clone(),
			claim.reward_amount,
			claim.reward_token,
		)
		.map_err(|_| Error::<T>::InvalidClaim)?;

		if claim.reward_amount > 0 && claim.reward_token != ZERO_ADDRESS {
			let (cosmos_originated, denom) = Self::erc20_to_denom_lookup(&claim.reward_token);
			if !cosmos_originated {
				panic!("Can not use Ethereum originated token as reward");
			}
			// the relayer was paid out of tokens locked on Ethereum
			T::BankKeeper::mint_coins(&Self::account_id(), &Coin::new(denom, claim.reward_amount))?;
		}

		LastObservedValset::<T>::put(observed);
		Self::deposit_event(Event::ValsetUpdateObserved { valset_nonce: claim.valset_nonce });
		Ok(())
	}

	/// Attestations below the last observed nonce can no longer change anything.
	pub(crate) fn prune_attestations() {
		let last_observed = LastObservedEventNonce::<T>::get();
		let stale: Vec<(u64, H256)> = Attestations::<T>::iter_keys()
			.filter(|(nonce, _)| *nonce < last_observed)
			.collect();
		for (nonce, claim_hash) in stale {
			Attestations::<T>::remove(nonce, claim_hash);
		}
	}
}
