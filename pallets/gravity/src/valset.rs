//! Validator set snapshots for the Ethereum contract.

use crate::checkpoint;
use crate::pallet::*;
use crate::traits::{StakingHooks, StakingKeeper};
use crate::types::{
	normalize_power, BridgeValidator, EthAddress, Valset, ValsetConfirm, ValsetError, ZERO_ADDRESS,
};
use crate::LOG_TARGET;
use frame_support::pallet_prelude::DispatchResult;
use frame_support::ensure;
use sp_runtime::{FixedPointNumber, FixedU128};
use sp_std::prelude::*;

impl<T: Config> Pallet<T> {
	/// The set the bridge contract should be running right now: bonded validators that
	/// registered an Ethereum key, with power scaled to `u32::MAX`. Nonce and height are
	/// left at zero until the set is stored.
	pub fn current_valset() -> Result<Valset, Error<T>> {
		let mut registered: Vec<(EthAddress, u64)> = Vec::new();
		let mut total_power: u64 = 0;
		for validator in T::StakingKeeper::bonded_validators_by_power() {
			if let Some(eth_address) = EthAddressByValidator::<T>::get(&validator.operator) {
				total_power = total_power.saturating_add(validator.power);
				registered.push((eth_address, validator.power));
			}
		}

		let members: Vec<BridgeValidator> = registered
			.into_iter()
			.map(|(ethereum_address, power)| BridgeValidator {
				ethereum_address,
				power: normalize_power(power, total_power),
			})
			.filter(|member| member.power > 0)
			.collect();

		let (reward_amount, reward_token) = Self::valset_reward();
		Valset::new(0, 0, members, reward_amount, reward_token).map_err(|error| match error {
			ValsetError::Empty => Error::<T>::NoValidators,
			ValsetError::ZeroPower => Error::<T>::NoValidators,
			ValsetError::DuplicateAddress => Error::<T>::DuplicateEthAddress,
		})
	}

	fn valset_reward() -> (u128, EthAddress) {
		match GravityParams::<T>::get().valset_reward {
			Some(reward) if reward.amount > 0 => match Self::denom_to_erc20_lookup(&reward.denom) {
				Ok((_, token_contract)) => (reward.amount, token_contract),
				Err(_) => panic!("valset reward denom has no ERC20 representation"),
			},
			_ => (0, ZERO_ADDRESS),
		}
	}

	pub fn latest_valset() -> Option<Valset> {
		match LatestValsetNonce::<T>::get() {
			0 => None,
			nonce => Valsets::<T>::get(nonce),
		}
	}

	/// Snapshots the current set under the next nonce and asks validators to sign it.
	pub(crate) fn set_valset_request() -> Option<Valset> {
		let mut valset = match Self::current_valset() {
			Ok(valset) => valset,
			Err(error) => {
				log::warn!(target: LOG_TARGET, "skipping valset request: {:?}", error);
				return None;
			},
		};
		valset.nonce = LatestValsetNonce::<T>::get().saturating_add(1);
		valset.height = Self::block_height();
		Self::store_valset(&valset);
		Some(valset)
	}

	fn store_valset(valset: &Valset) {
		let gravity_id = GravityParams::<T>::get().gravity_id;
		match checkpoint::valset_checkpoint(valset, &gravity_id) {
			Ok(checkpoint) => Self::archive_checkpoint(checkpoint),
			Err(error) => {
				log::error!(
					target: LOG_TARGET,
					"valset {} has no checkpoint: {:?}",
					valset.nonce,
					error
				)
			},
		}
		Valsets::<T>::insert(valset.nonce, valset);
		LatestValsetNonce::<T>::put(valset.nonce);

		log::info!(
			target: LOG_TARGET,
			"valset {} requested at height {}",
			valset.nonce,
			valset.height
		);
		Self::deposit_event(Event::ValsetRequested {
			nonce: valset.nonce,
			members: valset.members.len() as u32,
		});
	}

	/// Requests a new valset when there is none yet, a validator began unbonding in this
	/// block, or the bonded power moved more than 5% since the latest one.
	pub(crate) fn create_valsets() {
		let needed = match Self::latest_valset() {
			None => true,
			Some(_) if LastUnbondingBlockHeight::<T>::get() == Self::block_height() => true,
			Some(latest) => match Self::current_valset() {
				Ok(current) => {
					latest.bridge_validators().power_diff(&current.bridge_validators()) >
						FixedU128::saturating_from_rational(5u32, 100u32)
				},
				Err(_) => false,
			},
		};
		if needed {
			Self::set_valset_request();
		}
	}

	/// Drops valsets older than the last one observed on Ethereum once they left the
	/// signing window.
	pub(crate) fn prune_valsets() {
		let Some(observed) = LastObservedValset::<T>::get() else { return };
		let window = GravityParams::<T>::get().signed_valsets_window;
		let now = Self::block_height();
		if now < window {
			return;
		}
		let cutoff = now - window;

		let stale: Vec<u64> = Valsets::<T>::iter_values()
			.filter(|valset| valset.nonce < observed.nonce && valset.height < cutoff)
			.map(|valset| valset.nonce)
			.collect();
		for nonce in stale {
			Valsets::<T>::remove(nonce);
			let _ = ValsetConfirms::<T>::clear_prefix(nonce, u32::MAX, None);
		}
	}

	pub(crate) fn add_valset_confirm(
		orchestrator: T::AccountId,
		nonce: u64,
		signature: Vec<u8>,
	) -> DispatchResult {
		let valset = Valsets::<T>::get(nonce).ok_or(Error::<T>::UnknownValset)?;
		let (validator, eth_address) = Self::signing_validator(&orchestrator)?;
		ensure!(
			!ValsetConfirms::<T>::contains_key(nonce, &validator),
			Error::<T>::DuplicateConfirmation
		);

		let gravity_id = GravityParams::<T>::get().gravity_id;
		let checkpoint =
			checkpoint::valset_checkpoint(&valset, &gravity_id).map_err(Error::<T>::from)?;
		checkpoint::verify_signature(&checkpoint, &signature, &eth_address)
			.map_err(|_| Error::<T>::InvalidSignature)?;

		ValsetConfirms::<T>::insert(
			nonce,
			&validator,
			ValsetConfirm { nonce, orchestrator, eth_address, signature },
		);
		Self::deposit_event(Event::ValsetConfirmed { nonce, validator });
		Ok(())
	}
}

impl<T: Config> StakingHooks<T::AccountId> for Pallet<T> {
	fn after_validator_begin_unbonding(_validator: &T::AccountId) {
		LastUnbondingBlockHeight::<T>::put(Self::block_height());
	}
}
