//! Orchestrator and Ethereum keys validators delegate their bridge duties to.
//!
//! Each validator binds both keys once; neither key may be shared with another validator.

use crate::pallet::*;
use crate::traits::StakingKeeper;
use crate::types::{EthAddress, ZERO_ADDRESS};
use frame_support::{ensure, pallet_prelude::DispatchResult};

impl<T: Config> Pallet<T> {
	pub(crate) fn set_delegate_keys(
		validator: T::AccountId,
		orchestrator: T::AccountId,
		eth_address: EthAddress,
	) -> DispatchResult {
		ensure!(eth_address != ZERO_ADDRESS, Error::<T>::InvalidEthAddress);
		ensure!(T::StakingKeeper::validator(&validator).is_some(), Error::<T>::UnknownValidator);
		ensure!(
			!EthAddressByValidator::<T>::contains_key(&validator) &&
				!OrchestratorByValidator::<T>::contains_key(&validator),
			Error::<T>::ResetDelegateKeys
		);
		ensure!(
			!ValidatorByEthAddress::<T>::contains_key(eth_address),
			Error::<T>::DuplicateEthAddress
		);
		ensure!(
			!ValidatorByOrchestrator::<T>::contains_key(&orchestrator),
			Error::<T>::DuplicateOrchestrator
		);

		EthAddressByValidator::<T>::insert(&validator, eth_address);
		ValidatorByEthAddress::<T>::insert(eth_address, &validator);
		OrchestratorByValidator::<T>::insert(&validator, &orchestrator);
		ValidatorByOrchestrator::<T>::insert(&orchestrator, &validator);

		Self::deposit_event(Event::OrchestratorAddressSet { validator, orchestrator, eth_address });
		Ok(())
	}

	/// Validator an orchestrator signs for, with the Ethereum key its signatures must
	/// recover to.
	pub(crate) fn signing_validator(
		orchestrator: &T::AccountId,
	) -> Result<(T::AccountId, EthAddress), Error<T>> {
		let validator =
			ValidatorByOrchestrator::<T>::get(orchestrator).ok_or(Error::<T>::UnknownOrchestrator)?;
		let eth_address =
			EthAddressByValidator::<T>::get(&validator).ok_or(Error::<T>::EthAddressNotFound)?;
		Ok((validator, eth_address))
	}
}
