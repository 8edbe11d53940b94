//! Identity Models

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use alloy_primitives::Address;
use thiserror::Error;

use crate::uuids::TypedUuid;

/// User Record marker
#[derive(Debug)]
pub struct User;

/// User UUID
pub type UserUuid = TypedUuid<User>;

/// Authenticated identity supplied by the session provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: UserUuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Error)]
#[error("invalid wallet address {value:?}")]
pub struct InvalidWalletAddress {
    pub value: String,
}

/// A linked ledger wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalletAddress(Address);

impl WalletAddress {
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    #[must_use]
    pub const fn address(&self) -> Address {
        self.0
    }
}

impl FromStr for WalletAddress {
    type Err = InvalidWalletAddress;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<Address>()
            .map(Self)
            .map_err(|_| InvalidWalletAddress {
                value: value.to_string(),
            })
    }
}

/// Checksummed `0x` form.
impl Display for WalletAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_checksum(None))
    }
}
